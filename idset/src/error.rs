//! Top-level error types for the idset library
//!

use crate::globcnt::Globcnt;

/// Errors raised while interpreting a GLOBSET or IDSET byte stream. Every
/// variant describes a malformed stream; none of them are retriable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The stream ended before the current command or element was complete
    #[error("unexpected end of data")]
    UnexpectedEndOfData,

    /// A byte in opcode position is not a known GLOBSET command
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// A bitmask command is only valid with exactly five common bytes on the
    /// stack
    #[error("bitmask command with {0} common bytes on the stack, expected 5")]
    BitmaskStackDepth(usize),

    /// A bitmask addresses a low-order byte past 0xFF
    #[error("bitmask starting at {start:#04x} with mask {mask:08b} overflows the low-order byte")]
    BitmaskOverflow {
        /// The start value of the bitmask command
        start: u8,
        /// The mask byte of the bitmask command
        mask: u8,
    },

    /// A push command would place more than five bytes on the stack
    #[error("push of {pushed} bytes onto a stack holding {depth} bytes exceeds five bytes")]
    StackOverflow {
        /// Number of bytes already on the stack
        depth: usize,
        /// Number of bytes the command tried to push
        pushed: usize,
    },

    /// A pop command was read while the stack was empty
    #[error("pop command on an empty common byte stack")]
    StackUnderflow,

    /// The buffer holds bytes after the end of the decoded structure
    #[error("{0} trailing bytes after the end command")]
    TrailingBytes(usize),
}

/// Errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The byte stream was malformed
    #[error("malformed stream: {0}")]
    MalformedStream(#[from] DecodeError),

    /// A range was built with its start after its end
    #[error("invalid range: start {start} is greater than end {end}")]
    InvalidRange {
        /// The requested start of the range
        start: Globcnt,
        /// The requested end of the range
        end: Globcnt,
    },

    /// Arithmetic on a GLOBCNT left the 48-bit domain
    #[error("arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    /// A GLOBCNT byte index outside 0..=5 was requested
    #[error("GLOBCNT byte index {0} is out of range")]
    IndexOutOfRange(usize),

    /// A byte slice of the wrong length was given where a fixed-size
    /// structure was expected
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// The required length
        expected: usize,
        /// The length of the given slice
        actual: usize,
    },

    /// Expanding a set into individual values would exceed the value limit
    #[error("value count limit exceeded: {0}")]
    TooManyValues(u64),

    /// A REPLGUID string was not in the registry format
    #[error("invalid GUID: {0}")]
    InvalidGuid(String),

    /// An internal invariant of the compressor did not hold
    #[error("invalid compressor state: {0}")]
    InvalidState(&'static str),
}

impl Error {
    /// Returns true when the error was caused by a malformed byte stream
    /// rather than by the caller's input.
    pub fn is_malformed_stream(&self) -> bool {
        matches!(self, Error::MalformedStream(_))
    }
}
