//! GLOBSET opcodes and the decoded command trace.

use crate::error::DecodeError;
use crate::range::GlobcntRange;

/// The single-byte command tags of the GLOBSET instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Terminates the GLOBSET.
    End = 0x00,
    /// Pushes (or completes) one byte.
    Push1 = 0x01,
    /// Pushes (or completes) two bytes.
    Push2 = 0x02,
    /// Pushes (or completes) three bytes.
    Push3 = 0x03,
    /// Pushes (or completes) four bytes.
    Push4 = 0x04,
    /// Pushes (or completes) five bytes.
    Push5 = 0x05,
    /// Completes all six bytes of a singleton.
    Push6 = 0x06,
    /// Up to nine values sharing five high-order bytes.
    Bitmask = 0x42,
    /// Removes the most recently pushed bytes.
    Pop = 0x50,
    /// A low/high pair completing the bytes under the stack.
    Range = 0x52,
}

impl Opcode {
    /// The push opcode carrying `len` bytes.
    pub fn push(len: usize) -> Option<Opcode> {
        match len {
            1 => Some(Opcode::Push1),
            2 => Some(Opcode::Push2),
            3 => Some(Opcode::Push3),
            4 => Some(Opcode::Push4),
            5 => Some(Opcode::Push5),
            6 => Some(Opcode::Push6),
            _ => None,
        }
    }

    /// The number of bytes carried by a push opcode, `None` for the others.
    pub fn push_len(self) -> Option<usize> {
        match self {
            Opcode::Push1
            | Opcode::Push2
            | Opcode::Push3
            | Opcode::Push4
            | Opcode::Push5
            | Opcode::Push6 => Some(self as usize),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Opcode::End),
            0x01 => Ok(Opcode::Push1),
            0x02 => Ok(Opcode::Push2),
            0x03 => Ok(Opcode::Push3),
            0x04 => Ok(Opcode::Push4),
            0x05 => Ok(Opcode::Push5),
            0x06 => Ok(Opcode::Push6),
            0x42 => Ok(Opcode::Bitmask),
            0x50 => Ok(Opcode::Pop),
            0x52 => Ok(Opcode::Range),
            other => Err(DecodeError::UnknownOpcode(other)),
        }
    }
}

/// One decoded command together with the ranges it produced.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// A push. When the pushed bytes completed a GLOBCNT the command produced
    /// a singleton and nothing was placed on the stack.
    Push {
        /// The pushed bytes
        bytes: Vec<u8>,
        /// The singleton produced, if any
        range: Option<GlobcntRange>,
    },
    /// A pop of the most recent push.
    Pop,
    /// A bitmask over the low-order byte.
    Bitmask {
        /// The first low-order byte, always present
        start: u8,
        /// Bit `i` marks `start + 1 + i` present
        mask: u8,
        /// The runs of consecutive values the bitmask expands to
        ranges: Vec<GlobcntRange>,
    },
    /// An explicit range.
    Range {
        /// The low bytes below the stack
        low: Vec<u8>,
        /// The high bytes below the stack
        high: Vec<u8>,
        /// The range produced
        range: GlobcntRange,
    },
    /// The end of the GLOBSET.
    End,
}

impl Command {
    /// The opcode this command was read from.
    ///
    /// Returns `None` only for a hand-built push whose byte count falls
    /// outside one to six, which no opcode can carry.
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Command::Push { bytes, .. } => Opcode::push(bytes.len()),
            Command::Pop => Some(Opcode::Pop),
            Command::Bitmask { .. } => Some(Opcode::Bitmask),
            Command::Range { .. } => Some(Opcode::Range),
            Command::End => Some(Opcode::End),
        }
    }

    /// The ranges this command added to the GLOBSET.
    pub fn ranges(&self) -> &[GlobcntRange] {
        match self {
            Command::Push { range: Some(range), .. } | Command::Range { range, .. } => {
                std::slice::from_ref(range)
            }
            Command::Bitmask { ranges, .. } => ranges,
            Command::Push { range: None, .. } | Command::Pop | Command::End => &[],
        }
    }
}
