//! The common byte stack shared by the GLOBSET encoder and decoder.
//!
//! Push commands place high-order bytes that every following GLOBCNT shares
//! onto the stack, pop commands remove the most recent group. The stack never
//! holds more than five bytes: the sixth byte of a GLOBCNT is always written
//! by the command that produces the value.

use crate::error::DecodeError;
use crate::globcnt::GLOBCNT_SIZE;
use crate::globset::Command;

/// Maximum number of bytes the stack holds.
pub const MAX_STACK_DEPTH: usize = GLOBCNT_SIZE - 1;

/// LIFO accumulator of the common high-order bytes currently in effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonByteStack {
    groups: Vec<Vec<u8>>,
    depth: usize,
}

impl CommonByteStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of bytes on the stack.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether no bytes are on the stack.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Pushes a group of common bytes.
    ///
    /// ## Errors
    /// * `StackOverflow` - if the push would leave more than five bytes on
    ///   the stack
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        if self.depth + bytes.len() > MAX_STACK_DEPTH {
            return Err(DecodeError::StackOverflow {
                depth: self.depth,
                pushed: bytes.len(),
            });
        }

        self.depth += bytes.len();
        self.groups.push(bytes.to_vec());
        Ok(())
    }

    /// Removes and returns the most recently pushed group.
    pub fn pop(&mut self) -> Result<Vec<u8>, DecodeError> {
        let group = self.groups.pop().ok_or(DecodeError::StackUnderflow)?;
        self.depth -= group.len();
        Ok(group)
    }

    /// The concatenation of every group on the stack, oldest first.
    pub fn common_bytes(&self) -> Vec<u8> {
        self.groups.concat()
    }

    /// Rebuilds the stack as it stood after executing `commands`, which is
    /// usually a prefix of a decoded command trace. Push commands that
    /// completed a GLOBCNT never reached the stack and are skipped.
    pub fn replay(commands: &[Command]) -> Result<Self, DecodeError> {
        let mut stack = Self::new();
        for command in commands {
            match command {
                Command::Push { bytes, range: None } => stack.push(bytes)?,
                Command::Pop => {
                    stack.pop()?;
                }
                _ => {}
            }
        }

        Ok(stack)
    }
}
