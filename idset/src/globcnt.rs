//! The 48-bit global counter.
//!
//! A `Globcnt` is stored as six big-endian bytes, so the derived ordering on
//! the byte array is exactly the numeric ordering of the counter.

use std::fmt;

use crate::error::Error;

/// Number of bytes in a serialized GLOBCNT.
pub const GLOBCNT_SIZE: usize = 6;

/// A 6-byte big-endian counter, the atomic unit of an ID set.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(into = "u64", try_from = "u64")]
pub struct Globcnt([u8; GLOBCNT_SIZE]);

impl Globcnt {
    /// The smallest counter value.
    pub const MIN: Globcnt = Globcnt([0x00; GLOBCNT_SIZE]);

    /// The largest counter value, 2^48 - 1.
    pub const MAX: Globcnt = Globcnt([0xFF; GLOBCNT_SIZE]);

    /// Creates a counter from its big-endian bytes.
    pub const fn new(bytes: [u8; GLOBCNT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates a counter from a big-endian byte slice of exactly six bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; GLOBCNT_SIZE] = bytes.try_into().map_err(|_| Error::InvalidLength {
            expected: GLOBCNT_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Creates a counter from an integer, failing when the value does not
    /// fit in 48 bits.
    pub fn from_u64(value: u64) -> Result<Self, Error> {
        if value > Self::MAX.as_u64() {
            return Err(Error::ArithmeticOverflow(format!(
                "{value} does not fit in a 48-bit GLOBCNT"
            )));
        }

        let mut bytes = [0u8; GLOBCNT_SIZE];
        bytes.copy_from_slice(&value.to_be_bytes()[2..]);
        Ok(Self(bytes))
    }

    /// Returns the counter as an integer.
    pub fn as_u64(&self) -> u64 {
        let mut buf = [0u8; 8];
        buf[2..].copy_from_slice(&self.0);
        u64::from_be_bytes(buf)
    }

    /// The big-endian bytes of the counter.
    pub fn as_bytes(&self) -> &[u8; GLOBCNT_SIZE] {
        &self.0
    }

    /// Returns byte `index`, where byte 0 is the most significant.
    pub fn byte(&self, index: usize) -> Result<u8, Error> {
        self.0
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange(index))
    }

    /// The least significant byte, the one encoded by bitmask commands.
    pub fn low_byte(&self) -> u8 {
        self.0[GLOBCNT_SIZE - 1]
    }

    /// Returns the successor, or `None` for [`Globcnt::MAX`].
    pub fn checked_inc(&self) -> Option<Self> {
        let mut bytes = self.0;
        for byte in bytes.iter_mut().rev() {
            let (next, carry) = byte.overflowing_add(1);
            *byte = next;
            if !carry {
                return Some(Self(bytes));
            }
        }

        None
    }

    /// Returns the successor of this counter.
    ///
    /// ## Errors
    /// * `ArithmeticOverflow` - when called on [`Globcnt::MAX`]
    pub fn inc(&self) -> Result<Self, Error> {
        self.checked_inc()
            .ok_or_else(|| Error::ArithmeticOverflow(format!("increment past {self}")))
    }
}

impl From<Globcnt> for u64 {
    fn from(value: Globcnt) -> Self {
        value.as_u64()
    }
}

impl TryFrom<u64> for Globcnt {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Globcnt::from_u64(value)
    }
}

impl From<[u8; GLOBCNT_SIZE]> for Globcnt {
    fn from(bytes: [u8; GLOBCNT_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Globcnt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#014x}", self.as_u64())
    }
}

impl fmt::Debug for Globcnt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Globcnt({self})")
    }
}
