//! Explicit byte-level encoding and decoding for the wire structures.
//!
//! Each structure spells out its own field order in its `Encodable` and
//! `Decodable` implementations; there is no generic field walker.

use std::io::{Cursor, Read};

use crate::error::{DecodeError, Error};

/// Trait for types that can be written to the wire format.
pub trait Encodable {
    /// Appends the encoded form of `self` to `out`.
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), Error>;

    /// Encodes `self` into a new byte vector.
    fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }
}

/// Trait for types that can be read from the wire format.
pub trait Decodable: Sized {
    /// Reads one instance from the cursor, consuming exactly the bytes that
    /// belong to it and leaving the cursor positioned right after them.
    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error>;

    /// Decodes an instance that must span the whole of `bytes`.
    ///
    /// ## Errors
    /// * `TrailingBytes` - if bytes remain after the decoded structure
    fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = Cursor::new(bytes);
        let value = Self::read_from(&mut cursor)?;

        let remaining = bytes.len().saturating_sub(cursor.position() as usize);
        if remaining != 0 {
            return Err(DecodeError::TrailingBytes(remaining).into());
        }

        Ok(value)
    }
}

/// Reads a single byte.
pub(crate) fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, DecodeError> {
    let [byte] = read_array::<1>(cursor)?;
    Ok(byte)
}

/// Reads exactly `N` bytes.
pub(crate) fn read_array<const N: usize>(
    cursor: &mut Cursor<&[u8]>,
) -> Result<[u8; N], DecodeError> {
    let mut buf = [0u8; N];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| DecodeError::UnexpectedEndOfData)?;
    Ok(buf)
}

/// Reads exactly `len` bytes.
pub(crate) fn read_bytes(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut buf = vec![0u8; len];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| DecodeError::UnexpectedEndOfData)?;
    Ok(buf)
}

/// Whether the cursor has consumed every byte of its buffer.
pub(crate) fn is_exhausted(cursor: &Cursor<&[u8]>) -> bool {
    cursor.position() >= cursor.get_ref().len() as u64
}
