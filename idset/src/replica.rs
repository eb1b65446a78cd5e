//! Replica identifiers that key the elements of an IDSET.
//!
//! A replica is named either by a 16-bit REPLID, which is only meaningful
//! within one mailbox, or by the 128-bit REPLGUID it maps to. Both are used
//! as the key of an IDSET element and share the [`ReplicaKey`] trait.

use std::fmt;
use std::hash::Hash;
use std::io::Cursor;
use std::str::FromStr;

use crate::codec::{read_array, Decodable, Encodable};
use crate::error::Error;
use crate::globcnt::{Globcnt, GLOBCNT_SIZE};

/// A value that names a replica on the wire.
pub trait ReplicaKey:
    Encodable + Decodable + Copy + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync
{
    /// Number of bytes the key occupies on the wire.
    const WIRE_SIZE: usize;
}

/// A 16-bit replica identifier, little-endian on the wire.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Replid(pub u16);

impl ReplicaKey for Replid {
    const WIRE_SIZE: usize = 2;
}

impl Encodable for Replid {
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        out.extend_from_slice(&self.0.to_le_bytes());
        Ok(())
    }
}

impl Decodable for Replid {
    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Ok(Self(u16::from_le_bytes(read_array(cursor)?)))
    }
}

impl From<u16> for Replid {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for Replid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl fmt::Debug for Replid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Replid({:#06x})", self.0)
    }
}

/// Number of bytes in a REPLGUID.
pub const REPLGUID_SIZE: usize = 16;

/// A 128-bit replica GUID.
///
/// The bytes are kept in wire order: the first three fields of the GUID are
/// little-endian and the final eight bytes are stored as written. The text
/// form is the usual `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` layout.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Replguid([u8; REPLGUID_SIZE]);

impl Replguid {
    /// Creates a GUID from its wire bytes.
    pub const fn from_bytes(bytes: [u8; REPLGUID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates a GUID from its fields.
    pub fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        let mut bytes = [0u8; REPLGUID_SIZE];
        bytes[0..4].copy_from_slice(&data1.to_le_bytes());
        bytes[4..6].copy_from_slice(&data2.to_le_bytes());
        bytes[6..8].copy_from_slice(&data3.to_le_bytes());
        bytes[8..].copy_from_slice(&data4);
        Self(bytes)
    }

    /// The wire bytes.
    pub fn as_bytes(&self) -> &[u8; REPLGUID_SIZE] {
        &self.0
    }

    /// The bytes in text order: every field big-endian.
    fn text_order(&self) -> [u8; REPLGUID_SIZE] {
        let b = &self.0;
        [
            b[3], b[2], b[1], b[0], b[5], b[4], b[7], b[6], b[8], b[9], b[10], b[11], b[12], b[13],
            b[14], b[15],
        ]
    }
}

impl ReplicaKey for Replguid {
    const WIRE_SIZE: usize = REPLGUID_SIZE;
}

impl Encodable for Replguid {
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        out.extend_from_slice(&self.0);
        Ok(())
    }
}

impl Decodable for Replguid {
    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Ok(Self(read_array(cursor)?))
    }
}

impl fmt::Display for Replguid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.text_order();
        for (i, byte) in t.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                write!(f, "-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Replguid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Replguid({self})")
    }
}

impl FromStr for Replguid {
    type Err = Error;

    /// Parses the hyphenated text form, optionally wrapped in braces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidGuid(s.to_string());

        let inner = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(s);

        let groups: Vec<&str> = inner.split('-').collect();
        let lengths: Vec<usize> = groups.iter().map(|group| group.len()).collect();
        if lengths != [8, 4, 4, 4, 12] {
            return Err(invalid());
        }

        let digits: String = groups.concat();
        let mut text = [0u8; REPLGUID_SIZE];
        for (i, byte) in text.iter_mut().enumerate() {
            let pair = digits.get(2 * i..2 * i + 2).ok_or_else(invalid)?;
            *byte = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }

        let data1 = u32::from_be_bytes([text[0], text[1], text[2], text[3]]);
        let data2 = u16::from_be_bytes([text[4], text[5]]);
        let data3 = u16::from_be_bytes([text[6], text[7]]);
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&text[8..]);

        Ok(Self::from_fields(data1, data2, data3, data4))
    }
}

impl From<Replguid> for String {
    fn from(value: Replguid) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Replguid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Builds a 64-bit ID from a REPLID and a GLOBCNT. In the little-endian
/// layout of the ID the REPLID fills the first two bytes and the GLOBCNT,
/// big-endian, the remaining six.
pub fn compose_id(replid: Replid, globcnt: Globcnt) -> u64 {
    let mut bytes = [0u8; 8];
    bytes[..2].copy_from_slice(&replid.0.to_le_bytes());
    bytes[2..].copy_from_slice(globcnt.as_bytes());
    u64::from_le_bytes(bytes)
}

/// Splits a 64-bit ID into its REPLID and GLOBCNT.
pub fn split_id(id: u64) -> (Replid, Globcnt) {
    let bytes = id.to_le_bytes();
    let replid = Replid(u16::from_le_bytes([bytes[0], bytes[1]]));

    let mut globcnt = [0u8; GLOBCNT_SIZE];
    globcnt.copy_from_slice(&bytes[2..]);
    (replid, Globcnt::new(globcnt))
}
