#![deny(missing_docs)]

//! # IDSET: compressed sets of message-store IDs
//!
//! Incremental synchronization describes which objects a client has seen as
//! sets of IDs. Each ID is a replica identifier plus a 48-bit counter, the
//! GLOBCNT. This library encodes and decodes those sets:
//!
//! * **GLOBSET**: a set of GLOBCNT values compressed into a stack-driven
//!   instruction stream ([`GlobSet`])
//! * **IDSET**: one GLOBSET per replica, keyed by a 16-bit REPLID or a
//!   128-bit REPLGUID ([`ReplidIdset`], [`ReplguidIdset`])
//!
//! ## Usage Example
//!
//! ```
//! use idset::{Decodable, Encodable, GlobSet, Globcnt, IdsetElement, Replid, ReplidIdset};
//!
//! let globset: GlobSet = (10..=20).map(|v| Globcnt::from_u64(v).unwrap()).collect();
//! let idset: ReplidIdset = [IdsetElement::new(Replid(1), globset)].into_iter().collect();
//!
//! let encoded = idset.encode().unwrap();
//! let decoded = ReplidIdset::decode(&encoded).unwrap();
//! assert!(decoded.is_equivalent(&idset));
//! ```
//!
//! ## Safety Considerations
//!
//! Decoding never allocates in proportion to the number of values a stream
//! describes: ranges stay ranges. Expanding a set into individual values is
//! bounded by [`VALUE_COUNT_LIMIT`].

pub mod codec;
pub mod error;
pub mod globcnt;
pub mod globset;
pub mod id_set;
pub mod range;
pub mod replica;
pub mod stack;

pub use codec::Decodable;
pub use codec::Encodable;

pub use error::DecodeError;
pub use error::Error;

pub use globcnt::Globcnt;
pub use range::GlobcntRange;
pub use stack::CommonByteStack;

pub use globset::Command;
pub use globset::Conformance;
pub use globset::DecodedGlobSet;
pub use globset::GlobSet;
pub use globset::Opcode;

pub use id_set::Idset;
pub use id_set::IdsetElement;
pub use id_set::LongTermId;
pub use id_set::ReplguidIdset;
pub use id_set::ReplguidIdsetElement;
pub use id_set::ReplidIdset;
pub use id_set::ReplidIdsetElement;

pub use replica::ReplicaKey;
pub use replica::Replguid;
pub use replica::Replid;

/// Maximum number of individual values a set may be expanded into.
pub const VALUE_COUNT_LIMIT: u64 = 1 << 17;
