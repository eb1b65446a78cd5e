//! # GLOBSET: compressed sets of GLOBCNT values
//!
//! A GLOBSET is a set of 48-bit counters. On the wire it is an instruction
//! stream: push commands hoist high-order bytes shared by the following
//! values onto a stack, bitmask and range commands fill in the remaining
//! low-order bytes, and an end command terminates the set.
//!
//! In memory a [`GlobSet`] is always normalized: its ranges are sorted,
//! disjoint and never adjacent, so two sets holding the same values compare
//! equal and encode to the same bytes.
//!
//! ## Usage Example
//!
//! ```
//! use idset::{Decodable, Encodable, GlobSet, Globcnt};
//!
//! let values = [5, 6, 7, 100].map(|v| Globcnt::from_u64(v).unwrap());
//! let globset = GlobSet::from_values(values);
//!
//! let encoded = globset.encode().unwrap();
//! let decoded = GlobSet::decode(&encoded).unwrap();
//! assert_eq!(decoded, globset);
//! ```

mod command;
mod decoder;
mod encoder;


use std::fmt;

use crate::error::Error;
use crate::globcnt::Globcnt;
use crate::range::GlobcntRange;
use crate::VALUE_COUNT_LIMIT;

pub use command::Command;
pub use command::Opcode;
pub use decoder::Conformance;
pub use decoder::DecodedGlobSet;

/// Number of values a single bitmask command can describe: the start value
/// plus one per mask bit.
pub const BITMASK_WINDOW: u8 = 9;

/// A set of GLOBCNT values stored as normalized ranges.
#[derive(Clone, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct GlobSet {
    ranges: Vec<GlobcntRange>,
}

impl GlobSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from arbitrary values; duplicates and ordering do not
    /// matter.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Globcnt>,
    {
        let values: Vec<Globcnt> = values.into_iter().collect();
        Self { ranges: globcnt_ranges(&values) }
    }

    /// Builds a set from arbitrary ranges, merging overlapping and adjacent
    /// ones.
    pub fn from_ranges<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = GlobcntRange>,
    {
        let mut ranges: Vec<GlobcntRange> = ranges.into_iter().collect();
        ranges.sort_unstable_by_key(|range| (range.start(), range.end()));

        let mut merged: Vec<GlobcntRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if touches(last, &range) => {
                    if range.end() > last.end() {
                        *last = widen(*last, range.end());
                    }
                }
                _ => merged.push(range),
            }
        }

        Self { ranges: merged }
    }

    /// The normalized ranges, in ascending order.
    pub fn ranges(&self) -> &[GlobcntRange] {
        &self.ranges
    }

    /// Whether the set holds no values.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of values in the set.
    pub fn len(&self) -> u64 {
        self.ranges.iter().map(GlobcntRange::count).sum()
    }

    /// Adds a single value.
    pub fn insert(&mut self, value: Globcnt) {
        self.insert_range(GlobcntRange::singleton(value));
    }

    /// Adds every value of `range`.
    pub fn insert_range(&mut self, range: GlobcntRange) {
        let ranges = std::mem::take(&mut self.ranges);
        *self = Self::from_ranges(ranges.into_iter().chain(std::iter::once(range)));
    }

    /// Adds every value of `other`.
    pub fn union(&mut self, other: &GlobSet) {
        let ranges = std::mem::take(&mut self.ranges);
        *self = Self::from_ranges(ranges.into_iter().chain(other.ranges.iter().copied()));
    }

    /// Whether `value` is in the set.
    pub fn contains(&self, value: Globcnt) -> bool {
        let index = self.ranges.partition_point(|range| range.end() < value);
        self.ranges
            .get(index)
            .is_some_and(|range| range.contains(value))
    }

    /// Whether every value of `range` is in the set. Because the stored
    /// ranges are merged, a covered range always sits inside one of them.
    pub fn contains_range(&self, range: &GlobcntRange) -> bool {
        let index = self.ranges.partition_point(|r| r.end() < range.start());
        self.ranges
            .get(index)
            .is_some_and(|r| r.contains_range(range))
    }

    /// Whether every value of `other` is in the set.
    pub fn is_superset(&self, other: &GlobSet) -> bool {
        other.ranges.iter().all(|range| self.contains_range(range))
    }

    /// Iterates over every value in ascending order.
    pub fn values(&self) -> impl Iterator<Item = Globcnt> + '_ {
        self.ranges.iter().flat_map(GlobcntRange::values)
    }

    /// Expands the set into a list of values, bounded by
    /// [`VALUE_COUNT_LIMIT`].
    pub fn to_globcnt_list(&self) -> Result<Vec<Globcnt>, Error> {
        globcnt_list(&self.ranges, VALUE_COUNT_LIMIT)
    }
}

impl fmt::Display for GlobSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobSet(")?;
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{range}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for GlobSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self, f)
    }
}

impl FromIterator<Globcnt> for GlobSet {
    fn from_iter<T: IntoIterator<Item = Globcnt>>(iter: T) -> Self {
        Self::from_values(iter)
    }
}

/// Builds the minimal sorted range list for `values`: duplicates are
/// removed, the values sorted, and consecutive values grouped into ranges.
pub fn globcnt_ranges(values: &[Globcnt]) -> Vec<GlobcntRange> {
    let mut values = values.to_vec();
    values.sort_unstable();
    values.dedup();

    let mut ranges: Vec<GlobcntRange> = Vec::new();
    for value in values {
        match ranges.last_mut() {
            Some(last) if last.end().checked_inc() == Some(value) => {
                *last = widen(*last, value);
            }
            _ => ranges.push(GlobcntRange::singleton(value)),
        }
    }

    ranges
}

/// Expands ranges into the list of values they hold.
///
/// ## Errors
/// * `TooManyValues` - if the ranges hold more than `limit` values
pub fn globcnt_list(ranges: &[GlobcntRange], limit: u64) -> Result<Vec<Globcnt>, Error> {
    let total = ranges
        .iter()
        .try_fold(0u64, |total, range| total.checked_add(range.count()))
        .unwrap_or(u64::MAX);
    if total > limit {
        return Err(Error::TooManyValues(total));
    }

    Ok(ranges.iter().flat_map(GlobcntRange::values).collect())
}

/// Whether `next`, which starts no earlier than `last`, overlaps or directly
/// follows `last`.
fn touches(last: &GlobcntRange, next: &GlobcntRange) -> bool {
    next.start() <= last.end() || last.end().checked_inc() == Some(next.start())
}

/// `range` with its end moved to `end`, which must not precede its start.
fn widen(range: GlobcntRange, end: Globcnt) -> GlobcntRange {
    GlobcntRange::new(range.start(), end).unwrap_or(range)
}
