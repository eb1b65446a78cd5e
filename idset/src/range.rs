//! Inclusive ranges of GLOBCNT values.

use std::fmt;

use crate::error::Error;
use crate::globcnt::Globcnt;

/// An inclusive `[start, end]` range of counters. The start is never greater
/// than the end.
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct GlobcntRange {
    start: Globcnt,
    end: Globcnt,
}

impl GlobcntRange {
    /// Creates a range, failing with `InvalidRange` when `start > end`.
    pub fn new(start: Globcnt, end: Globcnt) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }

        Ok(Self { start, end })
    }

    /// A range holding exactly one value.
    pub fn singleton(value: Globcnt) -> Self {
        Self { start: value, end: value }
    }

    /// The first value of the range.
    pub fn start(&self) -> Globcnt {
        self.start
    }

    /// The last value of the range.
    pub fn end(&self) -> Globcnt {
        self.end
    }

    /// Whether the range holds a single value.
    pub fn is_singleton(&self) -> bool {
        self.start == self.end
    }

    /// Number of values in the range.
    pub fn count(&self) -> u64 {
        self.end.as_u64() - self.start.as_u64() + 1
    }

    /// Whether `value` lies inside the range.
    pub fn contains(&self, value: Globcnt) -> bool {
        self.start <= value && value <= self.end
    }

    /// Whether every value of `other` lies inside this range.
    pub fn contains_range(&self, other: &GlobcntRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// The high-order bytes shared by the start and the end of the range.
    /// A singleton shares all six bytes.
    pub fn same_high_order_values(&self) -> &[u8] {
        let start = self.start.as_bytes();
        let end = self.end.as_bytes();
        let len = start
            .iter()
            .zip(end.iter())
            .take_while(|(a, b)| a == b)
            .count();

        &start[..len]
    }

    /// Iterates over every value in the range.
    pub fn values(&self) -> impl Iterator<Item = Globcnt> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |cnt| {
            if *cnt < end {
                cnt.checked_inc()
            } else {
                None
            }
        })
    }
}

impl fmt::Display for GlobcntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_singleton() {
            write!(f, "[{}]", self.start)
        } else {
            write!(f, "[{}, {}]", self.start, self.end)
        }
    }
}

impl fmt::Debug for GlobcntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self, f)
    }
}
