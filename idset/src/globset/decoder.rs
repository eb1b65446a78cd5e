//! GLOBSET decompression.
//!
//! The decoder is a single-pass interpreter over the instruction stream. It
//! keeps the common byte stack, turns every value-producing command into
//! ranges, and records each command in a trace.
//!
//! ## Conformance
//!
//! A server building a GLOBSET is required to place every value in the set,
//! remove duplicates, sort the values, group consecutive values into ranges
//! and write disjoint values as singletons. The decoder does not reject
//! streams that skip one of these steps, since the values are still
//! recoverable, but it reports each one in a [`Conformance`].

use std::io::Cursor;

use crate::codec::{read_array, read_bytes, read_u8, Decodable};
use crate::error::{DecodeError, Error};
use crate::globcnt::{Globcnt, GLOBCNT_SIZE};
use crate::range::GlobcntRange;
use crate::stack::{CommonByteStack, MAX_STACK_DEPTH};

use super::{Command, GlobSet, Opcode};

/// Checks a decoded stream against the rules for building a GLOBSET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Conformance {
    /// Every pushed prefix was popped again before the end command, so every
    /// value belongs to a complete GLOBSET.
    pub all_globcnt_in_globset: bool,
    /// No value was encoded twice.
    pub duplicates_removed: bool,
    /// Each range starts after the previous one ends.
    pub ascending_order: bool,
    /// No two ranges are adjacent, so consecutive values were grouped.
    pub grouped_into_ranges: bool,
    /// Single values were written as singletons rather than as a range
    /// command whose low and high bytes are equal.
    pub disjoint_made_singleton: bool,
}

impl Conformance {
    /// Whether every rule holds.
    pub fn is_conformant(&self) -> bool {
        self.all_globcnt_in_globset
            && self.duplicates_removed
            && self.ascending_order
            && self.grouped_into_ranges
            && self.disjoint_made_singleton
    }

    /// Evaluates the rules over the ranges in the order the stream produced
    /// them.
    fn assess(ranges: &[GlobcntRange], commands: &[Command], stack_empty: bool) -> Self {
        let ascending_order = ranges
            .windows(2)
            .all(|pair| pair[0].end() < pair[1].start());

        let mut sorted = ranges.to_vec();
        sorted.sort_unstable_by_key(|range| (range.start(), range.end()));

        let duplicates_removed = sorted
            .windows(2)
            .all(|pair| pair[0].end() < pair[1].start());

        let grouped_into_ranges = sorted
            .windows(2)
            .all(|pair| pair[0].end().checked_inc() != Some(pair[1].start()));

        let disjoint_made_singleton = commands.iter().all(|command| {
            !matches!(command, Command::Range { low, high, .. } if low == high)
        });

        Self {
            all_globcnt_in_globset: stack_empty,
            duplicates_removed,
            ascending_order,
            grouped_into_ranges,
            disjoint_made_singleton,
        }
    }
}

/// A decoded GLOBSET together with the command trace that produced it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DecodedGlobSet {
    /// The normalized set.
    pub globset: GlobSet,
    /// Every command read, in stream order, ending with the end command.
    pub commands: Vec<Command>,
    /// The ranges in the order the stream produced them, before
    /// normalization.
    pub ranges: Vec<GlobcntRange>,
    /// How the stream measures up against the GLOBSET construction rules.
    pub conformance: Conformance,
}

impl GlobSet {
    /// Reads one GLOBSET from the cursor, up to and including its end
    /// command, keeping the command trace.
    ///
    /// ## Errors
    /// * `MalformedStream` - unknown opcodes, truncated input, stack misuse or
    ///   a bitmask read without five common bytes on the stack
    /// * `InvalidRange` - a range command whose low value exceeds its high
    ///   value
    pub fn read_traced(cursor: &mut Cursor<&[u8]>) -> Result<DecodedGlobSet, Error> {
        let mut stack = CommonByteStack::new();
        let mut commands = Vec::new();
        let mut ranges = Vec::new();

        loop {
            let opcode = Opcode::try_from(read_u8(cursor)?)?;

            let command = match opcode {
                Opcode::End => break,
                Opcode::Pop => {
                    stack.pop()?;
                    Command::Pop
                }
                Opcode::Bitmask => read_bitmask(cursor, &stack)?,
                Opcode::Range => read_range(cursor, &stack)?,
                Opcode::Push1
                | Opcode::Push2
                | Opcode::Push3
                | Opcode::Push4
                | Opcode::Push5
                | Opcode::Push6 => read_push(cursor, opcode, &mut stack)?,
            };

            tracing::trace!(?command, depth = stack.depth(), "decoded GLOBSET command");
            ranges.extend_from_slice(command.ranges());
            commands.push(command);
        }
        commands.push(Command::End);

        let conformance = Conformance::assess(&ranges, &commands, stack.is_empty());
        if !conformance.is_conformant() {
            tracing::debug!(?conformance, "GLOBSET stream breaks a construction rule");
        }

        let globset = GlobSet::from_ranges(ranges.iter().copied());
        tracing::trace!(%globset, commands = commands.len(), "decoded GLOBSET");

        Ok(DecodedGlobSet { globset, commands, ranges, conformance })
    }
}

/// Implements decoding of a single GLOBSET. The command trace is dropped;
/// use [`GlobSet::read_traced`] to keep it.
impl Decodable for GlobSet {
    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        GlobSet::read_traced(cursor).map(|decoded| decoded.globset)
    }
}

/// Reads the payload of a push. A push that brings the stack to six bytes
/// completes a GLOBCNT and produces a singleton instead of growing the stack.
fn read_push(
    cursor: &mut Cursor<&[u8]>,
    opcode: Opcode,
    stack: &mut CommonByteStack,
) -> Result<Command, Error> {
    let len = opcode.push_len().ok_or(DecodeError::UnknownOpcode(opcode as u8))?;
    let bytes = read_bytes(cursor, len)?;
    let depth = stack.depth();

    if depth + len == GLOBCNT_SIZE {
        let value = globcnt_from_parts(&stack.common_bytes(), &bytes)?;
        return Ok(Command::Push {
            bytes,
            range: Some(GlobcntRange::singleton(value)),
        });
    }

    stack.push(&bytes)?;
    Ok(Command::Push { bytes, range: None })
}

/// Reads the low and high bytes of a range command. Each holds the bytes not
/// covered by the stack.
fn read_range(cursor: &mut Cursor<&[u8]>, stack: &CommonByteStack) -> Result<Command, Error> {
    let len = GLOBCNT_SIZE - stack.depth();
    let low = read_bytes(cursor, len)?;
    let high = read_bytes(cursor, len)?;

    let prefix = stack.common_bytes();
    let range = GlobcntRange::new(
        globcnt_from_parts(&prefix, &low)?,
        globcnt_from_parts(&prefix, &high)?,
    )?;

    Ok(Command::Range { low, high, range })
}

/// Reads a bitmask command, which is only valid with five bytes on the stack.
fn read_bitmask(cursor: &mut Cursor<&[u8]>, stack: &CommonByteStack) -> Result<Command, Error> {
    if stack.depth() != MAX_STACK_DEPTH {
        return Err(DecodeError::BitmaskStackDepth(stack.depth()).into());
    }

    let [start, mask] = read_array::<2>(cursor)?;
    let ranges = expand_bitmask(&stack.common_bytes(), start, mask)?;

    Ok(Command::Bitmask { start, mask, ranges })
}

/// Expands a bitmask into runs of consecutive values. The start value is
/// always present; bit `i` of the mask marks `start + 1 + i`.
fn expand_bitmask(prefix: &[u8], start: u8, mask: u8) -> Result<Vec<GlobcntRange>, Error> {
    let mut lows = vec![start];
    for bit in 0..8u8 {
        if mask & (1 << bit) != 0 {
            let low = start
                .checked_add(bit + 1)
                .ok_or(DecodeError::BitmaskOverflow { start, mask })?;
            lows.push(low);
        }
    }

    let mut ranges = Vec::new();
    let mut run_start = start;
    let mut run_end = start;
    for &low in &lows[1..] {
        if low == run_end + 1 {
            run_end = low;
            continue;
        }
        ranges.push(low_byte_range(prefix, run_start, run_end)?);
        run_start = low;
        run_end = low;
    }
    ranges.push(low_byte_range(prefix, run_start, run_end)?);

    Ok(ranges)
}

fn low_byte_range(prefix: &[u8], low: u8, high: u8) -> Result<GlobcntRange, Error> {
    GlobcntRange::new(
        globcnt_from_parts(prefix, &[low])?,
        globcnt_from_parts(prefix, &[high])?,
    )
}

/// Joins the stacked high-order bytes with the bytes a command supplied.
fn globcnt_from_parts(prefix: &[u8], suffix: &[u8]) -> Result<Globcnt, Error> {
    let mut bytes = [0u8; GLOBCNT_SIZE];
    if prefix.len() + suffix.len() != GLOBCNT_SIZE {
        return Err(Error::InvalidLength {
            expected: GLOBCNT_SIZE,
            actual: prefix.len() + suffix.len(),
        });
    }

    bytes[..prefix.len()].copy_from_slice(prefix);
    bytes[prefix.len()..].copy_from_slice(suffix);
    Ok(Globcnt::new(bytes))
}
