//! GLOBSET compression.
//!
//! The encoder walks the sorted range list as a trie over the six GLOBCNT
//! bytes. Whenever a run of ranges shares high-order bytes beyond what is
//! already on the stack, those bytes are pushed once and the run is encoded
//! underneath them. Once five bytes are on the stack only the low-order byte
//! varies and the remaining ranges are packed into bitmask, range and
//! singleton commands.

use crate::codec::Encodable;
use crate::error::Error;
use crate::globcnt::GLOBCNT_SIZE;
use crate::range::GlobcntRange;
use crate::stack::{CommonByteStack, MAX_STACK_DEPTH};

use super::{GlobSet, Opcode, BITMASK_WINDOW};

/// Encodes the set as a GLOBSET instruction stream terminated by an end
/// command. The empty set encodes as a lone end command.
impl Encodable for GlobSet {
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        if !self.ranges.is_empty() {
            let mut compressor = Compressor {
                stack: CommonByteStack::new(),
                out: &mut *out,
            };
            compressor.compress(&self.ranges)?;

            if !compressor.stack.is_empty() {
                return Err(Error::InvalidState("common byte stack not empty after compression"));
            }
        }

        out.push(Opcode::End as u8);
        Ok(())
    }
}

/// Per-call compression state: the prefix stack mirrors what a decoder will
/// hold after reading the bytes written to `out` so far.
struct Compressor<'a> {
    stack: CommonByteStack,
    out: &'a mut Vec<u8>,
}

impl Compressor<'_> {
    /// Encodes a sorted, merged run of ranges whose values all start with the
    /// bytes currently on the stack.
    fn compress(&mut self, ranges: &[GlobcntRange]) -> Result<(), Error> {
        let depth = self.stack.depth();
        if depth > MAX_STACK_DEPTH {
            return Err(Error::InvalidState("common byte stack deeper than five bytes"));
        }

        let range = match ranges {
            [] => return Err(Error::InvalidState("compress called without ranges")),
            [range] => range,
            _ => return self.compress_many(ranges, depth),
        };

        self.compress_one(range)
    }

    fn compress_many(&mut self, ranges: &[GlobcntRange], depth: usize) -> Result<(), Error> {
        let (common, split) = high_order_common_bytes(ranges, depth);

        if common.len() == GLOBCNT_SIZE - depth {
            // Distinct merged ranges can never share all six bytes.
            return Err(Error::InvalidState("ranges share every remaining byte"));
        }

        if common.is_empty() {
            if depth == MAX_STACK_DEPTH {
                return self.compress_last_byte(ranges);
            }

            // The first range has nothing in common with the others below the
            // stack and is encoded on its own.
            if split == ranges.len() {
                self.compress_one(&ranges[0])?;
                return self.compress(&ranges[1..]);
            }

            let (head, tail) = ranges.split_at(split);
            self.compress(head)?;
            return self.compress(tail);
        }

        self.push(common)?;

        if self.stack.depth() == MAX_STACK_DEPTH {
            self.compress_last_byte(ranges)?;
        } else {
            let (head, tail) = ranges.split_at(split);
            self.compress(head)?;
            if !tail.is_empty() {
                self.compress(tail)?;
            }
        }

        self.pop()
    }

    /// Encodes one range with the bytes below the stack: a push completing a
    /// singleton, or a range command.
    fn compress_one(&mut self, range: &GlobcntRange) -> Result<(), Error> {
        let depth = self.stack.depth();
        let start = range.start();
        let low = &start.as_bytes()[depth..];

        if range.is_singleton() {
            let opcode = Opcode::push(low.len())
                .ok_or(Error::InvalidState("singleton push outside one to six bytes"))?;
            self.out.push(opcode as u8);
            self.out.extend_from_slice(low);
            return Ok(());
        }

        let end = range.end();
        let high = &end.as_bytes()[depth..];
        self.out.push(Opcode::Range as u8);
        self.out.extend_from_slice(low);
        self.out.extend_from_slice(high);
        Ok(())
    }

    /// Encodes ranges that share the five bytes on the stack. Ranges are
    /// grouped greedily: every range ending within the bitmask window of the
    /// group's first value joins the group.
    fn compress_last_byte(&mut self, ranges: &[GlobcntRange]) -> Result<(), Error> {
        if self.stack.depth() != MAX_STACK_DEPTH {
            return Err(Error::InvalidState("last byte compression below five common bytes"));
        }

        let mut index = 0;
        while index < ranges.len() {
            let base = ranges[index].start().low_byte();
            let in_window =
                |range: &GlobcntRange| range.end().low_byte().abs_diff(base) < BITMASK_WINDOW;

            let group_len = ranges[index..]
                .iter()
                .take_while(|range| in_window(*range))
                .count()
                .max(1);

            match &ranges[index..index + group_len] {
                [range] => self.compress_one(range)?,
                group => self.bitmask(group)?,
            }

            index += group_len;
        }

        Ok(())
    }

    /// Writes a bitmask command covering `group`, whose values all fall in
    /// the window starting at the first value.
    fn bitmask(&mut self, group: &[GlobcntRange]) -> Result<(), Error> {
        let start = group
            .first()
            .ok_or(Error::InvalidState("bitmask without ranges"))?
            .start()
            .low_byte();

        let mut mask = 0u8;
        for value in group.iter().flat_map(GlobcntRange::values) {
            match value.low_byte().checked_sub(start) {
                Some(0) => {}
                Some(offset @ 1..=8) => mask |= 1 << (offset - 1),
                _ => return Err(Error::InvalidState("bitmask value outside the window")),
            }
        }

        self.out.extend_from_slice(&[Opcode::Bitmask as u8, start, mask]);
        Ok(())
    }

    fn push(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let opcode = Opcode::push(bytes.len())
            .ok_or(Error::InvalidState("push outside one to six bytes"))?;
        self.stack
            .push(bytes)
            .map_err(|_| Error::InvalidState("push past five common bytes"))?;

        self.out.push(opcode as u8);
        self.out.extend_from_slice(bytes);
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Error> {
        self.stack
            .pop()
            .map_err(|_| Error::InvalidState("pop without a matching push"))?;
        self.out.push(Opcode::Pop as u8);
        Ok(())
    }
}

/// Returns the high-order bytes, starting at `depth`, shared by the
/// same-high-order values of every range, together with the index of the
/// first range that differs from the first one at the first unshared byte.
/// The index is `ranges.len()` when no range differs.
///
/// A range whose own shared prefix stops before a byte is treated as
/// differing at that byte.
fn high_order_common_bytes(ranges: &[GlobcntRange], depth: usize) -> (&[u8], usize) {
    let first = ranges[0].same_high_order_values();
    let own = first.get(depth..).unwrap_or_default();

    for (offset, &byte) in own.iter().enumerate() {
        let index = depth + offset;
        let diff = ranges[1..]
            .iter()
            .position(|range| range.same_high_order_values().get(index) != Some(&byte));

        if let Some(position) = diff {
            return (&own[..offset], position + 1);
        }
    }

    (own, ranges.len())
}
