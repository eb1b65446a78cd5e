//! GLOBSET streams written by hand rather than by the encoder.

use std::io::Cursor;

use assert_matches::assert_matches;
use idset::{CommonByteStack, Decodable, DecodeError, Encodable, Error, GlobSet, GlobcntRange};
use idset::{Command, Globcnt};
use test_case::test_case;

fn range(start: u64, end: u64) -> GlobcntRange {
    GlobcntRange::new(Globcnt::from_u64(start).unwrap(), Globcnt::from_u64(end).unwrap()).unwrap()
}

#[test]
fn nested_pushes_and_pops() {
    // Two values under 0x0000_0001_xxxx and one under 0x0000_0002_xxxx,
    // written with a separate push for each level.
    let bytes = [
        0x02, 0x00, 0x00, // push two bytes
        0x02, 0x00, 0x01, // push two more
        0x02, 0x00, 0x10, // complete 0x0000_0001_0010
        0x52, 0x01, 0x00, 0x01, 0x05, // range 0x0000_0001_0100..=0x0000_0001_0105
        0x50, // pop
        0x04, 0x00, 0x02, 0x00, 0x00, // complete 0x0000_0002_0000
        0x50, // pop
        0x00,
    ];

    let decoded = GlobSet::read_traced(&mut Cursor::new(bytes.as_slice())).unwrap();
    assert_eq!(
        decoded.globset.ranges(),
        &[
            range(0x1_0010, 0x1_0010),
            range(0x1_0100, 0x1_0105),
            range(0x2_0000, 0x2_0000),
        ]
    );
    assert!(decoded.conformance.is_conformant());

    let at_range = CommonByteStack::replay(&decoded.commands[..3]).unwrap();
    assert_eq!(at_range.common_bytes(), vec![0, 0, 0, 1]);

    // The encoder picks its own layout but describes the same set.
    let reencoded = decoded.globset.encode().unwrap();
    assert_eq!(GlobSet::decode(&reencoded).unwrap(), decoded.globset);
}

#[test]
fn unsorted_stream_is_normalized() {
    let bytes = [
        0x05, 0, 0, 0, 0, 0, // push five bytes
        0x01, 0x20, // 0x20
        0x01, 0x10, // 0x10
        0x52, 0x11, 0x12, // 0x11..=0x12, adjacent to 0x10
        0x50, 0x00,
    ];

    let decoded = GlobSet::read_traced(&mut Cursor::new(bytes.as_slice())).unwrap();
    assert!(!decoded.conformance.ascending_order);
    assert!(!decoded.conformance.grouped_into_ranges);
    assert!(decoded.conformance.duplicates_removed);
    assert!(decoded.conformance.all_globcnt_in_globset);
    assert_eq!(decoded.globset.ranges(), &[range(0x10, 0x12), range(0x20, 0x20)]);
}

#[test]
fn stream_embedded_in_a_larger_buffer() {
    let first = GlobSet::from_ranges([range(1, 3)]);
    let second = GlobSet::from_ranges([range(0x1234_5678, 0x1234_5679)]);

    let mut buffer = first.encode().unwrap();
    second.encode_into(&mut buffer).unwrap();

    let mut cursor = Cursor::new(buffer.as_slice());
    assert_eq!(GlobSet::read_from(&mut cursor).unwrap(), first);
    assert_eq!(GlobSet::read_from(&mut cursor).unwrap(), second);
    assert_eq!(cursor.position() as usize, buffer.len());
}

#[test_case(&[0x06, 0, 0, 0, 0, 0] => DecodeError::UnexpectedEndOfData; "truncated singleton")]
#[test_case(&[0x05, 0, 0, 0, 0, 0, 0x02, 0, 0, 0x00] => DecodeError::StackOverflow { depth: 5, pushed: 2 }; "push past six bytes")]
#[test_case(&[0x05, 0, 0, 0, 0, 0, 0x50, 0x50, 0x00] => DecodeError::StackUnderflow; "extra pop")]
#[test_case(&[0x43, 0x00] => DecodeError::UnknownOpcode(0x43); "unknown opcode")]
#[test_case(&[0x00, 0x00] => DecodeError::TrailingBytes(1); "trailing end")]
fn malformed_streams(bytes: &[u8]) -> DecodeError {
    match GlobSet::decode(bytes) {
        Err(Error::MalformedStream(err)) => err,
        other => panic!("expected a malformed stream, got {other:?}"),
    }
}

#[test]
fn command_trace_serializes_to_json() {
    let bytes = [0x05, 0, 0, 0, 0, 0, 0x42, 0x05, 0b0000_0011, 0x50, 0x00];
    let decoded = GlobSet::read_traced(&mut Cursor::new(bytes.as_slice())).unwrap();

    let json = serde_json::to_value(&decoded.commands).unwrap();
    assert_eq!(json[0]["command"], "push");
    assert_eq!(json[1]["command"], "bitmask");
    assert_eq!(json[1]["start"], 5);
    assert_eq!(json[3]["command"], "end");
    assert_matches!(&decoded.commands[2], Command::Pop);
}
