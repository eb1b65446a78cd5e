//! End-to-end checks of the documented encodings.

use assert_matches::assert_matches;
use idset::{
    Command, Decodable, DecodeError, Encodable, Error, GlobSet, Globcnt, IdsetElement, Replid,
    ReplidIdset,
};

fn globset(values: impl IntoIterator<Item = u64>) -> GlobSet {
    values
        .into_iter()
        .map(|value| Globcnt::from_u64(value).unwrap())
        .collect()
}

#[test]
fn single_value_is_a_six_byte_push() {
    let encoded = globset([5]).encode().unwrap();
    assert_eq!(encoded, [0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x00]);

    let decoded = GlobSet::decode(&encoded).unwrap();
    assert_eq!(decoded, globset([5]));
}

#[test]
fn contiguous_run_is_one_command() {
    let run = globset(5..=13);
    let encoded = run.encode().unwrap();
    let decoded = GlobSet::read_traced(&mut std::io::Cursor::new(encoded.as_slice())).unwrap();

    assert_eq!(decoded.commands.len(), 2);
    assert_matches!(decoded.commands[0], Command::Range { .. });
    assert_eq!(decoded.globset.values().count(), 9);
    assert_eq!(decoded.globset, run);
}

#[test]
fn scattered_low_bytes_use_a_bitmask() {
    let encoded = globset([5, 6, 7, 9, 13]).encode().unwrap();
    assert_eq!(
        encoded,
        [0x05, 0, 0, 0, 0, 0, 0x42, 0x05, 0b1000_1011, 0x50, 0x00]
    );
}

#[test]
fn distant_values_share_pushed_bytes() {
    let set = globset([5, 100]);
    let encoded = set.encode().unwrap();

    let decoded = GlobSet::read_traced(&mut std::io::Cursor::new(encoded.as_slice())).unwrap();
    let singletons = decoded
        .commands
        .iter()
        .filter(|command| matches!(command, Command::Push { range: Some(_), .. }))
        .count();

    assert_eq!(singletons, 2);
    assert_eq!(decoded.globset, set);
    assert!(decoded.conformance.is_conformant());
}

#[test]
fn bitmask_below_five_common_bytes_is_malformed() {
    let bytes = [0x03, 0x00, 0x00, 0x00, 0x42, 0x05, 0xFF, 0x50, 0x00];
    let err = GlobSet::decode(&bytes).unwrap_err();

    assert!(err.is_malformed_stream());
    assert_matches!(err, Error::MalformedStream(DecodeError::BitmaskStackDepth(3)));
}

#[test]
fn replid_containment() {
    let outer: ReplidIdset = [IdsetElement::new(Replid(1), globset(10..=20))]
        .into_iter()
        .collect();
    let inner: ReplidIdset = [IdsetElement::new(Replid(1), globset(12..=15))]
        .into_iter()
        .collect();
    let foreign: ReplidIdset = [IdsetElement::new(Replid(2), globset(12..=15))]
        .into_iter()
        .collect();

    let outer = ReplidIdset::decode(&outer.encode().unwrap()).unwrap();
    let inner = ReplidIdset::decode(&inner.encode().unwrap()).unwrap();
    let foreign = ReplidIdset::decode(&foreign.encode().unwrap()).unwrap();

    assert!(outer.contains(&inner));
    assert!(!outer.contains(&foreign));
}
