//! IDSET decoding from hand-written buffers.

use assert_matches::assert_matches;
use idset::replica::compose_id;
use idset::{
    Decodable, DecodeError, Encodable, Error, Globcnt, LongTermId, Replguid, ReplguidIdset,
    Replid, ReplidIdset,
};

const GUID_A: &str = "6b1e5d8c-2f4a-4e0b-9c3d-7a8f1e2d3c4b";
const GUID_B: &str = "0f0e0d0c-0b0a-0908-0706-050403020100";

fn cnt(value: u64) -> Globcnt {
    Globcnt::from_u64(value).unwrap()
}

#[test]
fn replid_idset_from_bytes() {
    let bytes = [
        0x01, 0x00, // replid 1
        0x05, 0, 0, 0, 0, 0, 0x42, 0x01, 0b0000_0101, 0x50, 0x00, // {1, 2, 4}
        0x03, 0x00, // replid 3
        0x52, 0, 0, 0, 0, 0, 0x10, 0, 0, 0, 0, 0, 0x12, 0x00, // 0x10..=0x12
    ];
    let idset = ReplidIdset::decode(&bytes).unwrap();

    let ids = idset.to_ids().unwrap();
    let expected: Vec<u64> = [(1, 1), (1, 2), (1, 4), (3, 0x10), (3, 0x11), (3, 0x12)]
        .into_iter()
        .map(|(replid, value)| compose_id(Replid(replid), cnt(value)))
        .collect();
    assert_eq!(ids, expected);

    let reencoded = idset.encode().unwrap();
    assert!(ReplidIdset::decode(&reencoded).unwrap().is_equivalent(&idset));
}

#[test]
fn replguid_idset_round_trip() {
    let a: Replguid = GUID_A.parse().unwrap();
    let b: Replguid = GUID_B.parse().unwrap();

    let ids = [
        LongTermId::new(a, cnt(7)),
        LongTermId::new(b, cnt(0xFFFF_FFFF_FFFF)),
        LongTermId::new(a, cnt(8)),
    ];
    let idset = ReplguidIdset::from_long_term_ids(ids);

    assert_eq!(idset.elements().len(), 2);

    // Two keys, a range command for {7, 8} and a six-byte push for the
    // largest counter.
    let encoded = idset.encode().unwrap();
    assert_eq!(encoded.len(), 2 * 16 + 14 + 8);

    let decoded = ReplguidIdset::decode(&encoded).unwrap();
    assert_eq!(decoded, idset);
    assert!(ids.iter().all(|id| decoded.contains_long_term_id(id)));
    assert_eq!(decoded.to_long_term_ids().unwrap().len(), 3);
}

#[test]
fn truncated_guid_is_malformed() {
    let a: Replguid = GUID_A.parse().unwrap();
    let bytes = &a.as_bytes()[..10];

    assert_matches!(
        ReplguidIdset::decode(bytes),
        Err(Error::MalformedStream(DecodeError::UnexpectedEndOfData))
    );
}

#[test]
fn idset_json_shape() {
    let idset = ReplidIdset::from_ids([compose_id(Replid(2), cnt(9))]);
    let json = serde_json::to_value(&idset).unwrap();

    assert_eq!(json[0]["key"], 2);
    assert_eq!(json[0]["globset"][0]["start"], 9);
    assert_eq!(json[0]["globset"][0]["end"], 9);
}
