//! # IDSET: GLOBSETs keyed by replica
//!
//! An IDSET is a sequence of elements, each pairing a replica key with the
//! GLOBSET of counters allocated by that replica. On the wire the elements
//! are written back to back with no count: a reader keeps taking elements
//! until the buffer runs out.
//!
//! Two flavours exist, keyed by a 2-byte [`Replid`] or by a 16-byte
//! [`Replguid`]. Both are instances of the generic [`Idset`].

use std::collections::BTreeMap;
use std::io::Cursor;

use crate::codec::{is_exhausted, Decodable, Encodable};
use crate::error::Error;
use crate::globcnt::{Globcnt, GLOBCNT_SIZE};
use crate::globset::{globcnt_list, GlobSet};
use crate::replica::{compose_id, split_id, ReplicaKey, Replguid, Replid};
use crate::VALUE_COUNT_LIMIT;

/// One replica key and the counters it allocated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct IdsetElement<K> {
    /// The replica that allocated the counters
    pub key: K,
    /// The allocated counters
    pub globset: GlobSet,
}

/// An IDSET element keyed by REPLID.
pub type ReplidIdsetElement = IdsetElement<Replid>;
/// An IDSET element keyed by REPLGUID.
pub type ReplguidIdsetElement = IdsetElement<Replguid>;

impl<K: ReplicaKey> IdsetElement<K> {
    /// Creates an element.
    pub fn new(key: K, globset: GlobSet) -> Self {
        Self { key, globset }
    }
}

impl<K: ReplicaKey> Encodable for IdsetElement<K> {
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        self.key.encode_into(out)?;
        self.globset.encode_into(out)
    }
}

impl<K: ReplicaKey> Decodable for IdsetElement<K> {
    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let key = K::read_from(cursor)?;
        let globset = GlobSet::read_from(cursor)?;
        Ok(Self { key, globset })
    }
}

/// A set of IDs grouped by replica.
///
/// Elements are kept in the order their keys first appeared. A key never
/// appears twice: adding counters for a key that is already present merges
/// them into its element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct Idset<K> {
    elements: Vec<IdsetElement<K>>,
}

/// An IDSET keyed by REPLID.
pub type ReplidIdset = Idset<Replid>;
/// An IDSET keyed by REPLGUID.
pub type ReplguidIdset = Idset<Replguid>;

impl<K> Default for Idset<K> {
    fn default() -> Self {
        Self { elements: Vec::new() }
    }
}

impl<K: ReplicaKey> Idset<K> {
    /// Creates an empty IDSET.
    pub fn new() -> Self {
        Self::default()
    }

    /// The elements in key order of first appearance.
    pub fn elements(&self) -> &[IdsetElement<K>] {
        &self.elements
    }

    /// Whether the IDSET holds no counters at all.
    pub fn is_empty(&self) -> bool {
        self.elements.iter().all(|element| element.globset.is_empty())
    }

    /// Total number of counters across every replica, saturating at
    /// `u64::MAX`.
    pub fn len(&self) -> u64 {
        self.elements
            .iter()
            .fold(0u64, |total, element| total.saturating_add(element.globset.len()))
    }

    /// The GLOBSET held for `key`, if any.
    pub fn get(&self, key: &K) -> Option<&GlobSet> {
        self.elements
            .iter()
            .find(|element| element.key == *key)
            .map(|element| &element.globset)
    }

    /// Adds the counters of `globset` under `key`.
    pub fn insert(&mut self, key: K, globset: GlobSet) {
        match self.elements.iter_mut().find(|element| element.key == key) {
            Some(element) => {
                tracing::debug!(%key, "merging counters into existing IDSET element");
                element.globset.union(&globset);
            }
            None => self.elements.push(IdsetElement { key, globset }),
        }
    }

    /// Appends `element`, or merges it into the element already holding its
    /// key. `positions` maps every key present to its index and must be
    /// kept in step with `self.elements`. Returns whether a merge happened.
    fn push_or_merge(
        &mut self,
        positions: &mut BTreeMap<K, usize>,
        element: IdsetElement<K>,
    ) -> bool {
        match positions.get(&element.key) {
            Some(&index) => {
                self.elements[index].globset.union(&element.globset);
                true
            }
            None => {
                positions.insert(element.key, self.elements.len());
                self.elements.push(element);
                false
            }
        }
    }

    /// Whether every counter of `other` is also in this IDSET.
    ///
    /// Elements are matched by key. An element of `other` whose key has no
    /// element here is only covered when it is empty.
    pub fn contains(&self, other: &Idset<K>) -> bool {
        other.elements.iter().all(|theirs| match self.get(&theirs.key) {
            Some(ours) => ours.is_superset(&theirs.globset),
            None => theirs.globset.is_empty(),
        })
    }

    /// Whether both IDSETs hold exactly the same counters, regardless of
    /// element order or empty elements.
    pub fn is_equivalent(&self, other: &Idset<K>) -> bool {
        self.contains(other) && other.contains(self)
    }

    /// Expands the IDSET into (key, counter) pairs, bounded by `limit`.
    ///
    /// ## Errors
    /// * `TooManyValues` - if the IDSET holds more than `limit` counters
    pub fn to_pairs(&self, limit: u64) -> Result<Vec<(K, Globcnt)>, Error> {
        let mut remaining = limit;
        let mut pairs = Vec::new();

        for element in &self.elements {
            let values = globcnt_list(element.globset.ranges(), remaining)
                .map_err(|_| Error::TooManyValues(self.len()))?;
            remaining -= values.len() as u64;
            pairs.extend(values.into_iter().map(|value| (element.key, value)));
        }

        Ok(pairs)
    }
}

impl ReplidIdset {
    /// Builds an IDSET from 64-bit IDs.
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let mut by_replid: BTreeMap<Replid, Vec<Globcnt>> = BTreeMap::new();
        for id in ids {
            let (replid, globcnt) = split_id(id);
            by_replid.entry(replid).or_default().push(globcnt);
        }

        by_replid
            .into_iter()
            .map(|(replid, values)| IdsetElement::new(replid, GlobSet::from_values(values)))
            .collect()
    }

    /// Expands the IDSET into 64-bit IDs, bounded by [`VALUE_COUNT_LIMIT`].
    pub fn to_ids(&self) -> Result<Vec<u64>, Error> {
        self.to_ids_with_limit(VALUE_COUNT_LIMIT)
    }

    /// Expands the IDSET into 64-bit IDs, bounded by `limit`.
    ///
    /// ## Errors
    /// * `TooManyValues` - if the IDSET holds more than `limit` IDs
    pub fn to_ids_with_limit(&self, limit: u64) -> Result<Vec<u64>, Error> {
        let pairs = self.to_pairs(limit)?;
        Ok(pairs
            .into_iter()
            .map(|(replid, globcnt)| compose_id(replid, globcnt))
            .collect())
    }

    /// Whether the 64-bit ID is in the IDSET.
    pub fn contains_id(&self, id: u64) -> bool {
        let (replid, globcnt) = split_id(id);
        self.get(&replid).is_some_and(|globset| globset.contains(globcnt))
    }
}

impl ReplguidIdset {
    /// Builds an IDSET from long-term IDs.
    pub fn from_long_term_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = LongTermId>,
    {
        let mut by_replguid: BTreeMap<Replguid, Vec<Globcnt>> = BTreeMap::new();
        for id in ids {
            by_replguid.entry(id.replguid).or_default().push(id.globcnt);
        }

        by_replguid
            .into_iter()
            .map(|(replguid, values)| IdsetElement::new(replguid, GlobSet::from_values(values)))
            .collect()
    }

    /// Expands the IDSET into long-term IDs, bounded by
    /// [`VALUE_COUNT_LIMIT`].
    ///
    /// ## Errors
    /// * `TooManyValues` - if the IDSET holds more than the limit
    pub fn to_long_term_ids(&self) -> Result<Vec<LongTermId>, Error> {
        self.to_long_term_ids_with_limit(VALUE_COUNT_LIMIT)
    }

    /// Expands the IDSET into long-term IDs, bounded by `limit`.
    pub fn to_long_term_ids_with_limit(&self, limit: u64) -> Result<Vec<LongTermId>, Error> {
        let pairs = self.to_pairs(limit)?;
        Ok(pairs
            .into_iter()
            .map(|(replguid, globcnt)| LongTermId::new(replguid, globcnt))
            .collect())
    }

    /// Whether the long-term ID is in the IDSET.
    pub fn contains_long_term_id(&self, id: &LongTermId) -> bool {
        self.get(&id.replguid)
            .is_some_and(|globset| globset.contains(id.globcnt))
    }
}

impl<K: ReplicaKey> FromIterator<IdsetElement<K>> for Idset<K> {
    fn from_iter<T: IntoIterator<Item = IdsetElement<K>>>(iter: T) -> Self {
        let mut idset = Self::new();
        let mut positions = BTreeMap::new();
        for element in iter {
            idset.push_or_merge(&mut positions, element);
        }
        idset
    }
}

/// Writes every element as its key followed by its GLOBSET.
impl<K: ReplicaKey> Encodable for Idset<K> {
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        self.elements
            .iter()
            .try_for_each(|element| element.encode_into(out))
    }
}

/// Reads elements until the buffer is exhausted. A key that appears more
/// than once has its GLOBSETs merged.
impl<K: ReplicaKey> Decodable for Idset<K> {
    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let mut idset = Self::new();
        let mut positions = BTreeMap::new();

        while !is_exhausted(cursor) {
            let element = IdsetElement::<K>::read_from(cursor)?;
            tracing::trace!(key = %element.key, globset = %element.globset, "decoded IDSET element");

            let key = element.key;
            if idset.push_or_merge(&mut positions, element) {
                tracing::warn!(%key, "replica key repeated in IDSET");
            }
        }

        Ok(idset)
    }
}

/// Size of a serialized [`LongTermId`].
pub const LONG_TERM_ID_SIZE: usize = Replguid::WIRE_SIZE + GLOBCNT_SIZE + 2;

/// An ID that is meaningful across mailboxes: the replica GUID and the
/// counter, followed on the wire by two zero bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct LongTermId {
    /// The replica that allocated the counter
    pub replguid: Replguid,
    /// The counter
    pub globcnt: Globcnt,
}

impl LongTermId {
    /// Creates a long-term ID.
    pub fn new(replguid: Replguid, globcnt: Globcnt) -> Self {
        Self { replguid, globcnt }
    }
}

impl Encodable for LongTermId {
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        self.replguid.encode_into(out)?;
        out.extend_from_slice(self.globcnt.as_bytes());
        out.extend_from_slice(&[0, 0]);
        Ok(())
    }
}

/// The padding bytes are read but not checked.
impl Decodable for LongTermId {
    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let replguid = Replguid::read_from(cursor)?;
        let globcnt = Globcnt::new(crate::codec::read_array(cursor)?);
        let _pad: [u8; 2] = crate::codec::read_array(cursor)?;
        Ok(Self { replguid, globcnt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::range::GlobcntRange;
    use assert_matches::assert_matches;
    use more_asserts::assert_gt;

    fn cnt(value: u64) -> Globcnt {
        Globcnt::from_u64(value).unwrap()
    }

    fn globset(values: impl IntoIterator<Item = u64>) -> GlobSet {
        values.into_iter().map(cnt).collect()
    }

    fn replid_idset(elements: Vec<(u16, Vec<u64>)>) -> ReplidIdset {
        elements
            .into_iter()
            .map(|(key, values)| IdsetElement::new(Replid(key), globset(values)))
            .collect()
    }

    #[test]
    fn test_containment_by_replica() {
        let outer = replid_idset(vec![(1, (10..=20).collect())]);
        let inner = replid_idset(vec![(1, vec![12, 13, 14, 15])]);
        let other_replica = replid_idset(vec![(2, vec![12])]);

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(!outer.contains(&other_replica));
    }

    #[test]
    fn test_missing_key_covered_only_when_empty() {
        let outer = replid_idset(vec![(1, vec![1, 2, 3])]);
        let empty_element = replid_idset(vec![(1, vec![2]), (7, vec![])]);

        assert!(outer.contains(&empty_element));
        assert!(outer.contains(&ReplidIdset::new()));
        assert!(outer.is_equivalent(&replid_idset(vec![(9, vec![]), (1, vec![3, 1, 2])])));
    }

    #[test]
    fn test_wire_format() {
        let idset = replid_idset(vec![(1, vec![5]), (2, vec![])]);
        let encoded = idset.encode().unwrap();
        assert_eq!(
            encoded,
            vec![
                0x01, 0x00, // replid 1
                0x06, 0, 0, 0, 0, 0, 5, 0x00, // {5}
                0x02, 0x00, // replid 2
                0x00, // empty GLOBSET
            ]
        );
        assert_eq!(ReplidIdset::decode(&encoded).unwrap(), idset);
    }

    #[test]
    fn test_repeated_key_is_merged() {
        let bytes = [
            0x01, 0x00, 0x06, 0, 0, 0, 0, 0, 5, 0x00, // replid 1: {5}
            0x02, 0x00, 0x06, 0, 0, 0, 0, 0, 9, 0x00, // replid 2: {9}
            0x01, 0x00, 0x06, 0, 0, 0, 0, 0, 6, 0x00, // replid 1: {6}
        ];
        let idset = ReplidIdset::decode(&bytes).unwrap();

        assert_eq!(idset.elements().len(), 2);
        assert_eq!(idset.get(&Replid(1)), Some(&globset([5, 6])));
        assert_eq!(idset.get(&Replid(2)), Some(&globset([9])));
    }

    #[test]
    fn test_insert_merges_by_key() {
        let mut idset = ReplidIdset::new();
        idset.insert(Replid(2), globset([1, 2]));
        idset.insert(Replid(1), globset([7]));
        idset.insert(Replid(2), globset([3, 10]));

        assert_eq!(idset.elements().len(), 2);
        assert_eq!(idset.elements()[0].key, Replid(2));
        assert_eq!(idset.get(&Replid(2)), Some(&globset([1, 2, 3, 10])));
        assert_eq!(idset.len(), 5);
        assert!(idset.contains(&replid_idset(vec![(1, vec![7]), (2, vec![3])])));
    }

    #[test]
    fn test_empty_buffer_is_empty_idset() {
        let idset = ReplguidIdset::decode(&[]).unwrap();
        assert!(idset.is_empty());
        assert!(idset.elements().is_empty());
    }

    #[test]
    fn test_truncated_element() {
        assert_matches!(
            ReplidIdset::decode(&[0x01]),
            Err(Error::MalformedStream(DecodeError::UnexpectedEndOfData))
        );
        assert_matches!(
            ReplidIdset::decode(&[0x01, 0x00, 0x06, 0, 0]),
            Err(Error::MalformedStream(DecodeError::UnexpectedEndOfData))
        );
    }

    #[test]
    fn test_id_materialization() {
        let ids = [
            compose_id(Replid(1), cnt(3)),
            compose_id(Replid(1), cnt(4)),
            compose_id(Replid(2), cnt(3)),
        ];
        let idset = ReplidIdset::from_ids(ids.iter().rev().copied());

        assert_eq!(idset.len(), 3);
        assert!(idset.contains_id(ids[1]));
        assert!(!idset.contains_id(compose_id(Replid(2), cnt(4))));

        let mut round_trip = idset.to_ids().unwrap();
        round_trip.sort_unstable();
        let mut expected = ids.to_vec();
        expected.sort_unstable();
        assert_eq!(round_trip, expected);
    }

    #[test]
    fn test_value_count_limit() {
        let idset = replid_idset(vec![(1, (0..10).collect()), (2, vec![1, 2, 3])]);

        assert_eq!(idset.to_ids_with_limit(13).unwrap().len(), 13);
        assert_matches!(idset.to_ids_with_limit(12), Err(Error::TooManyValues(13)));

        let huge: ReplidIdset = [IdsetElement::new(
            Replid(1),
            GlobSet::from_ranges([GlobcntRange::new(Globcnt::MIN, Globcnt::MAX).unwrap()]),
        )]
        .into_iter()
        .collect();
        assert_gt!(huge.len(), VALUE_COUNT_LIMIT);
        assert_matches!(huge.to_ids(), Err(Error::TooManyValues(_)));
    }

    #[test]
    fn test_count_saturates_across_many_replicas() {
        // 65,537 replicas each holding the whole GLOBCNT domain hold more
        // than u64::MAX counters in total.
        let whole_domain =
            GlobSet::from_ranges([GlobcntRange::new(Globcnt::MIN, Globcnt::MAX).unwrap()]);
        let idset: ReplguidIdset = (0..65_537u32)
            .map(|i| Replguid::from_fields(i, 0, 0, [0; 8]))
            .map(|key| IdsetElement::new(key, whole_domain.clone()))
            .collect();

        assert_eq!(idset.elements().len(), 65_537);
        assert_eq!(idset.len(), u64::MAX);
        assert_matches!(idset.to_long_term_ids(), Err(Error::TooManyValues(u64::MAX)));

        let encoded = idset.encode().unwrap();
        assert_eq!(encoded.len(), 65_537 * 30);
        let decoded = ReplguidIdset::decode(&encoded).unwrap();
        assert_eq!(decoded, idset);
        assert_matches!(decoded.to_long_term_ids(), Err(Error::TooManyValues(u64::MAX)));
    }

    #[test]
    fn test_repeated_keys_keep_first_position() {
        let mut bytes = Vec::new();
        for round in 0..3u64 {
            for key in [3u16, 1, 2] {
                IdsetElement::new(Replid(key), globset([round * 10 + key as u64]))
                    .encode_into(&mut bytes)
                    .unwrap();
            }
        }

        let idset = ReplidIdset::decode(&bytes).unwrap();
        let keys: Vec<Replid> = idset.elements().iter().map(|element| element.key).collect();
        assert_eq!(keys, vec![Replid(3), Replid(1), Replid(2)]);
        assert_eq!(idset.get(&Replid(1)), Some(&globset([1, 11, 21])));
        assert_eq!(idset.len(), 9);
    }

    #[test]
    fn test_long_term_ids() {
        let guid: Replguid = "00112233-4455-6677-8899-aabbccddeeff".parse().unwrap();
        let id = LongTermId::new(guid, cnt(0x0102));

        let encoded = id.encode().unwrap();
        assert_eq!(encoded.len(), LONG_TERM_ID_SIZE);
        assert_eq!(&encoded[16..], &[0, 0, 0, 0, 0x01, 0x02, 0, 0]);
        assert_eq!(LongTermId::decode(&encoded).unwrap(), id);

        let idset = ReplguidIdset::from_long_term_ids([id, LongTermId::new(guid, cnt(0x0103))]);
        assert_eq!(idset.elements().len(), 1);
        assert!(idset.contains_long_term_id(&id));
        assert_eq!(idset.to_long_term_ids().unwrap()[0], id);

        let encoded = idset.encode().unwrap();
        assert_eq!(ReplguidIdset::decode(&encoded).unwrap(), idset);
    }
}
