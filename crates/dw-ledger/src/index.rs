use std::collections::{BTreeMap, HashMap};

use dw_types::{OriginId, RecordId, RecordKind};

use crate::records::ProvenanceRecord;

/// Origin and kind indexes over the record map.
///
/// Each bucket lists record ids in `(createdAt, id)` order, so the last
/// entry of an origin bucket is that origin's chain head.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecondaryIndexes {
    by_origin: HashMap<OriginId, Vec<RecordId>>,
    by_kind: BTreeMap<RecordKind, Vec<RecordId>>,
}

impl SecondaryIndexes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build both indexes from scratch.
    pub fn rebuild<'a>(records: impl IntoIterator<Item = &'a ProvenanceRecord>) -> Self {
        let mut ordered: Vec<&ProvenanceRecord> = records.into_iter().collect();
        ordered.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        let mut indexes = Self::new();
        for record in ordered {
            indexes.insert(record);
        }
        indexes
    }

    /// Reassemble indexes from their exported form.
    pub fn from_parts(
        by_origin: BTreeMap<OriginId, Vec<RecordId>>,
        by_kind: BTreeMap<RecordKind, Vec<RecordId>>,
    ) -> Self {
        Self {
            by_origin: by_origin.into_iter().collect(),
            by_kind,
        }
    }

    /// Exported form, with origins in a stable order.
    pub fn to_parts(
        &self,
    ) -> (
        BTreeMap<OriginId, Vec<RecordId>>,
        BTreeMap<RecordKind, Vec<RecordId>>,
    ) {
        let by_origin = self
            .by_origin
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        (by_origin, self.by_kind.clone())
    }

    /// Append a record. Callers insert in `(createdAt, id)` order.
    pub(crate) fn insert(&mut self, record: &ProvenanceRecord) {
        self.by_origin
            .entry(record.origin_id.clone())
            .or_default()
            .push(record.id);
        self.by_kind.entry(record.kind).or_default().push(record.id);
    }

    /// The most recent record of an origin.
    pub fn head(&self, origin: &OriginId) -> Option<&RecordId> {
        self.by_origin.get(origin).and_then(|ids| ids.last())
    }

    pub fn by_origin(&self, origin: &OriginId) -> &[RecordId] {
        self.by_origin.get(origin).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_kind(&self, kind: RecordKind) -> &[RecordId] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn origins(&self) -> impl Iterator<Item = (&OriginId, &[RecordId])> {
        self.by_origin.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = (RecordKind, &[RecordId])> {
        self.by_kind.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn origin_count(&self) -> usize {
        self.by_origin.len()
    }

    pub fn clear(&mut self) {
        self.by_origin.clear();
        self.by_kind.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{origin, record};

    #[test]
    fn insert_tracks_head_and_buckets() {
        let mut idx = SecondaryIndexes::new();
        let a = record("m1", RecordKind::Compute, 1);
        let b = record("m1", RecordKind::Reasoning, 2);
        let c = record("m2", RecordKind::Compute, 3);
        for r in [&a, &b, &c] {
            idx.insert(r);
        }

        assert_eq!(idx.head(&origin("m1")), Some(&b.id));
        assert_eq!(idx.head(&origin("m2")), Some(&c.id));
        assert_eq!(idx.by_origin(&origin("m1")), &[a.id, b.id]);
        assert_eq!(idx.by_kind(RecordKind::Compute), &[a.id, c.id]);
        assert!(idx.by_kind(RecordKind::Proof).is_empty());
        assert_eq!(idx.origin_count(), 2);
    }

    #[test]
    fn unknown_origin_is_empty() {
        let idx = SecondaryIndexes::new();
        assert!(idx.head(&origin("nobody")).is_none());
        assert!(idx.by_origin(&origin("nobody")).is_empty());
    }

    #[test]
    fn rebuild_orders_by_creation_time() {
        let late = record("m1", RecordKind::Compute, 20);
        let early = record("m1", RecordKind::Compute, 10);
        let idx = SecondaryIndexes::rebuild([&late, &early]);
        assert_eq!(idx.by_origin(&origin("m1")), &[early.id, late.id]);
        assert_eq!(idx.head(&origin("m1")), Some(&late.id));
    }

    #[test]
    fn rebuild_breaks_ties_by_id() {
        let a = record("m1", RecordKind::Compute, 5);
        let b = record("m1", RecordKind::Compute, 5);
        let (lo, hi) = if a.id < b.id { (&a, &b) } else { (&b, &a) };
        let idx = SecondaryIndexes::rebuild([hi, lo]);
        assert_eq!(idx.by_origin(&origin("m1")), &[lo.id, hi.id]);
    }

    #[test]
    fn parts_roundtrip() {
        let a = record("m1", RecordKind::Proof, 1);
        let b = record("m2", RecordKind::Compute, 2);
        let idx = SecondaryIndexes::rebuild([&a, &b]);
        let (by_origin, by_kind) = idx.to_parts();
        assert_eq!(SecondaryIndexes::from_parts(by_origin, by_kind), idx);
    }

    #[test]
    fn clear_empties_everything() {
        let mut idx = SecondaryIndexes::rebuild([&record("m1", RecordKind::Compute, 1)]);
        idx.clear();
        assert_eq!(idx, SecondaryIndexes::new());
    }
}
