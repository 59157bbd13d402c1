use std::collections::HashMap;

use dw_types::RecordId;

use crate::records::ProvenanceRecord;

/// Read access to records by id, as seen by the chain verifier.
pub trait RecordLookup {
    fn lookup(&self, id: &RecordId) -> Option<&ProvenanceRecord>;
}

impl RecordLookup for HashMap<RecordId, ProvenanceRecord> {
    fn lookup(&self, id: &RecordId) -> Option<&ProvenanceRecord> {
        self.get(id)
    }
}

impl RecordLookup for [ProvenanceRecord] {
    fn lookup(&self, id: &RecordId) -> Option<&ProvenanceRecord> {
        self.iter().find(|r| r.id == *id)
    }
}
