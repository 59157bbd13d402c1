use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dw_types::{OriginId, RecordId, RecordKind};

use crate::records::ProvenanceRecord;

/// Portable dump of the whole ledger, as written by `export` and read by
/// `import`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerExport {
    pub schema_version: String,
    pub exported_at: u64,
    pub records: Vec<ProvenanceRecord>,
    pub by_origin_index: BTreeMap<OriginId, Vec<RecordId>>,
    pub by_kind_index: BTreeMap<RecordKind, Vec<RecordId>>,
}

impl LedgerExport {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Aggregate counts over the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStatistics {
    pub total_records: usize,
    pub compute_records: usize,
    pub proof_records: usize,
    pub reasoning_records: usize,
    pub unique_origins: usize,
    pub records_by_origin: BTreeMap<OriginId, usize>,
    /// `createdAt` of the newest record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_created_at: Option<u64>,
}

impl LedgerStatistics {
    pub fn count_for(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Compute => self.compute_records,
            RecordKind::Proof => self.proof_records,
            RecordKind::Reasoning => self.reasoning_records,
        }
    }
}
