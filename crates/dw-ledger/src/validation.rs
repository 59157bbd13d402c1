use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use dw_types::RecordId;

use crate::index::SecondaryIndexes;
use crate::records::ProvenanceRecord;

/// Result of a structural ledger audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub record_count: usize,
    pub origin_count: usize,
    pub violations: Vec<AuditViolation>,
}

impl AuditReport {
    /// Returns `true` if all checks passed.
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific structural defect found during an audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditViolation {
    pub record_id: RecordId,
    pub kind: AuditViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuditViolationKind {
    MissingFromOriginIndex,
    MissingFromKindIndex,
    DanglingIndexEntry,
    MisfiledIndexEntry,
    DuplicateIndexEntry,
    IndexOutOfOrder,
    DanglingPriorLink,
    SelfPriorLink,
    CrossOriginPriorLink,
    PriorLinkNewer,
    SchemaVersionMismatch,
}

/// Checks that the record map, both indexes and the prior links agree.
///
/// Hashes and signatures are the chain verifier's concern and are not
/// checked here.
pub struct LedgerAuditor;

impl LedgerAuditor {
    pub fn audit(
        records: &HashMap<RecordId, ProvenanceRecord>,
        indexes: &SecondaryIndexes,
    ) -> AuditReport {
        let mut violations = Vec::new();

        let mut origin_entries = HashSet::new();
        for (origin, ids) in indexes.origins() {
            Self::check_bucket(records, ids, true, &mut origin_entries, &mut violations, |r| {
                r.origin_id == *origin
            });
        }

        let mut kind_entries = HashSet::new();
        for (kind, ids) in indexes.kinds() {
            Self::check_bucket(records, ids, false, &mut kind_entries, &mut violations, |r| {
                r.kind == kind
            });
        }

        let mut ordered: Vec<&ProvenanceRecord> = records.values().collect();
        ordered.sort_by_key(|r| (r.created_at, r.id));

        for record in ordered {
            if !origin_entries.contains(&record.id) {
                violations.push(violation(
                    record.id,
                    AuditViolationKind::MissingFromOriginIndex,
                    format!("not indexed under origin {}", record.origin_id),
                ));
            }
            if !kind_entries.contains(&record.id) {
                violations.push(violation(
                    record.id,
                    AuditViolationKind::MissingFromKindIndex,
                    format!("not indexed under kind {}", record.kind),
                ));
            }
            if record.schema_version != dw_types::SCHEMA_VERSION {
                violations.push(violation(
                    record.id,
                    AuditViolationKind::SchemaVersionMismatch,
                    format!("schema version {}", record.schema_version),
                ));
            }
            Self::check_prior_link(records, record, &mut violations);
        }

        AuditReport {
            record_count: records.len(),
            origin_count: indexes.origin_count(),
            violations,
        }
    }

    /// Origin buckets must be in creation order. Kind buckets mix origins
    /// whose uploads finish in any order, so only their membership is checked.
    fn check_bucket(
        records: &HashMap<RecordId, ProvenanceRecord>,
        ids: &[RecordId],
        check_order: bool,
        seen: &mut HashSet<RecordId>,
        violations: &mut Vec<AuditViolation>,
        belongs: impl Fn(&ProvenanceRecord) -> bool,
    ) {
        let mut previous: Option<&ProvenanceRecord> = None;
        for id in ids {
            if !seen.insert(*id) {
                violations.push(violation(
                    *id,
                    AuditViolationKind::DuplicateIndexEntry,
                    "indexed more than once".into(),
                ));
            }
            let Some(record) = records.get(id) else {
                violations.push(violation(
                    *id,
                    AuditViolationKind::DanglingIndexEntry,
                    "index names a record that does not exist".into(),
                ));
                continue;
            };
            if !belongs(record) {
                violations.push(violation(
                    *id,
                    AuditViolationKind::MisfiledIndexEntry,
                    "indexed under the wrong bucket".into(),
                ));
            }
            if let Some(prev) = previous.filter(|_| check_order) {
                if prev.created_at > record.created_at {
                    violations.push(violation(
                        *id,
                        AuditViolationKind::IndexOutOfOrder,
                        format!("follows newer record {}", prev.id),
                    ));
                }
            }
            previous = Some(record);
        }
    }

    fn check_prior_link(
        records: &HashMap<RecordId, ProvenanceRecord>,
        record: &ProvenanceRecord,
        violations: &mut Vec<AuditViolation>,
    ) {
        let Some(prior_id) = record.prior_link() else {
            return;
        };
        if *prior_id == record.id {
            violations.push(violation(
                record.id,
                AuditViolationKind::SelfPriorLink,
                "record links to itself".into(),
            ));
            return;
        }
        let Some(prior) = records.get(prior_id) else {
            violations.push(violation(
                record.id,
                AuditViolationKind::DanglingPriorLink,
                format!("prior link {prior_id} does not exist"),
            ));
            return;
        };
        if prior.origin_id != record.origin_id {
            violations.push(violation(
                record.id,
                AuditViolationKind::CrossOriginPriorLink,
                format!("prior link belongs to origin {}", prior.origin_id),
            ));
        }
        if prior.created_at > record.created_at {
            violations.push(violation(
                record.id,
                AuditViolationKind::PriorLinkNewer,
                format!("prior link {prior_id} was created later"),
            ));
        }
    }
}

fn violation(record_id: RecordId, kind: AuditViolationKind, description: String) -> AuditViolation {
    AuditViolation {
        record_id,
        kind,
        description,
    }
}
