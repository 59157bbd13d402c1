//! Provenance ledger for DataWeave.
//!
//! This crate is the heart of DataWeave. It provides:
//! - Chain-linked, hashed and signed provenance records
//! - `ProvenanceLedger`, an in-memory store that uploads record bodies to a
//!   durable object store before committing them
//! - Origin and kind secondary indexes
//! - Filtered, sorted, paginated queries
//! - Chain verification and structural audits
//! - Export and import of the whole ledger, and a data directory that
//!   persists both between runs

pub mod clock;
pub mod config;
pub mod error;
pub mod index;
pub mod ledger;
pub mod oracle;
pub mod persist;
pub mod query;
pub mod records;
pub mod snapshot;
pub mod traits;
pub mod validation;
pub mod verify;

#[cfg(test)]
mod test_support;

pub use clock::MonotonicClock;
pub use config::{LedgerConfig, SigningConfig};
pub use error::{CreationError, LedgerError, LedgerResult};
pub use index::SecondaryIndexes;
pub use ledger::ProvenanceLedger;
pub use oracle::{ProofOracle, StructuralProofOracle};
pub use persist::LedgerDir;
pub use query::{PageRequest, QueryEngine, QueryFilter, QueryPage, SortKey, SortOrder, TimeRange};
pub use records::{
    ComputePayload, CreateRecordRequest, ProofPayload, ProvenanceRecord, ReasoningPayload,
    RecordDescriptor, RecordMetadata, RecordPayload,
};
pub use snapshot::{LedgerExport, LedgerStatistics};
pub use traits::RecordLookup;
pub use validation::{AuditReport, AuditViolation, AuditViolationKind, LedgerAuditor};
pub use verify::{ChainReport, ChainVerifier, DurableCopyReport, IntegrityViolation, LinkVerification};
