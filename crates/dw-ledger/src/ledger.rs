use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use tracing::{debug, info, warn};

use dw_crypto::{ContentHasher, RecordSigner, SignatureMaterial};
use dw_store::{DurableObjectStore, ObjectTag, StoreError};
use dw_types::{OriginId, RecordId, RecordKind, SCHEMA_VERSION};

use crate::clock::MonotonicClock;
use crate::config::LedgerConfig;
use crate::error::{CreationError, LedgerError, LedgerResult};
use crate::index::SecondaryIndexes;
use crate::query::{PageRequest, QueryEngine, QueryFilter, QueryPage};
use crate::records::{
    CanonicalContent, CreateRecordRequest, ProvenanceRecord, RecordDescriptor, RecordPayload,
};
use crate::snapshot::{LedgerExport, LedgerStatistics};
use crate::validation::{AuditReport, LedgerAuditor};
use crate::verify::{ChainReport, ChainVerifier, DurableCopyReport, LinkVerification};

/// The provenance record store.
///
/// Records live in memory behind a single `RwLock`, together with the
/// secondary indexes, so every reader sees a record and its index entries
/// together or not at all. Record bodies are also uploaded to a
/// [`DurableObjectStore`] before they become visible.
///
/// Creations for the same origin are serialized; creations for different
/// origins proceed concurrently.
pub struct ProvenanceLedger {
    config: LedgerConfig,
    durable: Arc<dyn DurableObjectStore>,
    signer: Arc<dyn RecordSigner>,
    clock: MonotonicClock,
    inner: RwLock<LedgerState>,
    origin_locks: Mutex<HashMap<OriginId, Arc<tokio::sync::Mutex<()>>>>,
}

#[derive(Default)]
struct LedgerState {
    records: HashMap<RecordId, ProvenanceRecord>,
    indexes: SecondaryIndexes,
    /// Bumped by `import` and `clear` so in-flight creations can tell their
    /// chain head went stale.
    generation: u64,
}

impl ProvenanceLedger {
    /// Create an empty ledger signing with the scheme named in `config`.
    pub fn new(config: LedgerConfig, durable: Arc<dyn DurableObjectStore>) -> LedgerResult<Self> {
        let signer = config.signing.build()?;
        Ok(Self::with_signer(config, durable, signer))
    }

    pub fn with_signer(
        config: LedgerConfig,
        durable: Arc<dyn DurableObjectStore>,
        signer: Arc<dyn RecordSigner>,
    ) -> Self {
        Self {
            config,
            durable,
            signer,
            clock: MonotonicClock::new(),
            inner: RwLock::new(LedgerState::default()),
            origin_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn signer(&self) -> &dyn RecordSigner {
        self.signer.as_ref()
    }

    pub fn durable(&self) -> &Arc<dyn DurableObjectStore> {
        &self.durable
    }

    /// Create, sign, upload and commit a new record at the head of its
    /// origin's chain.
    ///
    /// On any error nothing is committed: no record, no index entry, and the
    /// origin's head is unchanged.
    pub async fn create(
        &self,
        request: CreateRecordRequest,
    ) -> Result<RecordDescriptor, CreationError> {
        validate_request(&request)?;

        let origin_lock = self.origin_lock(&request.origin_id)?;
        let _origin_guard = origin_lock.lock().await;

        let (head, generation) = {
            let state = self.read_state()?;
            (
                state.indexes.head(&request.origin_id).copied(),
                state.generation,
            )
        };

        let id = RecordId::new();
        let created_at = self.clock.now();
        let CreateRecordRequest {
            kind,
            origin_id,
            metadata,
            payload,
        } = request;

        let canonical = CanonicalContent {
            kind,
            origin_id: &origin_id,
            created_at,
            metadata: &metadata,
            payload: &payload,
        }
        .to_bytes()?;
        let content_hash = ContentHasher::RECORD.hash(&canonical);
        let signature = self.signer.sign_material(&SignatureMaterial {
            record_id: &id,
            content_hash: &content_hash,
            created_at,
            origin_id: &origin_id,
        })?;

        debug!(record = %id, origin = %origin_id, %kind, "uploading record body");
        let tags = self.upload_tags(&id, &origin_id, kind, created_at);
        let upload = self.durable.upload(Bytes::from(canonical), &tags);
        let uploaded = tokio::time::timeout(self.config.upload_timeout(), upload)
            .await
            .unwrap_or(Err(StoreError::Timeout {
                after_ms: self.config.upload_timeout_ms,
            }));
        let durable_ref = match uploaded {
            Ok(durable_ref) => durable_ref,
            Err(e) => {
                warn!(record = %id, origin = %origin_id, error = %e, "durable upload failed");
                return Err(CreationError::StorageUnavailable(e.to_string()));
            }
        };

        let record = ProvenanceRecord {
            id,
            kind,
            origin_id,
            created_at,
            content_hash,
            durable_ref,
            metadata,
            payload,
            prior_links: head.into_iter().collect(),
            signature,
            schema_version: SCHEMA_VERSION.to_string(),
        };
        let descriptor = record.descriptor();

        {
            let mut state = self.write_state()?;
            if state.generation != generation {
                warn!(record = %id, "ledger replaced during creation");
                return Err(CreationError::Superseded);
            }
            state.indexes.insert(&record);
            state.records.insert(id, record);
        }

        info!(
            record = %descriptor.record_id,
            origin = %descriptor.origin_id,
            kind = %descriptor.kind,
            durable = %descriptor.durable_ref,
            "record committed"
        );
        Ok(descriptor)
    }

    pub fn get_by_id(&self, id: &RecordId) -> LedgerResult<Option<ProvenanceRecord>> {
        Ok(self.read_state()?.records.get(id).cloned())
    }

    /// The newest record of an origin, if it has any.
    pub fn head(&self, origin: &OriginId) -> LedgerResult<Option<RecordId>> {
        Ok(self.read_state()?.indexes.head(origin).copied())
    }

    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.read_state()?.records.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.read_state()?.records.is_empty())
    }

    /// Filter, sort and paginate records against one consistent view.
    pub fn query(&self, filter: &QueryFilter, page: &PageRequest) -> LedgerResult<QueryPage> {
        let state = self.read_state()?;
        Ok(QueryEngine::execute(
            &state.records,
            &state.indexes,
            filter,
            page,
        ))
    }

    /// The `limit` newest records.
    pub fn recent(&self, limit: usize) -> LedgerResult<Vec<ProvenanceRecord>> {
        Ok(self
            .query(&QueryFilter::default(), &PageRequest::newest(limit))?
            .records)
    }

    /// Verify the chain ending at `id`. An unknown `id` yields an invalid
    /// report listing it as missing.
    pub fn verify_chain(&self, id: &RecordId) -> LedgerResult<ChainReport> {
        let state = self.read_state()?;
        let verifier = ChainVerifier::new(self.signer.as_ref(), self.durable.as_ref());
        Ok(verifier.verify_chain(&state.records, id))
    }

    /// Verify a single record without walking its chain.
    pub fn verify_record(&self, id: &RecordId) -> LedgerResult<Option<LinkVerification>> {
        let state = self.read_state()?;
        let verifier = ChainVerifier::new(self.signer.as_ref(), self.durable.as_ref());
        Ok(state.records.get(id).map(|r| verifier.verify_link(r)))
    }

    /// Fetch a record's durable copy and compare it with the record.
    pub async fn verify_durable_copy(
        &self,
        id: &RecordId,
    ) -> LedgerResult<Option<DurableCopyReport>> {
        let Some(record) = self.get_by_id(id)? else {
            return Ok(None);
        };
        let fetched = self
            .durable
            .fetch(&record.durable_ref)
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        let (present, matches) = match fetched {
            Some(bytes) => (true, ContentHasher::RECORD.verify(&bytes, &record.content_hash)),
            None => (false, false),
        };
        Ok(Some(DurableCopyReport {
            record_id: record.id,
            durable_ref: record.durable_ref,
            present,
            matches,
        }))
    }

    pub fn statistics(&self) -> LedgerResult<LedgerStatistics> {
        let state = self.read_state()?;
        let records_by_origin = state
            .indexes
            .origins()
            .map(|(origin, ids)| (origin.clone(), ids.len()))
            .collect();

        Ok(LedgerStatistics {
            total_records: state.records.len(),
            compute_records: state.indexes.by_kind(RecordKind::Compute).len(),
            proof_records: state.indexes.by_kind(RecordKind::Proof).len(),
            reasoning_records: state.indexes.by_kind(RecordKind::Reasoning).len(),
            unique_origins: state.indexes.origin_count(),
            records_by_origin,
            latest_created_at: state.records.values().map(|r| r.created_at).max(),
        })
    }

    /// Structural consistency check of records, indexes and prior links.
    pub fn audit(&self) -> LedgerResult<AuditReport> {
        let state = self.read_state()?;
        Ok(LedgerAuditor::audit(&state.records, &state.indexes))
    }

    /// Dump all records and both indexes.
    pub fn export(&self) -> LedgerResult<LedgerExport> {
        let state = self.read_state()?;
        let mut records: Vec<ProvenanceRecord> = state.records.values().cloned().collect();
        records.sort_by_key(|r| (r.created_at, r.id));
        let (by_origin_index, by_kind_index) = state.indexes.to_parts();

        Ok(LedgerExport {
            schema_version: SCHEMA_VERSION.to_string(),
            exported_at: self.clock.now(),
            records,
            by_origin_index,
            by_kind_index,
        })
    }

    /// Replace the ledger's contents with an export.
    ///
    /// The export is audited first; an inconsistent export is rejected and
    /// leaves the ledger untouched. Creations in flight when the import
    /// lands fail with [`CreationError::Superseded`].
    pub fn import(&self, export: LedgerExport) -> LedgerResult<AuditReport> {
        if export.schema_version != SCHEMA_VERSION {
            return Err(LedgerError::ImportRejected(format!(
                "unsupported schema version {}",
                export.schema_version
            )));
        }

        let mut records = HashMap::with_capacity(export.records.len());
        for record in export.records {
            if let Some(dup) = records.insert(record.id, record) {
                return Err(LedgerError::ImportRejected(format!(
                    "duplicate record id {}",
                    dup.id
                )));
            }
        }
        let indexes = SecondaryIndexes::from_parts(export.by_origin_index, export.by_kind_index);

        let report = LedgerAuditor::audit(&records, &indexes);
        if let Some(first) = report.violations.first() {
            warn!(violations = report.violations.len(), "import rejected");
            return Err(LedgerError::ImportRejected(format!(
                "{} violation(s), first at {}: {}",
                report.violations.len(),
                first.record_id,
                first.description
            )));
        }

        if let Some(latest) = records.values().map(|r| r.created_at).max() {
            self.clock.observe(latest);
        }

        let mut state = self.write_state()?;
        state.records = records;
        state.indexes = indexes;
        state.generation += 1;
        info!(records = report.record_count, origins = report.origin_count, "ledger imported");
        Ok(report)
    }

    /// Drop every record. Durable objects are left in place.
    pub fn clear(&self) -> LedgerResult<()> {
        let mut state = self.write_state()?;
        state.records.clear();
        state.indexes.clear();
        state.generation += 1;
        info!("ledger cleared");
        Ok(())
    }

    fn upload_tags(
        &self,
        id: &RecordId,
        origin: &OriginId,
        kind: RecordKind,
        created_at: u64,
    ) -> Vec<ObjectTag> {
        vec![
            ObjectTag::new("App-Name", &self.config.app_name),
            ObjectTag::new("Schema-Version", SCHEMA_VERSION),
            ObjectTag::new("Content-Type", "application/json"),
            ObjectTag::new("Record-ID", id.to_string()),
            ObjectTag::new("Origin-ID", origin.as_str()),
            ObjectTag::new("Record-Kind", kind.as_str()),
            ObjectTag::new("Created-At", created_at.to_string()),
        ]
    }

    fn origin_lock(&self, origin: &OriginId) -> LedgerResult<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .origin_locks
            .lock()
            .map_err(|_| LedgerError::LockPoisoned)?;
        Ok(Arc::clone(locks.entry(origin.clone()).or_default()))
    }

    fn read_state(&self) -> LedgerResult<RwLockReadGuard<'_, LedgerState>> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write_state(&self) -> LedgerResult<RwLockWriteGuard<'_, LedgerState>> {
        self.inner.write().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl std::fmt::Debug for ProvenanceLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvenanceLedger")
            .field("config", &self.config)
            .field("scheme", &self.signer.scheme())
            .field("records", &self.len().unwrap_or_default())
            .finish()
    }
}

fn validate_request(request: &CreateRecordRequest) -> Result<(), CreationError> {
    if request.metadata.computation_type.trim().is_empty() {
        return Err(CreationError::InvalidRequest(
            "metadata.computationType must not be blank".into(),
        ));
    }
    if request.kind != request.payload.kind() {
        return Err(CreationError::InvalidRequest(format!(
            "kind {} does not match {} payload",
            request.kind,
            request.payload.kind()
        )));
    }
    if let RecordPayload::Reasoning(reasoning) = &request.payload {
        if let Some(confidence) = reasoning.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(CreationError::InvalidRequest(format!(
                    "confidence {confidence} outside [0, 1]"
                )));
            }
        }
    }
    Ok(())
}
