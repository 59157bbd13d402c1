//! Provenance record types and their canonical encoding.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use dw_crypto::{ContentHasher, HasherError, SignatureMaterial};
use dw_types::{ContentHash, DurableRef, OriginId, RecordId, RecordKind, RecordSignature};

/// Descriptive metadata supplied by the producer of a record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub computation_type: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Free-form producer data. Opaque to the ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<serde_json::Value>,
}

impl RecordMetadata {
    pub fn new(computation_type: impl Into<String>) -> Self {
        Self {
            computation_type: computation_type.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            model_version: None,
            reasoning: None,
            tags: BTreeSet::new(),
            custom_data: None,
        }
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = Some(version.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_custom_data(mut self, data: serde_json::Value) -> Self {
        self.custom_data = Some(data);
        self
    }
}

/// Payload of a compute job.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_time_ms: Option<u64>,
}

/// Payload of a proof attached to a computation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofPayload {
    pub proof_id: String,
    pub circuit_hash: String,
    #[serde(default)]
    pub public_inputs: Vec<String>,
    pub proof_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_time_ms: Option<u64>,
}

/// Payload of a reasoning chain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningPayload {
    pub conclusion: String,
    #[serde(default)]
    pub steps: Vec<String>,
    /// In `[0, 1]` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Kind-specific record payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordPayload {
    Compute(ComputePayload),
    Proof(ProofPayload),
    Reasoning(ReasoningPayload),
}

impl RecordPayload {
    /// The record kind this payload belongs to.
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Compute(_) => RecordKind::Compute,
            Self::Proof(_) => RecordKind::Proof,
            Self::Reasoning(_) => RecordKind::Reasoning,
        }
    }

    pub fn as_proof(&self) -> Option<&ProofPayload> {
        match self {
            Self::Proof(p) => Some(p),
            _ => None,
        }
    }
}

/// Input to [`ProvenanceLedger::create`](crate::ProvenanceLedger::create).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub kind: RecordKind,
    pub origin_id: OriginId,
    pub metadata: RecordMetadata,
    pub payload: RecordPayload,
}

impl CreateRecordRequest {
    /// Build a request whose kind is taken from the payload.
    pub fn new(origin_id: OriginId, metadata: RecordMetadata, payload: RecordPayload) -> Self {
        Self {
            kind: payload.kind(),
            origin_id,
            metadata,
            payload,
        }
    }
}

/// An immutable, chain-linked provenance record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceRecord {
    pub id: RecordId,
    pub kind: RecordKind,
    pub origin_id: OriginId,
    pub created_at: u64,
    pub content_hash: ContentHash,
    pub durable_ref: DurableRef,
    pub metadata: RecordMetadata,
    pub payload: RecordPayload,
    /// The origin's chain head when this record was created. Only element 0
    /// is walked during verification.
    pub prior_links: Vec<RecordId>,
    pub signature: RecordSignature,
    pub schema_version: String,
}

impl ProvenanceRecord {
    /// The walked predecessor, if any.
    pub fn prior_link(&self) -> Option<&RecordId> {
        self.prior_links.first()
    }

    /// Canonical bytes the content hash and durable upload are computed over.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, HasherError> {
        CanonicalContent {
            kind: self.kind,
            origin_id: &self.origin_id,
            created_at: self.created_at,
            metadata: &self.metadata,
            payload: &self.payload,
        }
        .to_bytes()
    }

    /// Recompute the content hash from the record's fields.
    pub fn recompute_content_hash(&self) -> Result<ContentHash, HasherError> {
        Ok(ContentHasher::RECORD.hash(&self.canonical_bytes()?))
    }

    /// Fields covered by the record signature.
    pub fn signature_material(&self) -> SignatureMaterial<'_> {
        SignatureMaterial {
            record_id: &self.id,
            content_hash: &self.content_hash,
            created_at: self.created_at,
            origin_id: &self.origin_id,
        }
    }

    pub fn descriptor(&self) -> RecordDescriptor {
        RecordDescriptor {
            record_id: self.id,
            kind: self.kind,
            origin_id: self.origin_id.clone(),
            durable_ref: self.durable_ref.clone(),
            content_hash: self.content_hash,
            created_at: self.created_at,
            prior_link: self.prior_link().copied(),
        }
    }

    /// Returns `true` if the record carries any of `tags`.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.metadata.tags.contains(t))
    }
}

/// Summary returned by a successful creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDescriptor {
    pub record_id: RecordId,
    pub kind: RecordKind,
    pub origin_id: OriginId,
    pub durable_ref: DurableRef,
    pub content_hash: ContentHash,
    pub created_at: u64,
    pub prior_link: Option<RecordId>,
}

/// Hashed view of a record: `{kind, originId, createdAt, metadata, payload}`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CanonicalContent<'a> {
    pub kind: RecordKind,
    pub origin_id: &'a OriginId,
    pub created_at: u64,
    pub metadata: &'a RecordMetadata,
    pub payload: &'a RecordPayload,
}

impl CanonicalContent<'_> {
    pub fn to_bytes(&self) -> Result<Vec<u8>, HasherError> {
        serde_json::to_vec(self).map_err(|e| HasherError::Serialization(e.to_string()))
    }
}
