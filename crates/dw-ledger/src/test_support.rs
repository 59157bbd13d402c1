//! Record fixtures shared by unit tests.

use dw_crypto::{KeyedSigner, RecordSigner};
use dw_types::{DurableRef, OriginId, RecordId, RecordKind, SCHEMA_VERSION};

use crate::records::{
    ComputePayload, ProofPayload, ProvenanceRecord, ReasoningPayload, RecordMetadata,
    RecordPayload,
};

pub fn origin(name: &str) -> OriginId {
    OriginId::new(name).unwrap()
}

pub fn payload(kind: RecordKind) -> RecordPayload {
    match kind {
        RecordKind::Compute => RecordPayload::Compute(ComputePayload {
            run_id: Some("run-1".into()),
            inputs: vec!["in".into()],
            outputs: vec!["out".into()],
            compute_time_ms: Some(12),
        }),
        RecordKind::Proof => RecordPayload::Proof(ProofPayload {
            proof_id: "proof-1".into(),
            circuit_hash: "ab".repeat(32),
            public_inputs: vec!["x".into()],
            proof_data: "deadbeef".into(),
            verification_time_ms: None,
        }),
        RecordKind::Reasoning => RecordPayload::Reasoning(ReasoningPayload {
            conclusion: "done".into(),
            steps: vec!["think".into()],
            confidence: Some(0.75),
        }),
    }
}

pub fn metadata(tags: &[&str]) -> RecordMetadata {
    RecordMetadata::new("inference")
        .with_inputs(["prompt"])
        .with_outputs(["answer"])
        .with_tags(tags.iter().copied())
}

/// A correctly hashed and signed record built without a ledger.
pub fn signed_record(
    signer: &dyn RecordSigner,
    origin_id: &str,
    kind: RecordKind,
    created_at: u64,
    prior: Option<RecordId>,
) -> ProvenanceRecord {
    let mut record = ProvenanceRecord {
        id: RecordId::new(),
        kind,
        origin_id: origin(origin_id),
        created_at,
        content_hash: dw_types::ContentHash::null(),
        durable_ref: DurableRef::new("dw-test").unwrap(),
        metadata: metadata(&[kind.as_str()]),
        payload: payload(kind),
        prior_links: prior.into_iter().collect(),
        signature: dw_types::RecordSignature::from_bytes(Vec::new()),
        schema_version: SCHEMA_VERSION.to_string(),
    };
    record.content_hash = record.recompute_content_hash().unwrap();
    record.signature = signer.sign_material(&record.signature_material()).unwrap();
    record
}

pub fn record(origin_id: &str, kind: RecordKind, created_at: u64) -> ProvenanceRecord {
    signed_record(&KeyedSigner::from_secret("test"), origin_id, kind, created_at, None)
}
