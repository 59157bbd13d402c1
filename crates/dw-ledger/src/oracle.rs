use crate::records::ProofPayload;

/// External judge of proof payloads.
///
/// The ledger stores proofs without checking them. Callers that want a
/// verdict ask an oracle and keep the answer in `metadata.customData`.
pub trait ProofOracle: Send + Sync {
    fn name(&self) -> &'static str;

    fn attest(&self, proof: &ProofPayload) -> bool;
}

/// Well-formedness check only; performs no cryptographic verification.
///
/// Accepts a proof when `proof_data` is non-empty hex, `circuit_hash` is a
/// 32-byte hex digest and at least one public input is present.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralProofOracle;

impl ProofOracle for StructuralProofOracle {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn attest(&self, proof: &ProofPayload) -> bool {
        let blob_ok = !proof.proof_data.is_empty() && hex::decode(&proof.proof_data).is_ok();
        let circuit_ok = hex::decode(&proof.circuit_hash).is_ok_and(|raw| raw.len() == 32);
        blob_ok && circuit_ok && !proof.public_inputs.is_empty()
    }
}
