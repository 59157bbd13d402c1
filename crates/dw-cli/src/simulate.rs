//! Simulated AI miners.
//!
//! Each run writes three records: the compute job under the miner's origin,
//! a proof under [`PROOF_ORIGIN`] judged by a [`ProofOracle`], and the
//! reasoning chain back under the miner. No computation actually happens;
//! outputs, timings and proof blobs are drawn from the RNG.

use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::json;

use dw_ledger::{
    ComputePayload, CreateRecordRequest, CreationError, ProofOracle, ProofPayload,
    ProvenanceLedger, ReasoningPayload, RecordDescriptor, RecordMetadata, RecordPayload,
};
use dw_types::OriginId;

/// Origin that owns every proof record.
pub const PROOF_ORIGIN: &str = "zk-miner";

#[derive(Clone, Copy, Debug)]
pub struct MinerProfile {
    pub miner_id: &'static str,
    pub model_name: &'static str,
    pub model_version: &'static str,
    pub computation_types: &'static [&'static str],
}

pub const DEFAULT_MINERS: [MinerProfile; 3] = [
    MinerProfile {
        miner_id: "miner-001",
        model_name: "GPT-4",
        model_version: "4.0-turbo",
        computation_types: &["inference", "reasoning", "analysis"],
    },
    MinerProfile {
        miner_id: "miner-002",
        model_name: "Claude-3",
        model_version: "3.5-sonnet",
        computation_types: &["reasoning", "writing", "analysis"],
    },
    MinerProfile {
        miner_id: "miner-003",
        model_name: "Llama-2",
        model_version: "70b-chat",
        computation_types: &["inference", "reasoning", "code"],
    },
];

pub fn find_miner(miner_id: &str) -> Option<&'static MinerProfile> {
    DEFAULT_MINERS.iter().find(|m| m.miner_id == miner_id)
}

/// The three records written by one run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub miner_id: String,
    pub computation_type: String,
    pub proof_verified: bool,
    pub compute: RecordDescriptor,
    pub proof: RecordDescriptor,
    pub reasoning: RecordDescriptor,
}

pub struct MinerSimulation<'a, R> {
    ledger: &'a ProvenanceLedger,
    oracle: &'a dyn ProofOracle,
    rng: R,
}

impl<'a, R: Rng> MinerSimulation<'a, R> {
    pub fn new(ledger: &'a ProvenanceLedger, oracle: &'a dyn ProofOracle, rng: R) -> Self {
        Self { ledger, oracle, rng }
    }

    pub async fn run(&mut self, profile: &MinerProfile) -> Result<RunReport, CreationError> {
        let miner_origin = origin(profile.miner_id)?;
        let computation_type = profile
            .computation_types
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("inference");
        let run_id = uuid::Uuid::now_v7().to_string();

        let input_count = self.rng.gen_range(1..=3);
        let inputs: Vec<String> = (1..=input_count)
            .map(|n| format!("{computation_type}-input-{n}"))
            .collect();
        let outputs: Vec<String> = inputs
            .iter()
            .map(|input| self.output_for(computation_type, input))
            .collect();
        let reasoning = format!(
            "Analyzed {} input(s) using {computation_type}; produced {} output(s).",
            inputs.len(),
            outputs.len()
        );

        let compute = CreateRecordRequest::new(
            miner_origin.clone(),
            RecordMetadata::new(computation_type)
                .with_inputs(inputs.clone())
                .with_outputs(outputs.clone())
                .with_model_version(profile.model_version)
                .with_reasoning(reasoning.clone())
                .with_tags([computation_type, profile.model_name]),
            RecordPayload::Compute(ComputePayload {
                run_id: Some(run_id.clone()),
                inputs: inputs.clone(),
                outputs: outputs.clone(),
                compute_time_ms: Some(self.rng.gen_range(1_000..3_000)),
            }),
        );
        let compute = self.ledger.create(compute).await?;

        let proof = self.proof_for(&inputs);
        let proof_verified = self.oracle.attest(&proof);
        let proof_request = CreateRecordRequest::new(
            origin(PROOF_ORIGIN)?,
            RecordMetadata::new(computation_type)
                .with_inputs(inputs.clone())
                .with_outputs(outputs.clone())
                .with_reasoning(reasoning.clone())
                .with_tags(["zk-proof", "verification"])
                .with_custom_data(json!({
                    "circuitHash": proof.circuit_hash,
                    "verificationTime": proof.verification_time_ms,
                    "proofVerified": proof_verified,
                    "oracle": self.oracle.name(),
                })),
            RecordPayload::Proof(proof),
        );
        let proof = self.ledger.create(proof_request).await?;

        let step_count = self.rng.gen_range(3..=7);
        let steps: Vec<String> = (1..=step_count)
            .map(|n| format!("step {n}: evaluate {computation_type} evidence"))
            .collect();
        let confidence: f64 = self.rng.gen_range(0.8..1.0);
        let reasoning_request = CreateRecordRequest::new(
            miner_origin,
            RecordMetadata::new(computation_type)
                .with_inputs(outputs.clone())
                .with_model_version(profile.model_version)
                .with_reasoning(reasoning.clone())
                .with_tags([computation_type, profile.model_name])
                .with_custom_data(json!({
                    "confidence": confidence,
                    "steps": steps.len(),
                    "proofVerified": proof_verified,
                })),
            RecordPayload::Reasoning(ReasoningPayload {
                conclusion: reasoning,
                steps,
                confidence: Some(confidence),
            }),
        );
        let reasoning = self.ledger.create(reasoning_request).await?;

        tracing::debug!(
            %run_id,
            miner = profile.miner_id,
            computation_type,
            proof_verified,
            "simulated run complete"
        );

        Ok(RunReport {
            run_id,
            miner_id: profile.miner_id.to_string(),
            computation_type: computation_type.to_string(),
            proof_verified,
            compute,
            proof,
            reasoning,
        })
    }

    fn token(&mut self, len: usize) -> String {
        (&mut self.rng)
            .sample_iter(Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    fn output_for(&mut self, computation_type: &str, input: &str) -> String {
        match computation_type {
            "inference" => format!(
                "prediction={} confidence={:.2}",
                self.token(6),
                self.rng.gen_range(0.7..1.0)
            ),
            "reasoning" => format!("conclusion for {input}"),
            "analysis" => {
                let sentiment = ["positive", "neutral", "negative"]
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or("neutral");
                format!("sentiment={sentiment} entities={}", self.rng.gen_range(1..=10))
            }
            "writing" => format!("{} words based on {input}", self.rng.gen_range(100..300)),
            "code" => {
                let language = ["rust", "python", "javascript"]
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or("rust");
                format!("{language} solution for {input}")
            }
            _ => format!("result for {input}"),
        }
    }

    fn proof_for(&mut self, inputs: &[String]) -> ProofPayload {
        let mut blob = [0u8; 64];
        self.rng.fill(&mut blob[..]);
        let mut circuit = [0u8; 32];
        self.rng.fill(&mut circuit[..]);
        ProofPayload {
            proof_id: uuid::Uuid::now_v7().to_string(),
            circuit_hash: hex::encode(circuit),
            public_inputs: inputs.to_vec(),
            proof_data: hex::encode(blob),
            verification_time_ms: Some(self.rng.gen_range(500..1_000)),
        }
    }
}

fn origin(id: &str) -> Result<OriginId, CreationError> {
    OriginId::new(id).map_err(|e| CreationError::InvalidRequest(e.to_string()))
}
