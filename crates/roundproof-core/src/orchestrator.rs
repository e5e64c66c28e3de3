// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

//! Proof generation for one round.
//!
//! Real path: `Idle -> CompilingCircuits -> GeneratingTraining -> GeneratingDataIntegrity ->
//! GeneratingModelDiff -> Done`. The model-diff circuit consumes the training proof hash, so it
//! cannot start until that hash exists. Any failure on the real path discards what was
//! produced so far and the whole round is re-proved on the simulated path, which hashes the
//! model update directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::capability::Capabilities;
use crate::digest::{sha256, sha256_file, truncate_u64, unix_ms_now, Hash32};
use crate::error::{RoundError, RoundResult};
use crate::proof::{ProofArtifact, ProofKind, ProofPath, ProofPhase, ProofSet};
use crate::stats::TrainingStats;
use crate::toolchain::{
    clear_circuit_artifacts, read_circuit_artifact, CircuitToolchain, PROOF_FILE,
    PROVER_INPUT_FILE, VK_FILE,
};

pub const CIRCUIT_SOURCE: &str = "src/main.nr";
pub const DATA_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Circuit {
    Training,
    DataIntegrity,
    ModelDiff,
}

impl Circuit {
    pub const ALL: [Circuit; 3] = [Circuit::Training, Circuit::DataIntegrity, Circuit::ModelDiff];

    pub fn dir_name(self) -> &'static str {
        match self {
            Circuit::Training => "training_proof",
            Circuit::DataIntegrity => "data_integrity",
            Circuit::ModelDiff => "model_diff",
        }
    }

    pub fn kind(self) -> ProofKind {
        match self {
            Circuit::Training => ProofKind::Training,
            Circuit::DataIntegrity => ProofKind::DataIntegrity,
            Circuit::ModelDiff => ProofKind::ModelDiff,
        }
    }

    fn phase(self) -> ProofPhase {
        match self {
            Circuit::Training => ProofPhase::GeneratingTraining,
            Circuit::DataIntegrity => ProofPhase::GeneratingDataIntegrity,
            Circuit::ModelDiff => ProofPhase::GeneratingModelDiff,
        }
    }
}

// TOML integers are signed 64-bit, so wide values travel as decimal strings.
fn decimal<S: Serializer>(value: &u64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&value.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingInputs {
    #[serde(serialize_with = "decimal")]
    pub dataset_hash: u64,
    pub model_params_before: Vec<f64>,
    pub model_params_after: Vec<f64>,
    pub batch_size: u32,
    pub num_epochs: u32,
    pub final_loss: f64,
    #[serde(serialize_with = "decimal")]
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataIntegrityInputs {
    #[serde(serialize_with = "decimal")]
    pub dataset_hash: u64,
    #[serde(serialize_with = "decimal")]
    pub num_samples: u64,
    #[serde(serialize_with = "decimal")]
    pub dataset_size: u64,
    pub feature_dim: u32,
    pub num_classes: u32,
    pub format_version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDiffInputs {
    /// Training proof hash truncated to 64 bits; zero until the training proof exists.
    #[serde(serialize_with = "decimal")]
    pub training_proof_hash: u64,
    pub model_params_before: Vec<f64>,
    pub model_params_after: Vec<f64>,
    #[serde(serialize_with = "decimal")]
    pub model_diff_hash: u64,
    pub batch_size: u32,
    pub num_epochs: u32,
    pub final_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitInputs {
    pub training_proof: TrainingInputs,
    pub data_integrity: DataIntegrityInputs,
    pub model_diff: ModelDiffInputs,
}

impl CircuitInputs {
    pub fn derive(stats: &TrainingStats) -> Self {
        let stats = stats.clone().normalized();
        let model_diff_hash = stats.model_diff_hash();
        Self {
            training_proof: TrainingInputs {
                dataset_hash: stats.dataset_hash,
                model_params_before: stats.params_before.clone(),
                model_params_after: stats.params_after.clone(),
                batch_size: stats.batch_size,
                num_epochs: stats.num_epochs,
                final_loss: stats.final_loss,
                seed: stats.seed,
            },
            data_integrity: DataIntegrityInputs {
                dataset_hash: stats.dataset_hash,
                num_samples: stats.num_samples,
                dataset_size: stats.dataset_size_bytes,
                feature_dim: stats.feature_dim,
                num_classes: stats.num_classes,
                format_version: DATA_FORMAT_VERSION,
            },
            model_diff: ModelDiffInputs {
                training_proof_hash: 0,
                model_params_before: stats.params_before,
                model_params_after: stats.params_after,
                model_diff_hash,
                batch_size: stats.batch_size,
                num_epochs: stats.num_epochs,
                final_loss: stats.final_loss,
            },
        }
    }
}

struct EncodedInputs {
    json: Vec<u8>,
    toml: String,
}

fn encode_inputs<T: Serialize>(circuit: Circuit, inputs: &T) -> RoundResult<EncodedInputs> {
    let json = serde_json::to_vec_pretty(inputs)?;
    let toml = toml::to_string(inputs).map_err(|err| {
        RoundError::InvalidInput(format!("{} inputs: {err}", circuit.dir_name()))
    })?;
    Ok(EncodedInputs { json, toml })
}

pub struct ProofOrchestrator {
    toolchain: Arc<dyn CircuitToolchain>,
    circuits_root: PathBuf,
    proofs_dir: PathBuf,
}

impl ProofOrchestrator {
    pub fn new(
        toolchain: Arc<dyn CircuitToolchain>,
        circuits_root: impl Into<PathBuf>,
        proofs_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            toolchain,
            circuits_root: circuits_root.into(),
            proofs_dir: proofs_dir.into(),
        }
    }

    pub fn circuit_dir(&self, circuit: Circuit) -> PathBuf {
        self.circuits_root.join(circuit.dir_name())
    }

    pub fn proofs_dir(&self) -> &Path {
        &self.proofs_dir
    }

    /// Produces either three real, individually verified proofs or a single simulated one.
    /// Only a failure of the simulated path itself (unreadable model update, unwritable
    /// proofs directory) is returned as an error.
    pub async fn generate_all(
        &self,
        stats: &TrainingStats,
        capabilities: &Capabilities,
        model_update: &Path,
    ) -> RoundResult<ProofSet> {
        let phases = vec![ProofPhase::Idle];
        tokio::fs::create_dir_all(&self.proofs_dir).await?;

        if !capabilities.proofs_enabled {
            let reason = if capabilities.toolchain_available {
                format!("environment {:?} cannot run the toolchain", capabilities.environment)
            } else {
                format!("toolchain `{}` unavailable", self.toolchain.program())
            };
            tracing::info!(target: "roundproof.proof", %reason, "using simulated proof path");
            return self.simulate(stats, model_update, reason, phases).await;
        }

        let mut inputs = CircuitInputs::derive(stats);
        let mut phases = phases;
        match self.generate_real(&mut inputs, &mut phases).await {
            Ok(artifacts) => {
                phases.push(ProofPhase::Done);
                Ok(ProofSet {
                    path: ProofPath::Real,
                    artifacts,
                    phases,
                    inputs: serde_json::to_value(&inputs).ok(),
                })
            }
            Err(err) => {
                tracing::warn!(
                    target: "roundproof.proof",
                    error = %err,
                    reached = ?phases.last(),
                    "real proof generation failed; discarding partial proofs and falling back to simulation"
                );
                self.simulate(stats, model_update, err.to_string(), phases)
                    .await
            }
        }
    }

    async fn generate_real(
        &self,
        inputs: &mut CircuitInputs,
        phases: &mut Vec<ProofPhase>,
    ) -> RoundResult<Vec<ProofArtifact>> {
        phases.push(ProofPhase::CompilingCircuits);
        self.check_layout()?;
        for circuit in Circuit::ALL {
            tracing::info!(target: "roundproof.proof", circuit = circuit.dir_name(), "compiling circuit");
            self.toolchain.compile(&self.circuit_dir(circuit)).await?;
        }

        phases.push(Circuit::Training.phase());
        let encoded = encode_inputs(Circuit::Training, &inputs.training_proof)?;
        let training = self.prove_circuit(Circuit::Training, encoded, None, 0).await?;

        phases.push(Circuit::DataIntegrity.phase());
        let encoded = encode_inputs(Circuit::DataIntegrity, &inputs.data_integrity)?;
        let data_integrity = self
            .prove_circuit(Circuit::DataIntegrity, encoded, None, training.created_at_ms)
            .await?;

        phases.push(Circuit::ModelDiff.phase());
        inputs.model_diff.training_proof_hash = truncate_u64(&training.proof_hash);
        let encoded = encode_inputs(Circuit::ModelDiff, &inputs.model_diff)?;
        let model_diff = self
            .prove_circuit(
                Circuit::ModelDiff,
                encoded,
                Some(training.proof_hash),
                data_integrity.created_at_ms,
            )
            .await?;

        Ok(vec![training, data_integrity, model_diff])
    }

    fn check_layout(&self) -> RoundResult<()> {
        for circuit in Circuit::ALL {
            let source = self.circuit_dir(circuit).join(CIRCUIT_SOURCE);
            if !source.is_file() {
                return Err(RoundError::CapabilityUnavailable(format!(
                    "circuit source not found: {}",
                    source.display()
                )));
            }
        }
        Ok(())
    }

    async fn prove_circuit(
        &self,
        circuit: Circuit,
        inputs: EncodedInputs,
        depends_on: Option<Hash32>,
        not_before_ms: u64,
    ) -> RoundResult<ProofArtifact> {
        let dir = self.circuit_dir(circuit);
        let name = circuit.dir_name();

        let inputs_record = self.proofs_dir.join(format!("{name}_inputs.json"));
        tokio::fs::write(&inputs_record, &inputs.json).await?;
        tokio::fs::write(dir.join(PROVER_INPUT_FILE), inputs.toml.as_bytes()).await?;

        clear_circuit_artifacts(&dir).await?;
        self.toolchain.execute(&dir).await?;

        let program = self.toolchain.program();
        let proof = read_circuit_artifact(program, &dir, PROOF_FILE).await?;
        let vk = read_circuit_artifact(program, &dir, VK_FILE).await?;
        let proof_path = self.proofs_dir.join(format!("{name}.proof"));
        let vk_path = self.proofs_dir.join(format!("{name}.vk"));
        tokio::fs::write(&proof_path, &proof).await?;
        tokio::fs::write(&vk_path, &vk).await?;

        let proof_hash = sha256(&proof);
        let verified = self.toolchain.verify(&dir).await?;
        let artifact = ProofArtifact {
            kind: circuit.kind(),
            input_hash: sha256(&inputs.json),
            proof_hash,
            depends_on,
            verified,
            created_at_ms: unix_ms_now().max(not_before_ms),
            proof_path: Some(proof_path),
            vk_path: Some(vk_path),
        };
        tracing::info!(
            target: "roundproof.proof",
            circuit = name,
            proof_hash = %artifact.proof_hash_hex(),
            verified,
            "proof generated"
        );
        Ok(artifact)
    }

    async fn simulate(
        &self,
        stats: &TrainingStats,
        model_update: &Path,
        reason: String,
        mut phases: Vec<ProofPhase>,
    ) -> RoundResult<ProofSet> {
        phases.push(ProofPhase::Simulated);
        let path = model_update.to_path_buf();
        let proof_hash = tokio::task::spawn_blocking(move || sha256_file(&path))
            .await
            .map_err(|err| RoundError::Io(std::io::Error::other(err.to_string())))??;
        let stats_json = serde_json::to_vec(stats)?;
        let artifact = ProofArtifact {
            kind: ProofKind::Simulated,
            input_hash: sha256(&stats_json),
            proof_hash,
            depends_on: None,
            verified: true,
            created_at_ms: unix_ms_now(),
            proof_path: None,
            vk_path: None,
        };
        tracing::warn!(
            target: "roundproof.proof",
            proof_hash = %artifact.proof_hash_hex(),
            %reason,
            "simulated proof generated"
        );
        Ok(ProofSet {
            path: ProofPath::Simulated { reason },
            artifacts: vec![artifact],
            phases,
            inputs: None,
        })
    }
}
