// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capability::Capabilities;
use crate::digest::{hex32, hex32_opt, unix_ms_now, Hash32};
use crate::error::RoundResult;
use crate::fsutil::write_file_atomic_durable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    Training,
    DataIntegrity,
    ModelDiff,
    Simulated,
}

impl ProofKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProofKind::Training => "training",
            ProofKind::DataIntegrity => "data_integrity",
            ProofKind::ModelDiff => "model_diff",
            ProofKind::Simulated => "simulated",
        }
    }
}

/// One attestation. Created by the orchestrator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofArtifact {
    pub kind: ProofKind,
    #[serde(with = "hex32")]
    pub input_hash: Hash32,
    #[serde(with = "hex32")]
    pub proof_hash: Hash32,
    /// Set only on `ModelDiff`: the `proof_hash` of the training proof it builds on.
    #[serde(with = "hex32_opt", default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Hash32>,
    pub verified: bool,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vk_path: Option<PathBuf>,
}

impl ProofArtifact {
    pub fn proof_hash_hex(&self) -> String {
        hex::encode(self.proof_hash)
    }
}

/// Which path produced a round's proofs. A round never mixes the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum ProofPath {
    Real,
    Simulated { reason: String },
}

/// Orchestrator state machine positions, recorded in the order they were entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofPhase {
    Idle,
    CompilingCircuits,
    GeneratingTraining,
    GeneratingDataIntegrity,
    GeneratingModelDiff,
    Done,
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProofSet {
    pub path: ProofPath,
    pub artifacts: Vec<ProofArtifact>,
    pub phases: Vec<ProofPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<serde_json::Value>,
}

impl ProofSet {
    pub fn is_simulated(&self) -> bool {
        matches!(self.path, ProofPath::Simulated { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match &self.path {
            ProofPath::Real => None,
            ProofPath::Simulated { reason } => Some(reason),
        }
    }

    pub fn get(&self, kind: ProofKind) -> Option<&ProofArtifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    pub fn all_verified(&self) -> bool {
        !self.artifacts.is_empty() && self.artifacts.iter().all(|a| a.verified)
    }

    pub fn summary(&self) -> ProofSummary {
        ProofSummary {
            path: self.path.clone(),
            artifacts: self
                .artifacts
                .iter()
                .map(|a| (a.kind, a.proof_hash_hex(), a.verified))
                .collect(),
            all_verified: self.all_verified(),
        }
    }

    /// Writes the combined bundle that gets published alongside the model update.
    pub fn write_bundle(&self, path: &Path, capabilities: &Capabilities) -> RoundResult<()> {
        let bundle = ProofBundle {
            proof_type: if self.is_simulated() {
                "simulated"
            } else {
                "zk_proofs"
            },
            timestamp_ms: unix_ms_now(),
            capabilities,
            proofs: self,
        };
        let payload = serde_json::to_vec_pretty(&bundle)?;
        write_file_atomic_durable(path, &payload)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ProofBundle<'a> {
    proof_type: &'static str,
    timestamp_ms: u64,
    capabilities: &'a Capabilities,
    proofs: &'a ProofSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofSummary {
    pub path: ProofPath,
    pub artifacts: Vec<(ProofKind, String, bool)>,
    pub all_verified: bool,
}
