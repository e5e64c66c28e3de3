// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-round metadata document consumed by the records API.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capability::Capabilities;
use crate::error::RoundResult;
use crate::fsutil::write_file_atomic_durable;
use crate::proof::ProofSummary;

/// Who ran the round and with what settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub agent_name: String,
    pub wallet_address: String,
    pub model: String,
    pub method: String,
    pub batch_size: u32,
    pub reward_threshold: f64,
    pub data_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundMetadata {
    pub round_id: u64,
    #[serde(flatten)]
    pub agent: AgentIdentity,
    /// Logical artifact name to CID.
    pub uploads: BTreeMap<String, String>,
    pub proof_summary: ProofSummary,
    pub capabilities: Capabilities,
    pub timestamp_ms: u64,
}

impl RoundMetadata {
    pub fn file_name(round_id: u64) -> String {
        format!("round-{round_id}.json")
    }

    pub fn write(&self, dir: &Path) -> RoundResult<PathBuf> {
        let path = dir.join(Self::file_name(self.round_id));
        let bytes = serde_json::to_vec_pretty(self)?;
        write_file_atomic_durable(&path, &bytes)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> RoundResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Environment;
    use crate::proof::{ProofKind, ProofPath};

    #[test]
    fn document_is_flat_and_reloadable() {
        let dir = tempfile::TempDir::new().unwrap();
        let meta = RoundMetadata {
            round_id: 4,
            agent: AgentIdentity {
                agent_name: "agent-7".into(),
                wallet_address: "0xabc".into(),
                model: "distilbert-base-uncased".into(),
                method: "lora".into(),
                batch_size: 16,
                reward_threshold: 0.5,
                data_path: PathBuf::from("data/train.csv"),
            },
            uploads: BTreeMap::from([("model_update".to_string(), "bafy1".to_string())]),
            proof_summary: ProofSummary {
                path: ProofPath::Real,
                artifacts: vec![(ProofKind::Training, "ab".into(), true)],
                all_verified: true,
            },
            capabilities: Capabilities::new(Environment::Linux, true),
            timestamp_ms: 99,
        };
        let path = meta.write(dir.path()).unwrap();
        assert!(path.ends_with("round-4.json"));
        let v: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(v["agent_name"], "agent-7");
        assert_eq!(v["uploads"]["model_update"], "bafy1");
        assert_eq!(RoundMetadata::load(&path).unwrap(), meta);
    }
}
