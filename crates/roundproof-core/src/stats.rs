// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

//! Training statistics emitted by the external trainer.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::digest::{truncate_u64, Hash32};
use crate::error::{RoundError, RoundResult};

/// Number of sampled parameter values carried into the circuits.
pub const PARAM_ARITY: usize = 4;

pub const DEFAULT_DATASET_HASH: u64 = 0;
pub const DEFAULT_PARAMS: [f64; PARAM_ARITY] = [0.0; PARAM_ARITY];
pub const DEFAULT_BATCH_SIZE: u32 = 32;
pub const DEFAULT_NUM_EPOCHS: u32 = 1;
pub const DEFAULT_FINAL_LOSS: f64 = 0.5;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_NUM_SAMPLES: u64 = 1_000;
pub const DEFAULT_DATASET_SIZE_BYTES: u64 = 100_000;
pub const DEFAULT_FEATURE_DIM: u32 = 768;
pub const DEFAULT_NUM_CLASSES: u32 = 2;

/// Snapshot of one training run. Every field is optional on the wire and falls back to the
/// `DEFAULT_*` sentinel above, so partial stats files still drive the proof layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingStats {
    #[serde(deserialize_with = "lenient_u64")]
    pub dataset_hash: u64,
    #[serde(alias = "model_params_before")]
    pub params_before: Vec<f64>,
    #[serde(alias = "model_params_after")]
    pub params_after: Vec<f64>,
    pub batch_size: u32,
    pub num_epochs: u32,
    #[serde(alias = "loss")]
    pub final_loss: f64,
    #[serde(deserialize_with = "lenient_u64")]
    pub seed: u64,
    #[serde(alias = "dataset_size")]
    pub num_samples: u64,
    pub dataset_size_bytes: u64,
    pub feature_dim: u32,
    pub num_classes: u32,
}

impl Default for TrainingStats {
    fn default() -> Self {
        Self {
            dataset_hash: DEFAULT_DATASET_HASH,
            params_before: DEFAULT_PARAMS.to_vec(),
            params_after: DEFAULT_PARAMS.to_vec(),
            batch_size: DEFAULT_BATCH_SIZE,
            num_epochs: DEFAULT_NUM_EPOCHS,
            final_loss: DEFAULT_FINAL_LOSS,
            seed: DEFAULT_SEED,
            num_samples: DEFAULT_NUM_SAMPLES,
            dataset_size_bytes: DEFAULT_DATASET_SIZE_BYTES,
            feature_dim: DEFAULT_FEATURE_DIM,
            num_classes: DEFAULT_NUM_CLASSES,
        }
    }
}

impl TrainingStats {
    pub fn from_json(bytes: &[u8]) -> RoundResult<Self> {
        let stats: TrainingStats = serde_json::from_slice(bytes)
            .map_err(|err| RoundError::InvalidInput(format!("training stats: {err}")))?;
        Ok(stats.normalized())
    }

    /// Reads the trainer's stats file; an absent file yields the all-default snapshot.
    pub fn load_or_default(path: &Path) -> RoundResult<Self> {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_json(&bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    target: "roundproof.proof",
                    path = %path.display(),
                    "training stats file absent; using default stats"
                );
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Pads with zeros or truncates both parameter samples to [`PARAM_ARITY`].
    pub fn normalized(mut self) -> Self {
        self.params_before.resize(PARAM_ARITY, 0.0);
        self.params_after.resize(PARAM_ARITY, 0.0);
        self
    }

    /// First 8 bytes of SHA-256 over the JSON array of `after[i] - before[i]`.
    pub fn model_diff_hash(&self) -> u64 {
        let diff: Vec<f64> = self
            .params_after
            .iter()
            .zip(&self.params_before)
            .map(|(after, before)| after - before)
            .collect();
        let encoded = serde_json::to_vec(&diff).unwrap_or_default();
        truncate_u64(&crate::digest::sha256(&encoded))
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Unsigned(u64),
        Signed(i64),
    }
    Ok(match Raw::deserialize(d)? {
        Raw::Unsigned(v) => v,
        Raw::Signed(v) => v as u64,
    })
}

/// Order-independent content hash of a dataset: rows are sorted by their bytes and fed to
/// SHA-256 with a length prefix each, then truncated to 64 bits.
pub fn dataset_content_hash<I, R>(rows: I) -> u64
where
    I: IntoIterator<Item = R>,
    R: AsRef<[u8]>,
{
    let mut rows: Vec<Vec<u8>> = rows.into_iter().map(|r| r.as_ref().to_vec()).collect();
    rows.sort_unstable();
    let mut h = Sha256::new();
    h.update((rows.len() as u64).to_le_bytes());
    for row in &rows {
        h.update((row.len() as u64).to_le_bytes());
        h.update(row);
    }
    let digest: Hash32 = h.finalize().into();
    truncate_u64(&digest)
}

/// [`dataset_content_hash`] over the data rows of a CSV file. The header line is excluded and
/// blank lines are ignored.
pub fn dataset_hash_csv(path: &Path) -> RoundResult<u64> {
    let text = std::fs::read_to_string(path)?;
    let rows = text
        .lines()
        .skip(1)
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty());
    Ok(dataset_content_hash(rows))
}
