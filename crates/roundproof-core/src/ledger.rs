// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

//! Append-only round ledger.
//!
//! The ledger is one JSON document, `{"version":1,"rounds":[entry, ...]}`, replaced atomically
//! on every append. Entries are hash-chained: `entry_hash = SHA-256(prev_hash || record_json)`
//! with an all-zero `prev_hash` for the first entry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::capability::Capabilities;
use crate::digest::{hex32, Hash32};
use crate::error::{RoundError, RoundResult, Stage};
use crate::fsutil::write_file_atomic_durable;
use crate::proof::{ProofArtifact, ProofPath};
use crate::stats::TrainingStats;
use crate::upload::UploadRecord;

pub const LEDGER_VERSION: u32 = 1;
const GENESIS_HASH: Hash32 = [0u8; 32];

/// Outcome of one round attempt. Never edited once appended; a correction is a new record
/// with the same `round_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_id: u64,
    pub started_at_ms: u64,
    pub ended_at_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_path: Option<ProofPath>,
    #[serde(default)]
    pub proof_artifacts: Vec<ProofArtifact>,
    #[serde(default)]
    pub uploads: BTreeMap<String, UploadRecord>,
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
    /// The stats snapshot the proofs were derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_stats: Option<TrainingStats>,
}

impl RoundRecord {
    pub fn failed(
        round_id: u64,
        started_at_ms: u64,
        ended_at_ms: u64,
        stage: Stage,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            round_id,
            started_at_ms,
            ended_at_ms,
            success: false,
            proof_path: None,
            proof_artifacts: Vec::new(),
            uploads: BTreeMap::new(),
            failure_reason: Some(reason.into()),
            failed_stage: Some(stage),
            capabilities: None,
            training_stats: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub seq: u64,
    #[serde(with = "hex32")]
    pub prev_hash: Hash32,
    #[serde(with = "hex32")]
    pub entry_hash: Hash32,
    pub record: RoundRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerDocument {
    version: u32,
    rounds: Vec<LedgerEntry>,
}

impl Default for LedgerDocument {
    fn default() -> Self {
        Self {
            version: LEDGER_VERSION,
            rounds: Vec::new(),
        }
    }
}

fn chain_hash(prev: &Hash32, record: &RoundRecord) -> RoundResult<Hash32> {
    let body = serde_json::to_vec(record)?;
    let mut h = Sha256::new();
    h.update(prev);
    h.update(&body);
    Ok(h.finalize().into())
}

/// Single-writer handle: appends from one process are serialized through the internal lock.
#[derive(Debug)]
pub struct RoundLedger {
    path: PathBuf,
    doc: Mutex<LedgerDocument>,
}

impl RoundLedger {
    /// Opens the ledger at `path`; a missing file is an empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> RoundResult<Self> {
        let path = path.into();
        let doc = match std::fs::read(&path) {
            Ok(bytes) => {
                let doc: LedgerDocument = serde_json::from_slice(&bytes).map_err(|err| {
                    RoundError::Ledger(format!("{} unreadable: {err}", path.display()))
                })?;
                if doc.version != LEDGER_VERSION {
                    return Err(RoundError::Ledger(format!(
                        "unsupported ledger version {}",
                        doc.version
                    )));
                }
                doc
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => LedgerDocument::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All-or-nothing: the in-memory view only advances after the new document is durable.
    pub fn append(&self, record: RoundRecord) -> RoundResult<LedgerEntry> {
        let mut doc = self.doc.lock();
        let prev_hash = doc
            .rounds
            .last()
            .map(|e| e.entry_hash)
            .unwrap_or(GENESIS_HASH);
        let entry = LedgerEntry {
            seq: doc.rounds.len() as u64,
            prev_hash,
            entry_hash: chain_hash(&prev_hash, &record)?,
            record,
        };

        let mut next = doc.clone();
        next.rounds.push(entry.clone());
        let bytes = serde_json::to_vec_pretty(&next)?;
        write_file_atomic_durable(&self.path, &bytes)
            .map_err(|err| RoundError::Ledger(format!("{}: {err}", self.path.display())))?;
        *doc = next;

        tracing::info!(
            target: "roundproof.ledger",
            round_id = entry.record.round_id,
            seq = entry.seq,
            success = entry.record.success,
            entry_hash = %hex::encode(entry.entry_hash),
            "round recorded"
        );
        Ok(entry)
    }

    /// [`append`](Self::append) on the blocking pool, for callers on the async runtime.
    pub async fn commit(self: &Arc<Self>, record: RoundRecord) -> RoundResult<LedgerEntry> {
        let ledger = Arc::clone(self);
        tokio::task::spawn_blocking(move || ledger.append(record))
            .await
            .map_err(|err| RoundError::Ledger(format!("append task failed: {err}")))?
    }

    /// Most recently appended record for `round_id`.
    pub fn latest(&self, round_id: u64) -> Option<RoundRecord> {
        self.doc
            .lock()
            .rounds
            .iter()
            .rev()
            .find(|e| e.record.round_id == round_id)
            .map(|e| e.record.clone())
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.doc.lock().rounds.clone()
    }

    pub fn len(&self) -> usize {
        self.doc.lock().rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn next_round_id(&self) -> u64 {
        self.doc
            .lock()
            .rounds
            .iter()
            .map(|e| e.record.round_id)
            .max()
            .map_or(1, |max| max.saturating_add(1))
    }

    pub fn verify_chain(&self) -> RoundResult<()> {
        let doc = self.doc.lock();
        let mut prev = GENESIS_HASH;
        for (idx, entry) in doc.rounds.iter().enumerate() {
            if entry.seq != idx as u64 {
                return Err(RoundError::Ledger(format!(
                    "entry {idx} carries sequence {}",
                    entry.seq
                )));
            }
            if entry.prev_hash != prev {
                return Err(RoundError::Ledger(format!("entry {idx} breaks the chain")));
            }
            if chain_hash(&prev, &entry.record)? != entry.entry_hash {
                return Err(RoundError::Ledger(format!(
                    "entry {idx} (round {}) does not match its hash",
                    entry.record.round_id
                )));
            }
            prev = entry.entry_hash;
        }
        Ok(())
    }
}
