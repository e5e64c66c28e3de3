// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

//! One training round end to end: Train -> Prove -> Upload -> Record.
//!
//! Capabilities are probed once when the pipeline starts. Each stage checks the cancel flag
//! before it begins. Whatever happens, cleanup runs exactly once per round; a failing round
//! is recorded with `success = false` and its error is returned wrapped in round context.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use roundproof_core::capability::{Capabilities, CapabilityProbe};
use roundproof_core::digest::unix_ms_now;
use roundproof_core::ledger::{RoundLedger, RoundRecord};
use roundproof_core::metadata::RoundMetadata;
use roundproof_core::orchestrator::ProofOrchestrator;
use roundproof_core::pinning::{PinataClient, PinningService};
use roundproof_core::proof::{ProofKind, ProofSet};
use roundproof_core::stats::TrainingStats;
use roundproof_core::toolchain::{CircuitToolchain, ProcessToolchain};
use roundproof_core::upload::{ContentAddressedUploader, UploadRecord};
use roundproof_core::{RoundError, RoundResult, Stage};

use crate::cancel::CancelFlag;
use crate::config::AgentConfig;
use crate::retry::retry_process;
use crate::trainer::{ProcessTrainer, Trainer};

pub const PROOF_BUNDLE_FILE: &str = "all_proofs.json";
pub const UPLOAD_MODEL_UPDATE: &str = "model_update";
pub const UPLOAD_PROOF_BUNDLE: &str = "proof_bundle";

/// External collaborators. Production wiring comes from [`PipelineDeps::from_config`].
pub struct PipelineDeps {
    pub trainer: Arc<dyn Trainer>,
    pub toolchain: Arc<dyn CircuitToolchain>,
    pub pinning: Arc<dyn PinningService>,
    pub probe: CapabilityProbe,
}

impl PipelineDeps {
    pub fn from_config(config: &AgentConfig) -> Self {
        let tc = &config.toolchain;
        let toolchain =
            ProcessToolchain::new(&tc.program, Duration::from_secs(tc.command_timeout_secs))
                .with_leading_args(tc.args.iter().cloned());
        let probe = CapabilityProbe::new(&tc.program)
            .with_args(tc.args.iter().cloned().chain(["--version".to_string()]))
            .with_timeout(Duration::from_secs(tc.probe_timeout_secs));
        Self {
            trainer: Arc::new(ProcessTrainer::new(
                config.pipeline.trainer_command.clone(),
                config.train_timeout(),
            )),
            toolchain: Arc::new(toolchain),
            pinning: Arc::new(PinataClient::new(
                &config.upload.api_url,
                &config.upload.gateway_url,
                config.request_timeout(),
            )),
            probe,
        }
    }
}

/// Upload artifacts in the order they become available.
fn upload_plan(
    model_update: PathBuf,
    bundle: PathBuf,
    proofs: &ProofSet,
) -> Vec<(String, PathBuf)> {
    let mut plan = vec![
        (UPLOAD_MODEL_UPDATE.to_string(), model_update),
        (UPLOAD_PROOF_BUNDLE.to_string(), bundle),
    ];
    for artifact in &proofs.artifacts {
        if artifact.kind == ProofKind::Simulated {
            continue;
        }
        if let Some(path) = &artifact.proof_path {
            plan.push((format!("proof_{}", artifact.kind.as_str()), path.clone()));
        }
    }
    plan
}

pub struct RoundPipeline {
    config: AgentConfig,
    trainer: Arc<dyn Trainer>,
    orchestrator: ProofOrchestrator,
    uploader: Arc<ContentAddressedUploader>,
    ledger: Arc<RoundLedger>,
    capabilities: Capabilities,
    cancel: CancelFlag,
}

impl RoundPipeline {
    pub async fn start(
        config: AgentConfig,
        deps: PipelineDeps,
        cancel: CancelFlag,
    ) -> RoundResult<Self> {
        let capabilities = deps.probe.detect().await;
        let ledger = Arc::new(RoundLedger::open(
            config.resolve(&config.pipeline.ledger_path),
        )?);
        let orchestrator = ProofOrchestrator::new(
            deps.toolchain,
            config.resolve(&config.toolchain.circuits_dir),
            config.resolve(&config.pipeline.proofs_dir),
        );
        let uploader = Arc::new(ContentAddressedUploader::new(
            deps.pinning,
            config.upload_policy(),
        ));
        tracing::info!(
            target: "roundproof.pipeline",
            agent = %config.agent.agent_name,
            proofs_enabled = capabilities.proofs_enabled,
            recorded_rounds = ledger.len(),
            "pipeline ready"
        );
        Ok(Self {
            config,
            trainer: deps.trainer,
            orchestrator,
            uploader,
            ledger,
            capabilities,
            cancel,
        })
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn ledger(&self) -> &RoundLedger {
        &self.ledger
    }

    pub fn next_round_id(&self) -> u64 {
        self.ledger.next_round_id()
    }

    pub async fn run_round(&self, round_id: u64) -> RoundResult<RoundRecord> {
        let started_at_ms = unix_ms_now();
        tracing::info!(target: "roundproof.pipeline", round_id, "round started");

        let outcome = self.execute(round_id, started_at_ms).await;
        self.cleanup();

        match outcome {
            Ok(record) => {
                tracing::info!(
                    target: "roundproof.pipeline",
                    round_id,
                    uploads = record.uploads.len(),
                    proofs = record.proof_artifacts.len(),
                    "round completed"
                );
                Ok(record)
            }
            Err((stage, err)) => {
                let err = err.with_round(round_id, stage);
                tracing::error!(
                    target: "roundproof.pipeline",
                    round_id,
                    %stage,
                    error = %err,
                    "round failed"
                );
                let mut failure = RoundRecord::failed(
                    round_id,
                    started_at_ms,
                    unix_ms_now(),
                    stage,
                    err.to_string(),
                );
                failure.capabilities = Some(self.capabilities);
                if let Err(record_err) = self.ledger.commit(failure).await {
                    tracing::error!(
                        target: "roundproof.pipeline",
                        round_id,
                        error = %record_err,
                        "could not record failed round"
                    );
                }
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        round_id: u64,
        started_at_ms: u64,
    ) -> Result<RoundRecord, (Stage, RoundError)> {
        let at = |stage: Stage| move |err: RoundError| (stage, err);
        let cfg = &self.config;
        let work_dir = cfg.pipeline.work_dir.clone();

        self.cancel
            .check(Stage::Preflight)
            .map_err(at(Stage::Preflight))?;
        if cfg.pipeline.check_credentials
            && !self.uploader.test_credentials(&cfg.credentials()).await
        {
            return Err((
                Stage::Preflight,
                RoundError::UploadRejected(
                    "pinning service rejected the configured credentials".into(),
                ),
            ));
        }

        self.cancel.check(Stage::Train).map_err(at(Stage::Train))?;
        let model_update = cfg.resolve(&cfg.pipeline.model_update_file);
        let stats_file = cfg.resolve(&cfg.pipeline.stats_file);
        // Only outputs written by this round's trainer may reach the proof stage.
        for stale in [&model_update, &stats_file] {
            remove_if_present(stale).await.map_err(at(Stage::Train))?;
        }
        retry_process("trainer", cfg.stage_retry(), |_| self.trainer.train(&work_dir))
            .await
            .map_err(at(Stage::Train))?;
        if !model_update.is_file() {
            return Err((
                Stage::Train,
                RoundError::InvalidInput(format!(
                    "trainer produced no model update at {}",
                    model_update.display()
                )),
            ));
        }
        let stats = TrainingStats::load_or_default(&stats_file).map_err(at(Stage::Train))?;

        self.cancel.check(Stage::Prove).map_err(at(Stage::Prove))?;
        let proofs = retry_process("proof generation", cfg.stage_retry(), |_| {
            self.orchestrator
                .generate_all(&stats, &self.capabilities, &model_update)
        })
        .await
        .map_err(at(Stage::Prove))?;
        let bundle = self.orchestrator.proofs_dir().join(PROOF_BUNDLE_FILE);
        proofs
            .write_bundle(&bundle, &self.capabilities)
            .map_err(at(Stage::Prove))?;

        self.cancel.check(Stage::Upload).map_err(at(Stage::Upload))?;
        let uploads = self
            .uploader
            .upload_all(upload_plan(model_update, bundle, &proofs), &cfg.credentials())
            .await
            .map_err(at(Stage::Upload))?;
        self.check_credential_outcome(&uploads)
            .map_err(at(Stage::Upload))?;

        self.cancel.check(Stage::Record).map_err(at(Stage::Record))?;
        let metadata = RoundMetadata {
            round_id,
            agent: cfg.identity(),
            uploads: uploads
                .iter()
                .map(|(name, rec)| (name.clone(), rec.cid.clone()))
                .collect(),
            proof_summary: proofs.summary(),
            capabilities: self.capabilities,
            timestamp_ms: unix_ms_now(),
        };
        metadata
            .write(&cfg.resolve(&cfg.pipeline.metadata_dir))
            .map_err(at(Stage::Record))?;

        let record = RoundRecord {
            round_id,
            started_at_ms,
            ended_at_ms: unix_ms_now(),
            success: true,
            proof_path: Some(proofs.path.clone()),
            proof_artifacts: proofs.artifacts,
            uploads,
            failure_reason: None,
            failed_stage: None,
            capabilities: Some(self.capabilities),
            training_stats: Some(stats),
        };
        self.ledger
            .commit(record.clone())
            .await
            .map_err(at(Stage::Record))?;
        Ok(record)
    }

    fn check_credential_outcome(
        &self,
        uploads: &BTreeMap<String, UploadRecord>,
    ) -> RoundResult<()> {
        let rejected: Vec<&str> = uploads
            .iter()
            .filter(|(_, rec)| rec.credentials_rejected)
            .map(|(name, _)| name.as_str())
            .collect();
        if rejected.is_empty() {
            return Ok(());
        }
        if self.config.pipeline.fail_on_invalid_credentials {
            return Err(RoundError::UploadRejected(format!(
                "credentials rejected while uploading {}",
                rejected.join(", ")
            )));
        }
        tracing::warn!(
            target: "roundproof.pipeline",
            artifacts = %rejected.join(", "),
            "credentials rejected; simulated CIDs recorded instead"
        );
        Ok(())
    }

    fn cleanup(&self) {
        for rel in &self.config.pipeline.cleanup_paths {
            let path = self.config.resolve(rel);
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => {
                    tracing::debug!(target: "roundproof.pipeline", path = %path.display(), "removed")
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => tracing::warn!(
                    target: "roundproof.pipeline",
                    path = %path.display(),
                    error = %err,
                    "cleanup failed"
                ),
            }
        }
    }
}

async fn remove_if_present(path: &Path) -> RoundResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(
                target: "roundproof.pipeline",
                path = %path.display(),
                "removed previous trainer output"
            );
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
