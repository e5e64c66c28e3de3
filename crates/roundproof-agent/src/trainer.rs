// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

//! The external training procedure.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use roundproof_core::process::{run_checked, CommandSpec};
use roundproof_core::{RoundError, RoundResult};

#[async_trait]
pub trait Trainer: Send + Sync {
    /// Runs one training pass in `work_dir`, which is expected to leave the model update
    /// (and optionally a stats file) behind.
    async fn train(&self, work_dir: &Path) -> RoundResult<()>;
}

#[derive(Debug, Clone)]
pub struct ProcessTrainer {
    command: Vec<String>,
    timeout: Duration,
}

impl ProcessTrainer {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

#[async_trait]
impl Trainer for ProcessTrainer {
    async fn train(&self, work_dir: &Path) -> RoundResult<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| RoundError::ConfigInvalid("trainer command is empty".into()))?;
        let spec = CommandSpec::new(program, self.timeout)
            .args(args.iter().cloned())
            .current_dir(work_dir);
        tracing::info!(
            target: "roundproof.pipeline",
            program = %program,
            timeout_secs = self.timeout.as_secs(),
            "starting trainer"
        );
        let output = run_checked(&spec).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(last) = stdout.lines().rev().find(|l| !l.trim().is_empty()) {
            tracing::info!(target: "roundproof.pipeline", last_line = %last.trim(), "trainer finished");
        }
        Ok(())
    }
}
