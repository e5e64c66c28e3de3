// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

//! Driver for the external circuit toolchain (`compile` / `execute` / `verify` run inside a
//! circuit directory; artifacts land under `<circuit>/proofs/{proof,vk}`).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::capability::DEFAULT_TOOLCHAIN_PROGRAM;
use crate::error::{InvocationCause, RoundError, RoundResult};
use crate::process::{run_checked, run_command, CommandSpec};

pub const PROVER_INPUT_FILE: &str = "Prover.toml";
pub const PROOF_SUBDIR: &str = "proofs";
pub const PROOF_FILE: &str = "proof";
pub const VK_FILE: &str = "vk";

#[async_trait]
pub trait CircuitToolchain: Send + Sync {
    fn program(&self) -> &str;

    async fn compile(&self, circuit_dir: &Path) -> RoundResult<()>;

    /// Consumes `Prover.toml` and leaves `proofs/proof` and `proofs/vk` behind.
    async fn execute(&self, circuit_dir: &Path) -> RoundResult<()>;

    /// `Ok(false)` when the toolchain ran and rejected the proof; `Err` when it could not run.
    async fn verify(&self, circuit_dir: &Path) -> RoundResult<bool>;
}

#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    program: String,
    /// Placed before the subcommand, e.g. a wrapper script path when `program` is a shell.
    leading_args: Vec<String>,
    timeout: Duration,
}

impl Default for ProcessToolchain {
    fn default() -> Self {
        Self::new(DEFAULT_TOOLCHAIN_PROGRAM, Duration::from_secs(600))
    }
}

impl ProcessToolchain {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            timeout,
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    fn spec(&self, subcommand: &str, circuit_dir: &Path) -> CommandSpec {
        CommandSpec::new(&self.program, self.timeout)
            .args(self.leading_args.iter().cloned())
            .arg(subcommand)
            .current_dir(circuit_dir)
    }

    async fn run(&self, subcommand: &str, circuit_dir: &Path) -> RoundResult<()> {
        run_checked(&self.spec(subcommand, circuit_dir)).await?;
        tracing::info!(
            target: "roundproof.proof",
            program = %self.program,
            subcommand,
            circuit = %circuit_dir.display(),
            "toolchain step completed"
        );
        Ok(())
    }
}

#[async_trait]
impl CircuitToolchain for ProcessToolchain {
    fn program(&self) -> &str {
        &self.program
    }

    async fn compile(&self, circuit_dir: &Path) -> RoundResult<()> {
        self.run("compile", circuit_dir).await
    }

    async fn execute(&self, circuit_dir: &Path) -> RoundResult<()> {
        self.run("execute", circuit_dir).await
    }

    async fn verify(&self, circuit_dir: &Path) -> RoundResult<bool> {
        let output = run_command(&self.spec("verify", circuit_dir)).await?;
        if output.status.success() {
            return Ok(true);
        }
        tracing::warn!(
            target: "roundproof.proof",
            circuit = %circuit_dir.display(),
            code = ?output.status.code(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "proof rejected by verifier"
        );
        Ok(false)
    }
}

/// Removes the proof and vk a previous `execute` left in `circuit_dir`, so that only artifacts
/// written by the next run can be read back.
pub async fn clear_circuit_artifacts(circuit_dir: &Path) -> RoundResult<()> {
    for name in [PROOF_FILE, VK_FILE] {
        match tokio::fs::remove_file(circuit_dir.join(PROOF_SUBDIR).join(name)).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Reads one of the binary artifacts `execute` is expected to leave behind.
pub async fn read_circuit_artifact(
    program: &str,
    circuit_dir: &Path,
    name: &str,
) -> RoundResult<Vec<u8>> {
    let path = circuit_dir.join(PROOF_SUBDIR).join(name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(RoundError::invocation(
            program,
            InvocationCause::Logic,
            format!("expected artifact missing: {}", path.display()),
        )),
        Err(err) => Err(RoundError::invocation(
            program,
            InvocationCause::Io,
            format!("{}: {err}", path.display()),
        )),
    }
}
