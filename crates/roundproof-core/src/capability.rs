// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

//! Host capability detection.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::process::{run_command, CommandSpec};

pub const DEFAULT_TOOLCHAIN_PROGRAM: &str = "nargo";
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Linux,
    WindowsNative,
    WindowsSubsystem,
    Unknown,
}

impl Environment {
    /// Classifies from the OS family name and the kernel release string. Linux kernels built
    /// for the Windows subsystem carry "microsoft" or "WSL" in their release.
    pub fn classify(os: &str, kernel_release: &str) -> Self {
        let release = kernel_release.to_ascii_lowercase();
        match os {
            "linux" if release.contains("microsoft") || release.contains("wsl") => {
                Environment::WindowsSubsystem
            }
            "linux" => Environment::Linux,
            "windows" => Environment::WindowsNative,
            _ => Environment::Unknown,
        }
    }

    pub fn detect() -> Self {
        let release = std::fs::read_to_string("/proc/sys/kernel/osrelease").unwrap_or_default();
        Self::classify(std::env::consts::OS, &release)
    }

    pub fn runs_linux_toolchains(self) -> bool {
        matches!(self, Environment::Linux | Environment::WindowsSubsystem)
    }
}

/// Immutable snapshot taken once per pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub environment: Environment,
    pub toolchain_available: bool,
    pub proofs_enabled: bool,
    pub fallback_mode: bool,
}

impl Capabilities {
    pub fn new(environment: Environment, toolchain_available: bool) -> Self {
        let proofs_enabled = environment.runs_linux_toolchains() && toolchain_available;
        Self {
            environment,
            toolchain_available,
            proofs_enabled,
            fallback_mode: !proofs_enabled,
        }
    }

    pub fn simulated_only(environment: Environment) -> Self {
        Self::new(environment, false)
    }
}

#[derive(Debug, Clone)]
pub struct CapabilityProbe {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    environment: Option<Environment>,
}

impl Default for CapabilityProbe {
    fn default() -> Self {
        Self::new(DEFAULT_TOOLCHAIN_PROGRAM)
    }
}

impl CapabilityProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["--version".to_string()],
            timeout: MAX_PROBE_TIMEOUT,
            environment: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.min(MAX_PROBE_TIMEOUT);
        self
    }

    /// Pins the environment instead of reading it from the host.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Never fails: a missing binary, a timeout or a non-zero exit all read as
    /// "toolchain unavailable".
    pub async fn detect(&self) -> Capabilities {
        let environment = self.environment.unwrap_or_else(Environment::detect);
        let spec = CommandSpec::new(&self.program, self.timeout).args(self.args.clone());
        let toolchain_available = match run_command(&spec).await {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                tracing::info!(
                    target: "roundproof.probe",
                    program = %self.program,
                    version = %version.lines().next().unwrap_or_default().trim(),
                    "circuit toolchain available"
                );
                true
            }
            Ok(output) => {
                tracing::warn!(
                    target: "roundproof.probe",
                    program = %self.program,
                    code = ?output.status.code(),
                    "circuit toolchain probe exited unsuccessfully"
                );
                false
            }
            Err(err) => {
                tracing::warn!(
                    target: "roundproof.probe",
                    program = %self.program,
                    error = %err,
                    "circuit toolchain not invokable"
                );
                false
            }
        };

        let caps = Capabilities::new(environment, toolchain_available);
        if caps.fallback_mode {
            tracing::warn!(
                target: "roundproof.probe",
                environment = ?caps.environment,
                toolchain_available,
                "proof generation limited to simulated fallback"
            );
        } else {
            tracing::info!(
                target: "roundproof.probe",
                environment = ?caps.environment,
                "real proof generation enabled"
            );
        }
        caps
    }
}
