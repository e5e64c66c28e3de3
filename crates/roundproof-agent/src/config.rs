// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};
use std::time::Duration;

use roundproof_core::capability::{DEFAULT_TOOLCHAIN_PROGRAM, MAX_PROBE_TIMEOUT};
use roundproof_core::metadata::AgentIdentity;
use roundproof_core::pinning::{PinningCredentials, DEFAULT_API_URL, DEFAULT_GATEWAY_URL};
use roundproof_core::upload::UploadPolicy;
use roundproof_core::{RoundError, RoundResult};
use serde::Deserialize;

use crate::retry::RetryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "roundproof-agent.toml";
pub const ENV_PINATA_API_KEY: &str = "ROUNDPROOF_PINATA_API_KEY";
pub const ENV_PINATA_SECRET_KEY: &str = "ROUNDPROOF_PINATA_SECRET_KEY";
pub const ENV_TOOLCHAIN: &str = "ROUNDPROOF_TOOLCHAIN";

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub agent: AgentSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub toolchain: ToolchainSection,
    #[serde(default)]
    pub upload: UploadSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    pub wallet_address: String,
    pub agent_name: String,
    pub model: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub batch_size: u32,
    pub reward_threshold: f64,
    pub data_path: PathBuf,
    #[serde(default)]
    pub pinata_api_key: String,
    #[serde(default)]
    pub pinata_secret_key: String,
}

fn default_method() -> String {
    "lora".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub work_dir: PathBuf,
    pub trainer_command: Vec<String>,
    pub model_update_file: PathBuf,
    pub stats_file: PathBuf,
    pub train_timeout_secs: u64,
    pub stage_max_attempts: u32,
    pub stage_backoff_base_ms: u64,
    pub ledger_path: PathBuf,
    pub metadata_dir: PathBuf,
    pub proofs_dir: PathBuf,
    pub cleanup_paths: Vec<PathBuf>,
    /// When false, rejected pinning credentials degrade to simulated CIDs and the round
    /// still succeeds.
    pub fail_on_invalid_credentials: bool,
    pub check_credentials: bool,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            trainer_command: vec!["python".to_string(), "train.py".to_string()],
            model_update_file: PathBuf::from("model_diff.pt"),
            stats_file: PathBuf::from("training_stats.json"),
            train_timeout_secs: 300,
            stage_max_attempts: 3,
            stage_backoff_base_ms: 1_000,
            ledger_path: PathBuf::from("agent-memory.json"),
            metadata_dir: PathBuf::from("metadata"),
            proofs_dir: PathBuf::from("proofs"),
            cleanup_paths: vec![PathBuf::from("results"), PathBuf::from("logs")],
            fail_on_invalid_credentials: true,
            check_credentials: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolchainSection {
    pub program: String,
    /// Passed before every subcommand and before `--version` when probing.
    pub args: Vec<String>,
    pub circuits_dir: PathBuf,
    pub probe_timeout_secs: u64,
    pub command_timeout_secs: u64,
}

impl Default for ToolchainSection {
    fn default() -> Self {
        Self {
            program: DEFAULT_TOOLCHAIN_PROGRAM.to_string(),
            args: Vec::new(),
            circuits_dir: PathBuf::from("../circuits"),
            probe_timeout_secs: MAX_PROBE_TIMEOUT.as_secs(),
            command_timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub api_url: String,
    pub gateway_url: String,
    pub hard_cap_bytes: u64,
    pub simulate_above_bytes: u64,
    pub compress_above_bytes: u64,
    pub max_retries: u32,
    pub rate_limit_delay_ms: u64,
    pub backoff_unit_ms: u64,
    pub verify_attempts: u32,
    pub request_timeout_secs: u64,
    pub verify_uploads: bool,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            hard_cap_bytes: 500 * MIB,
            simulate_above_bytes: 200 * MIB,
            compress_above_bytes: 50 * MIB,
            max_retries: 3,
            rate_limit_delay_ms: 1_000,
            backoff_unit_ms: 1_000,
            verify_attempts: 3,
            request_timeout_secs: 10,
            verify_uploads: true,
        }
    }
}

impl AgentConfig {
    /// Reads, applies environment overrides, anchors relative paths at the file's directory,
    /// then validates. Nothing downstream runs on a config that fails here.
    pub fn load(path: &Path) -> RoundResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            RoundError::ConfigInvalid(format!("cannot read {}: {err}", path.display()))
        })?;
        let mut cfg = Self::from_toml_str(&text)?;
        cfg.apply_overrides(|name| std::env::var(name).ok());
        if cfg.pipeline.work_dir.is_relative() {
            if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                cfg.pipeline.work_dir = base.join(&cfg.pipeline.work_dir);
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(text: &str) -> RoundResult<Self> {
        toml::from_str(text).map_err(|err| RoundError::ConfigInvalid(err.to_string()))
    }

    /// Secrets and the toolchain binary may come from the environment instead of the file.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty(ENV_PINATA_API_KEY) {
            self.agent.pinata_api_key = v;
        }
        if let Some(v) = non_empty(ENV_PINATA_SECRET_KEY) {
            self.agent.pinata_secret_key = v;
        }
        if let Some(v) = non_empty(ENV_TOOLCHAIN) {
            self.toolchain.program = v;
        }
    }

    pub fn validate(&self) -> RoundResult<()> {
        let invalid = |msg: String| Err(RoundError::ConfigInvalid(msg));
        let a = &self.agent;
        for (field, value) in [
            ("agent.wallet_address", &a.wallet_address),
            ("agent.agent_name", &a.agent_name),
            ("agent.model", &a.model),
            ("agent.method", &a.method),
            ("agent.pinata_api_key", &a.pinata_api_key),
            ("agent.pinata_secret_key", &a.pinata_secret_key),
        ] {
            if value.trim().is_empty() {
                return invalid(format!("{field} is required"));
            }
        }
        if a.batch_size == 0 {
            return invalid("agent.batch_size must be positive".into());
        }
        if !a.reward_threshold.is_finite() || a.reward_threshold < 0.0 {
            return invalid("agent.reward_threshold must be a non-negative number".into());
        }
        let data_path = self.resolve(&a.data_path);
        if !data_path.exists() {
            return invalid(format!(
                "agent.data_path does not exist: {}",
                data_path.display()
            ));
        }

        let p = &self.pipeline;
        if p.trainer_command.first().map_or(true, |c| c.trim().is_empty()) {
            return invalid("pipeline.trainer_command must name a program".into());
        }
        if p.train_timeout_secs == 0 {
            return invalid("pipeline.train_timeout_secs must be positive".into());
        }
        if p.stage_max_attempts == 0 {
            return invalid("pipeline.stage_max_attempts must be at least 1".into());
        }

        if self.toolchain.program.trim().is_empty() {
            return invalid("toolchain.program is required".into());
        }
        if self.toolchain.command_timeout_secs == 0 || self.toolchain.probe_timeout_secs == 0 {
            return invalid("toolchain timeouts must be positive".into());
        }

        let u = &self.upload;
        if u.max_retries == 0 {
            return invalid("upload.max_retries must be at least 1".into());
        }
        if u.request_timeout_secs == 0 {
            return invalid("upload.request_timeout_secs must be positive".into());
        }
        if !(u.compress_above_bytes <= u.simulate_above_bytes
            && u.simulate_above_bytes <= u.hard_cap_bytes)
        {
            return invalid(
                "upload thresholds must satisfy compress_above <= simulate_above <= hard_cap"
                    .into(),
            );
        }
        Ok(())
    }

    /// Relative paths are taken from `pipeline.work_dir`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.pipeline.work_dir.join(path)
        }
    }

    pub fn credentials(&self) -> PinningCredentials {
        PinningCredentials::new(&self.agent.pinata_api_key, &self.agent.pinata_secret_key)
    }

    pub fn identity(&self) -> AgentIdentity {
        AgentIdentity {
            agent_name: self.agent.agent_name.clone(),
            wallet_address: self.agent.wallet_address.clone(),
            model: self.agent.model.clone(),
            method: self.agent.method.clone(),
            batch_size: self.agent.batch_size,
            reward_threshold: self.agent.reward_threshold,
            data_path: self.agent.data_path.clone(),
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        let u = &self.upload;
        UploadPolicy {
            hard_cap_bytes: u.hard_cap_bytes,
            simulate_above_bytes: u.simulate_above_bytes,
            compress_above_bytes: u.compress_above_bytes,
            max_retries: u.max_retries,
            rate_limit_delay: Duration::from_millis(u.rate_limit_delay_ms),
            backoff_unit: Duration::from_millis(u.backoff_unit_ms),
            verify_attempts: u.verify_attempts,
            verify_uploads: u.verify_uploads,
            ..UploadPolicy::default()
        }
    }

    pub fn stage_retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.pipeline.stage_max_attempts,
            base_delay: Duration::from_millis(self.pipeline.stage_backoff_base_ms),
        }
    }

    pub fn train_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.train_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.upload.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn minimal(data_path: &str) -> String {
        format!(
            r#"
[agent]
wallet_address = "0x1234"
agent_name = "agent-1"
model = "distilbert-base-uncased"
batch_size = 16
reward_threshold = 0.5
data_path = "{data_path}"
pinata_api_key = "key"
pinata_secret_key = "secret"
"#
        )
    }

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        std::fs::write(dir.path().join("train.csv"), "text,label\n").unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn minimal_file_gets_documented_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = AgentConfig::load(&write_config(&dir, &minimal("train.csv"))).unwrap();
        assert_eq!(cfg.agent.method, "lora");
        assert_eq!(cfg.pipeline.train_timeout_secs, 300);
        assert_eq!(cfg.pipeline.trainer_command, vec!["python", "train.py"]);
        assert_eq!(cfg.toolchain.program, "nargo");
        assert_eq!(cfg.upload.max_retries, 3);
        assert_eq!(cfg.upload_policy().hard_cap_bytes, 500 * MIB);
        assert_eq!(cfg.pipeline.work_dir, dir.path().join("."));
        assert!(cfg.pipeline.fail_on_invalid_credentials);
        assert!(!cfg.pipeline.check_credentials);
        assert!(cfg.resolve(&cfg.agent.data_path).exists());
    }

    #[test]
    fn invalid_values_name_the_field() {
        let dir = TempDir::new().unwrap();
        let cases = [
            (minimal("train.csv").replace("batch_size = 16", "batch_size = 0"), "batch_size"),
            (
                minimal("train.csv").replace("reward_threshold = 0.5", "reward_threshold = -1.0"),
                "reward_threshold",
            ),
            (minimal("missing.csv"), "data_path"),
            (minimal("train.csv").replace("model = \"distilbert-base-uncased\"", "model = \"\""), "agent.model"),
            (
                format!("{}\n[upload]\ncompress_above_bytes = 10\nsimulate_above_bytes = 5\n", minimal("train.csv")),
                "thresholds",
            ),
        ];
        for (body, needle) in cases {
            let err = AgentConfig::load(&write_config(&dir, &body)).unwrap_err();
            match err {
                RoundError::ConfigInvalid(msg) => assert!(msg.contains(needle), "{msg}"),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn missing_required_field_is_config_invalid() {
        let dir = TempDir::new().unwrap();
        let body = minimal("train.csv").replace("wallet_address = \"0x1234\"\n", "");
        assert!(matches!(
            AgentConfig::load(&write_config(&dir, &body)),
            Err(RoundError::ConfigInvalid(_))
        ));
        assert!(matches!(
            AgentConfig::load(&dir.path().join("absent.toml")),
            Err(RoundError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn environment_overrides_secrets_and_toolchain() {
        let mut cfg = AgentConfig::from_toml_str(&minimal("train.csv")).unwrap();
        let env = HashMap::from([
            (ENV_PINATA_API_KEY, "env-key".to_string()),
            (ENV_PINATA_SECRET_KEY, "  ".to_string()),
            (ENV_TOOLCHAIN, "/opt/nargo/bin/nargo".to_string()),
        ]);
        cfg.apply_overrides(|name| env.get(name).cloned());
        assert_eq!(cfg.agent.pinata_api_key, "env-key");
        assert_eq!(cfg.agent.pinata_secret_key, "secret");
        assert_eq!(cfg.toolchain.program, "/opt/nargo/bin/nargo");
        assert_eq!(cfg.credentials().api_key, "env-key");
    }

    #[test]
    fn sections_override_defaults() {
        let body = format!(
            "{}\n[pipeline]\nstage_max_attempts = 5\ncleanup_paths = []\n\n[toolchain]\nprogram = \"sh\"\nargs = [\"fake.sh\"]\n",
            minimal("train.csv")
        );
        let cfg = AgentConfig::from_toml_str(&body).unwrap();
        assert_eq!(cfg.stage_retry().max_attempts, 5);
        assert!(cfg.pipeline.cleanup_paths.is_empty());
        assert_eq!(cfg.toolchain.args, vec!["fake.sh"]);
        assert_eq!(cfg.pipeline.ledger_path, PathBuf::from("agent-memory.json"));
    }
}
