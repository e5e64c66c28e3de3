// Copyright [2026] [RoundProof Contributors]
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use roundproof_agent::config::{AgentConfig, ToolchainSection, DEFAULT_CONFIG_FILE, ENV_TOOLCHAIN};
use roundproof_agent::pipeline::{PipelineDeps, RoundPipeline};
use roundproof_agent::CancelFlag;
use roundproof_core::capability::CapabilityProbe;
use roundproof_core::ledger::RoundLedger;
use roundproof_core::pinning::PinataClient;
use roundproof_core::stats::dataset_hash_csv;
use roundproof_core::upload::ContentAddressedUploader;
use roundproof_core::RoundResult;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "roundproof-agent")]
#[command(about = "Train, prove, publish and record one training round")]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[arg(long, default_value = "info")]
    log: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one round and print its record.
    Run {
        /// Defaults to one past the highest recorded round.
        #[arg(long)]
        round_id: Option<u64>,
    },
    /// Print detected capabilities.
    Probe,
    /// Test the configured pinning credentials.
    CheckCredentials,
    Ledger {
        #[command(subcommand)]
        cmd: LedgerCmd,
    },
    /// Print the order-independent hash of a CSV dataset.
    DatasetHash { csv: PathBuf },
}

#[derive(Debug, Subcommand)]
enum LedgerCmd {
    Show {
        #[arg(long)]
        round_id: Option<u64>,
    },
    Verify,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log))
        .with_writer(std::io::stderr)
        .init();

    let out = match args.cmd {
        Command::Run { round_id } => run_round(&args.config, round_id).await,
        Command::Probe => probe(&args.config).await,
        Command::CheckCredentials => check_credentials(&args.config).await,
        Command::Ledger { cmd } => run_ledger(&args.config, cmd),
        Command::DatasetHash { csv } => {
            dataset_hash_csv(&csv).map(|hash| json!({ "dataset_hash": hash.to_string() }))
        }
    };
    match out {
        Ok(v) => println!("{v}"),
        Err(err) => {
            println!("{}", json!({ "error": err.to_string() }));
            std::process::exit(1);
        }
    }
}

async fn run_round(config_path: &Path, round_id: Option<u64>) -> RoundResult<Value> {
    let config = AgentConfig::load(config_path)?;
    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(
                target: "roundproof.pipeline",
                "interrupt received; stopping before the next stage"
            );
            on_interrupt.cancel();
        }
    });

    let deps = PipelineDeps::from_config(&config);
    let pipeline = RoundPipeline::start(config, deps, cancel).await?;
    let round_id = round_id.unwrap_or_else(|| pipeline.next_round_id());
    let record = pipeline.run_round(round_id).await?;
    Ok(serde_json::to_value(record)?)
}

async fn probe(config_path: &Path) -> RoundResult<Value> {
    let toolchain = match AgentConfig::load(config_path) {
        Ok(cfg) => cfg.toolchain,
        Err(err) => {
            tracing::debug!(error = %err, "no usable config; probing default toolchain");
            let mut tc = ToolchainSection::default();
            if let Ok(program) = std::env::var(ENV_TOOLCHAIN) {
                tc.program = program;
            }
            tc
        }
    };
    let caps = CapabilityProbe::new(&toolchain.program)
        .with_args(toolchain.args.iter().cloned().chain(["--version".to_string()]))
        .with_timeout(Duration::from_secs(toolchain.probe_timeout_secs))
        .detect()
        .await;
    Ok(serde_json::to_value(caps)?)
}

async fn check_credentials(config_path: &Path) -> RoundResult<Value> {
    let config = AgentConfig::load(config_path)?;
    let client = PinataClient::new(
        &config.upload.api_url,
        &config.upload.gateway_url,
        config.request_timeout(),
    );
    let uploader = ContentAddressedUploader::new(Arc::new(client), config.upload_policy());
    let valid = uploader.test_credentials(&config.credentials()).await;
    Ok(json!({ "credentials_valid": valid }))
}

fn run_ledger(config_path: &Path, cmd: LedgerCmd) -> RoundResult<Value> {
    let config = AgentConfig::load(config_path)?;
    let ledger = RoundLedger::open(config.resolve(&config.pipeline.ledger_path))?;
    match cmd {
        LedgerCmd::Show { round_id: Some(id) } => match ledger.latest(id) {
            Some(record) => Ok(serde_json::to_value(record)?),
            None => Ok(json!({ "round_id": id, "record": null })),
        },
        LedgerCmd::Show { round_id: None } => Ok(serde_json::to_value(ledger.entries())?),
        LedgerCmd::Verify => {
            ledger.verify_chain()?;
            Ok(json!({ "entries": ledger.len(), "chain": "ok" }))
        }
    }
}
