// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type RoundResult<T> = Result<T, RoundError>;

/// Pipeline stage an error escaped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preflight,
    Train,
    Prove,
    Upload,
    Record,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preflight => "preflight",
            Stage::Train => "train",
            Stage::Prove => "prove",
            Stage::Upload => "upload",
            Stage::Record => "record",
        };
        f.write_str(name)
    }
}

/// Why an external process did not produce a usable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationCause {
    /// The program could not be started at all (usually missing from PATH).
    Spawn,
    NonZeroExit(Option<i32>),
    Io,
    /// The process ran but its outputs do not satisfy the contract.
    Logic,
}

impl fmt::Display for InvocationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationCause::Spawn => f.write_str("spawn failed"),
            InvocationCause::NonZeroExit(Some(code)) => write!(f, "exit code {code}"),
            InvocationCause::NonZeroExit(None) => f.write_str("terminated by signal"),
            InvocationCause::Io => f.write_str("i/o error"),
            InvocationCause::Logic => f.write_str("contract violation"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RoundError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("{what} timed out after {timeout_secs}s")]
    StageTimeout { what: String, timeout_secs: u64 },

    #[error("`{program}` failed ({cause}): {detail}")]
    ToolchainInvocationFailed {
        program: String,
        cause: InvocationCause,
        detail: String,
    },

    #[error("upload rejected: {0}")]
    UploadRejected(String),

    #[error("verification inconclusive: {0}")]
    VerificationInconclusive(String),

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("round cancelled before {0}")]
    Cancelled(Stage),

    #[error("round {round_id} failed during {stage}: {source}")]
    Round {
        round_id: u64,
        stage: Stage,
        #[source]
        source: Box<RoundError>,
    },
}

impl RoundError {
    pub fn invocation(
        program: impl Into<String>,
        cause: InvocationCause,
        detail: impl Into<String>,
    ) -> Self {
        Self::ToolchainInvocationFailed {
            program: program.into(),
            cause,
            detail: detail.into(),
        }
    }

    /// Process-invocation failures (timeouts, non-zero exits, I/O) are worth another attempt;
    /// everything else is logical and fails immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            RoundError::StageTimeout { .. } | RoundError::Io(_) => true,
            RoundError::ToolchainInvocationFailed { cause, .. } => {
                matches!(cause, InvocationCause::NonZeroExit(_) | InvocationCause::Io)
            }
            RoundError::Round { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    pub fn with_round(self, round_id: u64, stage: Stage) -> Self {
        match self {
            already @ RoundError::Round { .. } => already,
            other => RoundError::Round {
                round_id,
                stage,
                source: Box::new(other),
            },
        }
    }
}

impl From<serde_json::Error> for RoundError {
    fn from(err: serde_json::Error) -> Self {
        RoundError::InvalidInput(format!("json: {err}"))
    }
}
