// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded-time subprocess invocation shared by the capability probe, the circuit toolchain
//! driver and the trainer.

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

use crate::error::{InvocationCause, RoundError, RoundResult};

const STDERR_TAIL_BYTES: usize = 2_048;

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Runs the command to completion or kills it once `timeout` elapses. Exit status is not
/// inspected here; see [`classify_process_output`].
pub async fn run_command(spec: &CommandSpec) -> RoundResult<Output> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }

    let child = cmd.spawn().map_err(|err| {
        RoundError::invocation(&spec.program, InvocationCause::Spawn, err.to_string())
    })?;

    match tokio::time::timeout(spec.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(RoundError::invocation(
            &spec.program,
            InvocationCause::Io,
            err.to_string(),
        )),
        Err(_) => Err(RoundError::StageTimeout {
            what: spec.display(),
            timeout_secs: spec.timeout.as_secs(),
        }),
    }
}

/// Maps a finished process onto the error taxonomy: success passes through, anything else
/// becomes a `NonZeroExit` carrying the tail of stderr.
pub fn classify_process_output(program: &str, output: Output) -> RoundResult<Output> {
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    let tail = if trimmed.len() > STDERR_TAIL_BYTES {
        let mut start = trimmed.len() - STDERR_TAIL_BYTES;
        while !trimmed.is_char_boundary(start) {
            start += 1;
        }
        &trimmed[start..]
    } else {
        trimmed
    };
    Err(RoundError::invocation(
        program,
        InvocationCause::NonZeroExit(output.status.code()),
        tail.to_string(),
    ))
}

pub async fn run_checked(spec: &CommandSpec) -> RoundResult<Output> {
    let output = run_command(spec).await?;
    classify_process_output(&spec.program, output)
}
