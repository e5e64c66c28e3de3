// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;
use std::time::Duration;

use roundproof_core::RoundResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the attempt budget is
/// spent. Only the process-invocation class (see `RoundError::is_retryable`) is retried.
pub async fn retry_process<T, F, Fut>(what: &str, policy: RetryPolicy, mut op: F) -> RoundResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = RoundResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    target: "roundproof.pipeline",
                    what,
                    attempt = attempt + 1,
                    max = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after process failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
