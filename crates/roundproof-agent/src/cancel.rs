// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use roundproof_core::{RoundError, RoundResult, Stage};

/// Cooperative cancellation, honoured between stages only.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self, next: Stage) -> RoundResult<()> {
        if self.is_cancelled() {
            return Err(RoundError::Cancelled(next));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(flag.check(Stage::Train).is_ok());
        handle.cancel();
        assert!(matches!(
            flag.check(Stage::Prove),
            Err(RoundError::Cancelled(Stage::Prove))
        ));
    }
}
