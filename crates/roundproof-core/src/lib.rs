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

//! roundproof-core
//!
//! Building blocks of a single participant's training round:
//! - Capability probing (host environment + circuit toolchain availability)
//! - Proof orchestration over three hash-chained circuits, with a deterministic simulated path
//! - Content-addressed uploads with thresholds, rate limiting, retry/backoff and verification
//! - An append-only, hash-chained round ledger and per-round metadata documents

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod capability;
pub mod digest;
pub mod error;
pub mod fsutil;
pub mod ledger;
pub mod metadata;
pub mod orchestrator;
pub mod pinning;
pub mod process;
pub mod proof;
pub mod stats;
pub mod toolchain;
pub mod upload;

pub use crate::capability::{Capabilities, CapabilityProbe, Environment};
pub use crate::error::{RoundError, RoundResult, Stage};
pub use crate::ledger::{RoundLedger, RoundRecord};
pub use crate::orchestrator::ProofOrchestrator;
pub use crate::pinning::{PinataClient, PinningCredentials, PinningService};
pub use crate::proof::{ProofArtifact, ProofKind, ProofSet};
pub use crate::stats::TrainingStats;
pub use crate::upload::{ContentAddressedUploader, UploadPolicy, UploadRecord};
