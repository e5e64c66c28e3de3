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

//! roundproof-agent
//!
//! Typed configuration, the external trainer driver, stage retry and cancellation, and the
//! round pipeline that ties the core components together.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod cancel;
pub mod config;
pub mod pipeline;
pub mod retry;
pub mod trainer;

pub use crate::cancel::CancelFlag;
pub use crate::config::AgentConfig;
pub use crate::pipeline::{PipelineDeps, RoundPipeline};
