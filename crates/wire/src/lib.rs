// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for orchestrator and daemon RPC.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod daemon_rpc;
mod orchestrator_rpc;
mod wire;

pub use daemon_rpc::{DaemonRequest, DaemonResponse, DaemonStats, HealthResources, HealthStatus, RateLimitStatus};
pub use orchestrator_rpc::{
    JobResultMetadata, JobSummaryEntry, OrchestratorRequest, OrchestratorResponse,
};
pub use wire::{decode, encode, read_message, read_request, write_message, write_response, ProtocolError};
