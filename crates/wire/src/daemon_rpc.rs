// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-facing RPC request/response shapes.

use dim_core::{JobId, Priority, ResourceSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DaemonRequest {
    SubmitJob {
        job_id: JobId,
        model_id: String,
        #[serde(default)]
        data_source: Option<String>,
        #[serde(default)]
        input_data_json: Option<Value>,
        timeout: u64,
        #[serde(default)]
        priority: Priority,
    },
    GetJobStatus {
        job_id: JobId,
    },
    CancelJob {
        job_id: JobId,
    },
    GetHealth,
    GetStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

dim_core::simple_display! {
    HealthStatus {
        Healthy => "healthy",
        Degraded => "degraded",
        Unhealthy => "unhealthy",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResources {
    pub cpu_available: bool,
    pub cpu_count: u32,
    pub memory_available_gb: f64,
    pub memory_used_gb: f64,
    pub gpu_available: bool,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// Operator-facing snapshot of the daemon's own rate-limit bucket, so `dim
/// status`/`GetStats` callers can see how close a node is to throttling
/// without guessing from request failures alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitStatus {
    pub tokens_available: f64,
    pub burst_size: f64,
    pub rate_per_minute: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonStats {
    pub node_id: String,
    pub total_jobs: u64,
    pub successful_jobs: u64,
    pub failed_jobs: u64,
    pub avg_execution_time_ms: f64,
    pub cached_models_count: u32,
    pub cache_size_bytes: u64,
    pub resources: HealthResources,
    pub rate_limit: RateLimitStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DaemonResponse {
    JobSubmitted {
        job_id: JobId,
        status: String,
    },
    JobStatus {
        job_id: JobId,
        status: String,
        #[serde(default)]
        result_json: Option<Value>,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        started_at_ms: Option<u64>,
        #[serde(default)]
        completed_at_ms: Option<u64>,
        #[serde(default)]
        execution_time_ms: Option<u64>,
    },
    CancelResult {
        success: bool,
        message: String,
    },
    Health {
        status: HealthStatus,
        node_id: String,
        resources: HealthResources,
        cached_models: Vec<String>,
        active_jobs: u32,
        queued_jobs: u32,
    },
    Stats(DaemonStats),
    Error {
        kind: String,
        message: String,
    },
}

#[cfg(test)]
#[path = "daemon_rpc_tests.rs"]
mod tests;
