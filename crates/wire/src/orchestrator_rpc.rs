// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator-facing RPC request/response shapes.

use dim_core::{JobId, JobState, JobStatus, Pattern, Priority};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum OrchestratorRequest {
    SubmitJob {
        user_id: String,
        pattern: Pattern,
        config_json: Value,
        #[serde(default)]
        input_data_json: Value,
        #[serde(default)]
        priority: Priority,
        #[serde(default)]
        max_cost: Option<f64>,
    },
    GetJobStatus {
        job_id: JobId,
    },
    CancelJob {
        job_id: JobId,
        user_id: String,
    },
    GetJobResult {
        job_id: JobId,
    },
    ListJobs {
        #[serde(default)]
        user_id: Option<String>,
        #[serde(default)]
        status_filter: Option<JobState>,
        #[serde(default = "default_limit")]
        limit: u32,
        #[serde(default)]
        offset: u32,
    },
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobResultMetadata {
    pub nodes_used: u32,
    pub total_execution_time_ms: u64,
    #[serde(default)]
    pub total_cost: f64,
    pub completed_at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummaryEntry {
    pub job_id: JobId,
    pub state: JobState,
    pub pattern: Pattern,
    pub submitted_at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum OrchestratorResponse {
    JobSubmitted {
        job_id: JobId,
        status: JobState,
        #[serde(default)]
        estimated_cost: Option<f64>,
        #[serde(default)]
        estimated_completion_ms: Option<u64>,
    },
    JobStatus(Box<JobStatus>),
    CancelResult {
        success: bool,
        message: String,
    },
    JobResult {
        result_json: Value,
        metadata: JobResultMetadata,
    },
    JobList {
        jobs: Vec<JobSummaryEntry>,
        total: u32,
        limit: u32,
        offset: u32,
    },
    Error {
        kind: String,
        message: String,
    },
}

#[cfg(test)]
#[path = "orchestrator_rpc_tests.rs"]
mod tests;
