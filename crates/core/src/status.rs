// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job lifecycle state machine and progress reporting.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse job lifecycle state. Transitions are monotonic: a job never moves
/// backwards except `Running -> Queued` is never valid either — retries
/// within a chained pipeline stay inside `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    JobState {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl JobState {
    /// Once a job reaches a terminal state no further status transitions
    /// are accepted for it.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }
}

/// Per-subjob status, keyed by node for collaborative/comparative jobs or by
/// step name for chained jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjobStatus {
    pub label: String,
    pub state: JobState,
    #[serde(default)]
    pub error: Option<String>,
}

/// Coarse progress counter surfaced to polling clients.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Progress {
    pub completed: u32,
    pub total: u32,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Full status record returned by `get_job_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: crate::job::JobId,
    pub state: JobState,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub subjobs: Vec<SubjobStatus>,
    #[serde(default)]
    pub error: Option<String>,
    pub submitted_at_ms: u64,
    #[serde(default)]
    pub updated_at_ms: u64,
}

/// Final result payload returned by `get_job_result`, available once
/// `JobState::Completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: crate::job::JobId,
    pub output: Value,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, Value>,
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
