// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Well-known pub/sub topic names and their payload shapes.
//!
//! All payloads are JSON-encoded UTF-8 byte strings over [`ObjectStore::publish`]
//! (crate::store::ObjectStore).

use dim_core::{JobId, NodeId, NodeStatus, OrchestratorId, ResourceSnapshot};
use serde::{Deserialize, Serialize};

pub const JOBS_UPDATES: &str = "dim.jobs.updates";
pub const NODES_HEARTBEAT: &str = "dim.nodes.heartbeat";
pub const RESULTS_READY: &str = "dim.results.ready";
pub const ORCHESTRATORS_HEARTBEAT: &str = "dim.orchestrators.heartbeat";
pub const ORCHESTRATORS_COORDINATION: &str = "dim.orchestrators.coordination";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEventType {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobUpdateEvent {
    pub job_id: JobId,
    pub event_type: JobEventType,
    #[serde(default)]
    pub node_id: Option<NodeId>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeHeartbeatEvent {
    pub node_id: NodeId,
    pub status: NodeStatus,
    pub active_jobs: u32,
    pub queued_jobs: u32,
    pub resources: ResourceSnapshot,
    #[serde(default)]
    pub cached_models: Vec<String>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultReadyEvent {
    pub job_id: JobId,
    pub result_cid: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorHeartbeatEvent {
    pub orchestrator_id: OrchestratorId,
    pub active_jobs: u32,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationType {
    JobDistributionRequest,
    JobDistributionResponse,
    JobAssignment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationEvent {
    #[serde(rename = "type")]
    pub kind: CoordinationType,
    pub orchestrator_id: OrchestratorId,
    #[serde(default)]
    pub target_orchestrator_id: Option<OrchestratorId>,
    #[serde(default)]
    pub job_id: Option<JobId>,
    #[serde(default)]
    pub job_spec: Option<serde_json::Value>,
    #[serde(default)]
    pub active_jobs: Option<u32>,
    #[serde(default)]
    pub capacity: Option<u32>,
    pub timestamp: u64,
}
