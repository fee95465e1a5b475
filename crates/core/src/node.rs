// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker node identity and the roster record an orchestrator maintains for it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Identifies a daemon-run worker node.
    pub struct NodeId("node");
}

crate::define_id! {
    /// Identifies an orchestrator instance among its peers.
    pub struct OrchestratorId("orc-");
}

/// Health state an orchestrator assigns a node based on heartbeat recency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Healthy,
    Degraded,
    Unreachable,
}

crate::simple_display! {
    NodeStatus {
        Healthy => "healthy",
        Degraded => "degraded",
        Unreachable => "unreachable",
    }
}

/// Point-in-time resource snapshot a node reports in its heartbeat.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub active_jobs: u32,
    pub max_concurrent_jobs: u32,
}

impl ResourceSnapshot {
    pub fn has_capacity(&self) -> bool {
        self.active_jobs < self.max_concurrent_jobs
    }
}

/// Roster entry the orchestrator holds per known node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node_id: NodeId,
    pub address: String,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub reputation: f64,
    #[serde(default)]
    pub resources: ResourceSnapshot,
    #[serde(default)]
    pub status: NodeStatus,
    pub last_heartbeat_ms: u64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl Default for NodeStatus {
    fn default() -> Self {
        NodeStatus::Healthy
    }
}

impl NodeInfo {
    /// A node is selectable if it's healthy, has spare capacity, and serves
    /// the requested model.
    pub fn can_serve(&self, model_id: &str) -> bool {
        self.status == NodeStatus::Healthy
            && self.resources.has_capacity()
            && self.models.iter().any(|m| m == model_id)
    }

    /// A node is active for orchestrator selection purposes iff its last
    /// heartbeat is within `heartbeat_timeout` of `now_ms`, regardless of
    /// its reported health status.
    pub fn is_active(&self, now_ms: u64, heartbeat_timeout_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_heartbeat_ms) < heartbeat_timeout_ms
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
