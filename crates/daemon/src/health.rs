// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health status derived from resource utilization.

pub use dim_wire::HealthStatus as DaemonHealthStatus;

const DEGRADED_THRESHOLD_PERCENT: f64 = 90.0;
const UNHEALTHY_THRESHOLD_PERCENT: f64 = 95.0;

/// `healthy` below 90% on both axes, `degraded` below 95%, else `unhealthy`.
pub fn status_from_utilization(cpu_percent: f64, memory_percent: f64) -> DaemonHealthStatus {
    let worst = cpu_percent.max(memory_percent);
    if worst < DEGRADED_THRESHOLD_PERCENT {
        DaemonHealthStatus::Healthy
    } else if worst < UNHEALTHY_THRESHOLD_PERCENT {
        DaemonHealthStatus::Degraded
    } else {
        DaemonHealthStatus::Unhealthy
    }
}

/// Maps the daemon's own health status onto the orchestrator-facing
/// [`dim_core::NodeStatus`] vocabulary carried in heartbeat events.
pub fn to_node_status(status: DaemonHealthStatus) -> dim_core::NodeStatus {
    match status {
        DaemonHealthStatus::Healthy => dim_core::NodeStatus::Healthy,
        DaemonHealthStatus::Degraded => dim_core::NodeStatus::Degraded,
        DaemonHealthStatus::Unhealthy => dim_core::NodeStatus::Unreachable,
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
