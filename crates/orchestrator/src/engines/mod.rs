// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pattern engines: the closed `{collaborative, comparative, chained}`
//! dispatch table. Each variant has its own execution plan but shares the
//! same daemon round-trip primitive (`run_subjob`) and `PatternContext`.

pub mod aggregation;
pub mod chained;
pub mod collaborative;
pub mod comparative;
pub mod consensus;

use crate::daemon_client::{DaemonClient, DaemonClientError};
use crate::model_reputation::ModelReputationTracker;
use crate::registry::NodeRegistry;
use dim_core::{Clock, DimError, DimResult, JobId, Priority};
use dim_wire::{DaemonRequest, DaemonResponse};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Shared handles every pattern engine needs: a way to resolve a node id to
/// a routable address, and a client to talk to it.
pub struct PatternContext<C: Clock> {
    pub daemon_client: Arc<DaemonClient<C>>,
    pub registry: Arc<NodeRegistry<C>>,
    pub model_reputation: Arc<ModelReputationTracker>,
}

impl<C: Clock> PatternContext<C> {
    pub fn new(
        daemon_client: Arc<DaemonClient<C>>,
        registry: Arc<NodeRegistry<C>>,
        model_reputation: Arc<ModelReputationTracker>,
    ) -> Self {
        Self { daemon_client, registry, model_reputation }
    }

    pub fn resolve_address(&self, node_id: &str) -> DimResult<String> {
        self.registry
            .find_by_str(node_id)
            .map(|n| n.address)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| DimError::InvalidSpec(format!("unknown or addressless node: {node_id}")))
    }

    pub fn reputation_of(&self, node_id: &str) -> f64 {
        self.registry.find_by_str(node_id).map(|n| n.reputation).unwrap_or(1.0)
    }
}

fn client_error(e: DaemonClientError) -> DimError {
    DimError::RpcUnavailable(e.to_string())
}

/// Submit one subjob to a daemon and poll until terminal, timeout, or
/// cancellation. Shared by collaborative fan-out, comparative fan-out, and
/// each chained pipeline step.
pub async fn run_subjob<C: Clock>(
    client: &DaemonClient<C>,
    address: &str,
    model_id: &str,
    data_source: Option<String>,
    input_data: &Value,
    timeout_secs: u64,
    cancel: &CancellationToken,
) -> DimResult<Value> {
    let subjob_id = JobId::new();
    let submit = DaemonRequest::SubmitJob {
        job_id: subjob_id,
        model_id: model_id.to_string(),
        data_source,
        input_data_json: Some(input_data.clone()),
        timeout: timeout_secs,
        priority: Priority::Normal,
    };

    match client.call(address, submit).await.map_err(client_error)? {
        DaemonResponse::JobSubmitted { .. } => {}
        DaemonResponse::Error { kind, message } => return Err(DimError::internal(format!("{kind}: {message}"))),
        other => return Err(DimError::internal(format!("unexpected daemon response to SubmitJob: {other:?}"))),
    }

    // Grace-padded beyond the agent's own timeout: the daemon's supervisor
    // already enforces `timeout_secs` internally (plus its own SIGKILL
    // grace); this deadline is a backstop against a daemon that never
    // replies at all.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_secs) + Duration::from_secs(10);

    loop {
        if cancel.is_cancelled() {
            let _ = client.call(address, DaemonRequest::CancelJob { job_id: subjob_id }).await;
            return Err(DimError::internal("job cancelled"));
        }
        if tokio::time::Instant::now() > deadline {
            return Err(DimError::Timeout { elapsed_secs: timeout_secs, limit_secs: timeout_secs });
        }

        let status = client.call(address, DaemonRequest::GetJobStatus { job_id: subjob_id }).await.map_err(client_error)?;
        match status {
            DaemonResponse::JobStatus { status, result_json, error, .. } => match status.as_str() {
                "completed" => return Ok(result_json.unwrap_or(Value::Null)),
                "failed" => return Err(DimError::internal(error.unwrap_or_else(|| "subjob failed".to_string()))),
                "cancelled" => return Err(DimError::internal("subjob cancelled")),
                _ => tokio::time::sleep(Duration::from_millis(250)).await,
            },
            DaemonResponse::Error { kind, message } => return Err(DimError::internal(format!("{kind}: {message}"))),
            other => return Err(DimError::internal(format!("unexpected daemon response to GetJobStatus: {other:?}"))),
        }
    }
}

/// Validate a job's pattern-specific config, per §4.1's per-pattern rules.
pub fn validate_spec(config: &dim_core::PatternConfig) -> DimResult<()> {
    match config {
        dim_core::PatternConfig::Collaborative { model_id, nodes, .. } => collaborative::validate(model_id, nodes),
        dim_core::PatternConfig::Comparative { model_ids, node_id, .. } => comparative::validate(model_ids, node_id),
        dim_core::PatternConfig::Chained { pipeline, .. } => chained::validate(pipeline),
    }
}

/// Execute the validated spec, dispatching on its pattern tag.
pub async fn execute_pattern<C: Clock>(
    ctx: &PatternContext<C>,
    config: &dim_core::PatternConfig,
    input_data: &Value,
    cancel: &CancellationToken,
) -> DimResult<Value> {
    match config {
        dim_core::PatternConfig::Collaborative { .. } => collaborative::execute(ctx, config, input_data, cancel).await,
        dim_core::PatternConfig::Comparative { .. } => comparative::execute(ctx, config, input_data, cancel).await,
        dim_core::PatternConfig::Chained { .. } => chained::execute(ctx, config, input_data, cancel).await,
    }
}
