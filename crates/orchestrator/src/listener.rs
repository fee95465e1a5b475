// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP front end for the orchestrator RPC surface: one framed request per
//! round-trip, dispatched to the [`crate::core::Orchestrator`] core.

use crate::core::Orchestrator;
use dim_core::{Clock, DimError, JobSpec};
use dim_wire::{
    read_request, write_response, JobResultMetadata, JobSummaryEntry, OrchestratorRequest, OrchestratorResponse,
};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

pub async fn serve<C: Clock + 'static>(orchestrator: Arc<Orchestrator<C>>, bind_address: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    tracing::info!(bind_address, "orchestrator RPC listener started");
    loop {
        let (stream, peer) = listener.accept().await?;
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(orchestrator, stream).await {
                tracing::warn!(%peer, error = %e, "orchestrator connection closed with error");
            }
        });
    }
}

async fn handle_connection<C: Clock + 'static>(
    orchestrator: Arc<Orchestrator<C>>,
    mut stream: TcpStream,
) -> std::io::Result<()> {
    loop {
        let request: OrchestratorRequest = match read_request(&mut stream).await {
            Ok(req) => req,
            Err(_) => return Ok(()),
        };
        let response = dispatch(&orchestrator, request).await;
        write_response(&mut stream, &response).await.map_err(std::io::Error::other)?;
    }
}

async fn dispatch<C: Clock + 'static>(orchestrator: &Arc<Orchestrator<C>>, request: OrchestratorRequest) -> OrchestratorResponse {
    match request {
        OrchestratorRequest::SubmitJob { user_id, pattern: _, config_json, input_data_json, priority, max_cost } => {
            submit_job_response(orchestrator, user_id, config_json, input_data_json, priority, max_cost).await
        }
        OrchestratorRequest::GetJobStatus { job_id } => match orchestrator.get_job_status(&job_id).await {
            Some(status) => OrchestratorResponse::JobStatus(Box::new(status)),
            None => OrchestratorResponse::Error {
                kind: dim_core::ErrorKind::InvalidSpec.to_string(),
                message: format!("unknown job: {job_id}"),
            },
        },
        OrchestratorRequest::CancelJob { job_id, user_id } => match orchestrator.cancel_job(&job_id, &user_id).await {
            Ok(success) => OrchestratorResponse::CancelResult {
                success,
                message: if success { "cancelled".to_string() } else { "job not cancellable".to_string() },
            },
            Err(e) => error_response(&e),
        },
        OrchestratorRequest::GetJobResult { job_id } => match orchestrator.get_job_result(&job_id).await {
            Ok(result) => OrchestratorResponse::JobResult {
                result_json: result.output,
                metadata: JobResultMetadata {
                    nodes_used: field_as_u32(&result.metadata, "nodes_used"),
                    total_execution_time_ms: field_as_u64(&result.metadata, "total_execution_time_ms"),
                    total_cost: result.metadata.get("total_cost").and_then(|v| v.as_f64()).unwrap_or(0.0),
                    completed_at_ms: field_as_u64(&result.metadata, "completed_at_ms"),
                },
            },
            Err(e) => error_response(&e),
        },
        OrchestratorRequest::ListJobs { user_id, status_filter, limit, offset } => {
            let (jobs, total) = orchestrator.list_jobs(user_id.as_deref(), status_filter, limit, offset).await;
            OrchestratorResponse::JobList {
                jobs: jobs
                    .into_iter()
                    .map(|j| JobSummaryEntry { job_id: j.job_id, state: j.state, pattern: j.pattern, submitted_at_ms: j.submitted_at_ms })
                    .collect(),
                total,
                limit,
                offset,
            }
        }
    }
}

async fn submit_job_response<C: Clock + 'static>(
    orchestrator: &Arc<Orchestrator<C>>,
    user_id: String,
    config_json: serde_json::Value,
    input_data_json: serde_json::Value,
    priority: dim_core::Priority,
    max_cost: Option<f64>,
) -> OrchestratorResponse {
    let config = match serde_json::from_value(config_json) {
        Ok(c) => c,
        Err(e) => {
            return OrchestratorResponse::Error {
                kind: dim_core::ErrorKind::InvalidSpec.to_string(),
                message: format!("malformed pattern config: {e}"),
            }
        }
    };
    let spec = JobSpec {
        job_id: None,
        config,
        input_data: input_data_json,
        priority,
        max_cost,
        metadata: Default::default(),
    };
    match orchestrator.submit_job(spec, user_id).await {
        Ok(job_id) => {
            OrchestratorResponse::JobSubmitted { job_id, status: dim_core::JobState::Queued, estimated_cost: None, estimated_completion_ms: None }
        }
        Err(e) => error_response(&e),
    }
}

fn field_as_u32(metadata: &std::collections::HashMap<String, serde_json::Value>, key: &str) -> u32 {
    metadata.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32
}

fn field_as_u64(metadata: &std::collections::HashMap<String, serde_json::Value>, key: &str) -> u64 {
    metadata.get(key).and_then(|v| v.as_u64()).unwrap_or(0)
}

fn error_response(e: &DimError) -> OrchestratorResponse {
    OrchestratorResponse::Error { kind: e.kind().to_string(), message: e.to_string() }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
