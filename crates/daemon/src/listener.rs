// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP front end for the daemon RPC surface: one framed request per
//! round-trip, dispatched to the [`crate::core::Daemon`] core.

use crate::core::Daemon;
use crate::model_cache::ModelFetcher;
use crate::resource_manager::ResourceSampler;
use dim_core::{Clock, DimError};
use dim_wire::{read_request, write_response, DaemonRequest, DaemonResponse, DaemonStats, HealthResources, RateLimitStatus};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

pub async fn serve<S, F, C>(daemon: Arc<Daemon<S, F, C>>, bind_address: &str) -> std::io::Result<()>
where
    S: ResourceSampler + 'static,
    F: ModelFetcher + 'static,
    C: Clock,
{
    let listener = TcpListener::bind(bind_address).await?;
    tracing::info!(bind_address, "daemon RPC listener started");
    loop {
        let (stream, peer) = listener.accept().await?;
        let daemon = daemon.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(daemon, stream).await {
                tracing::warn!(%peer, error = %e, "daemon connection closed with error");
            }
        });
    }
}

async fn handle_connection<S, F, C>(daemon: Arc<Daemon<S, F, C>>, mut stream: TcpStream) -> std::io::Result<()>
where
    S: ResourceSampler + 'static,
    F: ModelFetcher + 'static,
    C: Clock,
{
    loop {
        let request: DaemonRequest = match read_request(&mut stream).await {
            Ok(req) => req,
            Err(_) => return Ok(()),
        };
        let response = dispatch(&daemon, request).await;
        write_response(&mut stream, &response).await.map_err(std::io::Error::other)?;
    }
}

async fn dispatch<S, F, C>(daemon: &Daemon<S, F, C>, request: DaemonRequest) -> DaemonResponse
where
    S: ResourceSampler + 'static,
    F: ModelFetcher + 'static,
    C: Clock,
{
    match request {
        DaemonRequest::SubmitJob { job_id, model_id, data_source, input_data_json, timeout, priority } => {
            match daemon.submit_job(job_id.clone(), model_id, data_source, input_data_json, timeout, priority).await {
                Ok(()) => DaemonResponse::JobSubmitted { job_id, status: "queued".to_string() },
                Err(e) => error_response(&e),
            }
        }
        DaemonRequest::GetJobStatus { job_id } => match daemon.get_job_status(&job_id).await {
            Some(status) => DaemonResponse::JobStatus {
                job_id,
                status: status.state.to_string(),
                result_json: status.result,
                error: status.error,
                started_at_ms: status.started_at_ms,
                completed_at_ms: status.completed_at_ms,
                execution_time_ms: status.execution_time_ms,
            },
            None => DaemonResponse::Error {
                kind: dim_core::ErrorKind::InvalidSpec.to_string(),
                message: format!("unknown job: {job_id}"),
            },
        },
        DaemonRequest::CancelJob { job_id } => {
            let success = daemon.cancel_job(&job_id).await;
            DaemonResponse::CancelResult {
                success,
                message: if success { "cancelled".to_string() } else { "job not cancellable".to_string() },
            }
        }
        DaemonRequest::GetHealth => health_response(daemon).await,
        DaemonRequest::GetStats => stats_response(daemon),
    }
}

async fn health_response<S, F, C>(daemon: &Daemon<S, F, C>) -> DaemonResponse
where
    S: ResourceSampler + 'static,
    F: ModelFetcher + 'static,
    C: Clock,
{
    let health = daemon.health().await;
    DaemonResponse::Health {
        status: health.healthy,
        node_id: daemon.node_id.to_string(),
        resources: HealthResources {
            cpu_available: health.cpu_percent < 100.0,
            cpu_count: health.cpu_count,
            memory_available_gb: health.memory_available_gb,
            memory_used_gb: health.memory_used_gb,
            gpu_available: false,
            cpu_percent: health.cpu_percent,
            memory_percent: health.memory_percent,
        },
        cached_models: health.cached_models,
        active_jobs: health.active_jobs,
        queued_jobs: health.queued_jobs,
    }
}

fn stats_response<S, F, C>(daemon: &Daemon<S, F, C>) -> DaemonResponse
where
    S: ResourceSampler + 'static,
    F: ModelFetcher + 'static,
    C: Clock,
{
    let stats = daemon.stats();
    DaemonResponse::Stats(DaemonStats {
        node_id: daemon.node_id.to_string(),
        total_jobs: stats.total_jobs,
        successful_jobs: stats.successful_jobs,
        failed_jobs: stats.failed_jobs,
        avg_execution_time_ms: stats.avg_execution_time_ms,
        cached_models_count: stats.cached_models_count,
        cache_size_bytes: stats.cache_size_bytes,
        resources: HealthResources {
            cpu_available: stats.cpu_percent < 100.0,
            cpu_count: stats.cpu_count,
            memory_available_gb: stats.memory_available_gb,
            memory_used_gb: stats.memory_used_gb,
            gpu_available: false,
            cpu_percent: stats.cpu_percent,
            memory_percent: stats.memory_percent,
        },
        rate_limit: RateLimitStatus {
            tokens_available: stats.rate_limit.tokens_available,
            burst_size: stats.rate_limit.burst_size,
            rate_per_minute: stats.rate_limit.rate_per_minute,
        },
    })
}

fn error_response(e: &DimError) -> DaemonResponse {
    DaemonResponse::Error { kind: e.kind().to_string(), message: e.to_string() }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
