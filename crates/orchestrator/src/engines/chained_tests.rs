// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::daemon_client::DaemonClient;
use crate::model_reputation::ModelReputationTracker;
use crate::registry::NodeRegistry;
use dim_core::{ErrorHandling, FakeClock, NodeId, OnFailure, PipelineStep};
use dim_wire::{read_request, write_response};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Accepts one connection and, for every submitted job, replies "completed"
/// with `transform(prior_input)` as the result — letting tests observe how
/// a step's input propagated from the previous step.
async fn spawn_transform_daemon(transform: impl Fn(&serde_json::Value) -> serde_json::Value + Send + 'static) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut pending_input = Value::Null;
        loop {
            let req: DaemonRequest = match read_request(&mut stream).await {
                Ok(r) => r,
                Err(_) => break,
            };
            let response = match req {
                DaemonRequest::SubmitJob { job_id, input_data_json, .. } => {
                    pending_input = input_data_json.unwrap_or(Value::Null);
                    DaemonResponse::JobSubmitted { job_id, status: "queued".to_string() }
                }
                DaemonRequest::GetJobStatus { job_id } => DaemonResponse::JobStatus {
                    job_id,
                    status: "completed".to_string(),
                    result_json: Some(transform(&pending_input)),
                    error: None,
                    started_at_ms: None,
                    completed_at_ms: None,
                    execution_time_ms: None,
                },
                _ => DaemonResponse::Error { kind: "invalid_request".to_string(), message: "unexpected".to_string() },
            };
            if write_response(&mut stream, &response).await.is_err() {
                break;
            }
        }
    });
    addr
}

/// Always fails the submitted job; used to exercise retry/fail-fast paths.
async fn spawn_failing_daemon(attempts: Arc<AtomicUsize>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        loop {
            let req: DaemonRequest = match read_request(&mut stream).await {
                Ok(r) => r,
                Err(_) => break,
            };
            let response = match req {
                DaemonRequest::SubmitJob { job_id, .. } => {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    DaemonResponse::JobSubmitted { job_id, status: "queued".to_string() }
                }
                DaemonRequest::GetJobStatus { job_id } => DaemonResponse::JobStatus {
                    job_id,
                    status: "failed".to_string(),
                    result_json: None,
                    error: Some("model crashed".to_string()),
                    started_at_ms: None,
                    completed_at_ms: None,
                    execution_time_ms: None,
                },
                _ => DaemonResponse::Error { kind: "invalid_request".to_string(), message: "unexpected".to_string() },
            };
            if write_response(&mut stream, &response).await.is_err() {
                break;
            }
        }
    });
    addr
}

fn make_ctx() -> PatternContext<FakeClock> {
    let clock = FakeClock::new();
    let registry = Arc::new(NodeRegistry::new(clock.clone(), Duration::from_secs(90), Duration::from_millis(0)));
    let client = Arc::new(DaemonClient::new(clock, 4, Duration::from_secs(300)));
    PatternContext::new(client, registry, Arc::new(ModelReputationTracker::new()))
}

fn step(n: u32, node_id: &str, input_source: Option<&str>) -> PipelineStep {
    PipelineStep {
        step: n,
        name: format!("step-{n}"),
        model_id: "llama-3".to_string(),
        node_id: node_id.to_string(),
        input_source: input_source.map(|s| s.to_string()),
        timeout: 5,
    }
}

#[tokio::test]
async fn validate_rejects_out_of_order_steps() {
    let pipeline = vec![step(1, "a", None), step(3, "b", None)];
    let err = validate(&pipeline).unwrap_err();
    assert!(err.to_string().contains("strictly increasing"));
}

#[tokio::test]
async fn validate_rejects_single_step_pipeline() {
    let pipeline = vec![step(1, "a", None)];
    let err = validate(&pipeline).unwrap_err();
    assert!(err.to_string().contains("at least 2 steps"));
}

#[tokio::test]
async fn each_step_consumes_the_previous_steps_output() {
    let ctx = make_ctx();
    let addr_a = spawn_transform_daemon(|v| json!({"doubled": v["n"].as_f64().unwrap_or(0.0) * 2.0})).await;
    let addr_b = spawn_transform_daemon(|v| json!({"doubled": v["doubled"].as_f64().unwrap_or(0.0) * 2.0})).await;
    ctx.registry.set_address_and_tags(NodeId::from_string("node-a"), addr_a, 1.0, Default::default());
    ctx.registry.set_address_and_tags(NodeId::from_string("node-b"), addr_b, 1.0, Default::default());

    let config = dim_core::PatternConfig::Chained {
        pipeline: vec![step(1, "node-a", Some("client_data")), step(2, "node-b", None)],
        error_handling: ErrorHandling::default(),
    };
    let cancel = CancellationToken::new();
    let result = execute(&ctx, &config, &json!({"n": 3.0}), &cancel).await.unwrap();

    assert_eq!(result["output"]["doubled"], 12.0);
    assert_eq!(result["steps_completed"], json!([1, 2]));
}

#[tokio::test]
async fn fail_fast_stops_after_first_failure_without_retry() {
    let ctx = make_ctx();
    let attempts = Arc::new(AtomicUsize::new(0));
    let addr = spawn_failing_daemon(attempts.clone()).await;
    ctx.registry.set_address_and_tags(NodeId::from_string("node-a"), addr, 1.0, Default::default());
    let addr_b = spawn_transform_daemon(|v| v.clone()).await;
    ctx.registry.set_address_and_tags(NodeId::from_string("node-b"), addr_b, 1.0, Default::default());

    let config = dim_core::PatternConfig::Chained {
        pipeline: vec![step(1, "node-a", Some("client_data")), step(2, "node-b", None)],
        error_handling: ErrorHandling { on_failure: OnFailure::FailFast, max_retries: 3 },
    };
    let cancel = CancellationToken::new();
    let err = execute(&ctx, &config, &json!({"n": 1.0}), &cancel).await.unwrap_err();

    assert!(err.to_string().contains("step 1"));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rollback_and_retry_retries_up_to_max_retries_with_original_input() {
    let ctx = make_ctx();
    let attempts = Arc::new(AtomicUsize::new(0));
    let addr = spawn_failing_daemon(attempts.clone()).await;
    ctx.registry.set_address_and_tags(NodeId::from_string("node-a"), addr, 1.0, Default::default());
    let addr_b = spawn_transform_daemon(|v| v.clone()).await;
    ctx.registry.set_address_and_tags(NodeId::from_string("node-b"), addr_b, 1.0, Default::default());

    let config = dim_core::PatternConfig::Chained {
        pipeline: vec![step(1, "node-a", Some("client_data")), step(2, "node-b", None)],
        error_handling: ErrorHandling { on_failure: OnFailure::RollbackAndRetry, max_retries: 2 },
    };
    let cancel = CancellationToken::new();
    let err = execute(&ctx, &config, &json!({"n": 1.0}), &cancel).await.unwrap_err();

    assert!(err.to_string().contains("step 1"));
    // initial attempt + 2 retries
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}
