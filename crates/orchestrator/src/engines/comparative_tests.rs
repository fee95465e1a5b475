// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::daemon_client::DaemonClient;
use crate::model_reputation::ModelReputationTracker;
use crate::registry::NodeRegistry;
use dim_core::{FakeClock, NodeId};
use dim_wire::{read_request, write_response};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Accepts one connection and replies to every request in sequence with a
/// value from `outputs`, keyed by the submitted model_id.
async fn spawn_stub_daemon(outputs: Vec<(String, serde_json::Value)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut pending_model = String::new();
        loop {
            let req: DaemonRequest = match read_request(&mut stream).await {
                Ok(r) => r,
                Err(_) => break,
            };
            let response = match req {
                DaemonRequest::SubmitJob { job_id, model_id, .. } => {
                    pending_model = model_id;
                    DaemonResponse::JobSubmitted { job_id, status: "queued".to_string() }
                }
                DaemonRequest::GetJobStatus { job_id } => {
                    let value = outputs
                        .iter()
                        .find(|(m, _)| *m == pending_model)
                        .map(|(_, v)| v.clone())
                        .unwrap_or(Value::Null);
                    DaemonResponse::JobStatus {
                        job_id,
                        status: "completed".to_string(),
                        result_json: Some(value),
                        error: None,
                        started_at_ms: None,
                        completed_at_ms: None,
                        execution_time_ms: None,
                    }
                }
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

#[tokio::test]
async fn comparative_reaches_majority_consensus_across_models() {
    let ctx = make_ctx();
    let addr = spawn_stub_daemon(vec![
        ("model-a".to_string(), json!("cat")),
        ("model-b".to_string(), json!("cat")),
        ("model-c".to_string(), json!("dog")),
    ])
    .await;
    ctx.registry.set_address_and_tags(NodeId::from_string("node-a"), addr, 1.0, Default::default());

    let config = dim_core::PatternConfig::Comparative {
        model_ids: vec!["model-a".to_string(), "model-b".to_string(), "model-c".to_string()],
        node_id: "node-a".to_string(),
        consensus: dim_core::ConsensusConfig { method: dim_core::ConsensusMethod::MajorityVote, min_agreement: 0.5 },
        data_source: None,
        timeout: 5,
    };
    let cancel = CancellationToken::new();
    let result = comparative::execute(&ctx, &config, &json!({}), &cancel).await.unwrap();

    assert_eq!(result["consensus_output"], json!("cat"));
    assert_eq!(result["fallback_to_expert_review"], false);
}

#[tokio::test]
async fn comparative_requires_at_least_two_models() {
    let ctx = make_ctx();
    let config = dim_core::PatternConfig::Comparative {
        model_ids: vec!["model-a".to_string()],
        node_id: "node-a".to_string(),
        consensus: dim_core::ConsensusConfig { method: dim_core::ConsensusMethod::MajorityVote, min_agreement: 0.5 },
        data_source: None,
        timeout: 5,
    };
    let cancel = CancellationToken::new();
    let err = comparative::execute(&ctx, &config, &json!({}), &cancel).await.unwrap_err();
    assert!(err.to_string().contains("at least 2 model_ids"));
}

#[tokio::test]
async fn comparative_falls_back_to_expert_review_below_min_agreement() {
    let ctx = make_ctx();
    let addr = spawn_stub_daemon(vec![
        ("model-a".to_string(), json!("cat")),
        ("model-b".to_string(), json!("dog")),
        ("model-c".to_string(), json!("bird")),
    ])
    .await;
    ctx.registry.set_address_and_tags(NodeId::from_string("node-a"), addr, 1.0, Default::default());

    let config = dim_core::PatternConfig::Comparative {
        model_ids: vec!["model-a".to_string(), "model-b".to_string(), "model-c".to_string()],
        node_id: "node-a".to_string(),
        consensus: dim_core::ConsensusConfig { method: dim_core::ConsensusMethod::MajorityVote, min_agreement: 0.75 },
        data_source: None,
        timeout: 5,
    };
    let cancel = CancellationToken::new();
    let result = comparative::execute(&ctx, &config, &json!({}), &cancel).await.unwrap();

    assert_eq!(result["fallback_to_expert_review"], true);
}
