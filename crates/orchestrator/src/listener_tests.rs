// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::coordinator::OrchestratorCoordinator;
use crate::daemon_client::DaemonClient;
use crate::registry::NodeRegistry;
use dim_core::{FakeClock, NodeId, OrchestratorId, Pattern, Priority};
use dim_net::{Monitoring, RateLimiter};
use dim_objectstore::InMemoryObjectStore;
use dim_wire::{decode, encode, read_message, read_request, write_response, DaemonRequest, DaemonResponse};
use serde_json::json;
use std::time::Duration;
use tokio::net::TcpListener as StdTcpListener;

async fn spawn_stub_daemon(output: serde_json::Value) -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").await.unwrap();
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
                    DaemonResponse::JobSubmitted { job_id, status: "queued".to_string() }
                }
                DaemonRequest::GetJobStatus { job_id } => DaemonResponse::JobStatus {
                    job_id,
                    status: "completed".to_string(),
                    result_json: Some(json!({"output": output.clone(), "nodes_used": ["node-a", "node-b"]})),
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

fn make_orchestrator() -> Arc<Orchestrator<FakeClock>> {
    let clock = FakeClock::new();
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
    let registry = Arc::new(NodeRegistry::new(clock.clone(), Duration::from_secs(90), Duration::from_millis(0)));
    let daemon_client = Arc::new(DaemonClient::new(clock.clone(), 4, Duration::from_secs(300)));
    let coordinator = Arc::new(OrchestratorCoordinator::new(
        store.clone(),
        OrchestratorId::new(),
        clock.clone(),
        Duration::from_secs(30),
        Duration::from_secs(90),
        50,
    ));
    let rate_limiter = RateLimiter::new(clock.clone(), 1_000_000.0, 1_000_000.0);
    Arc::new(Orchestrator::new(
        OrchestratorId::new(),
        100,
        registry,
        daemon_client,
        coordinator,
        store,
        rate_limiter,
        Monitoring::new(),
        clock,
    ))
}

async fn connect_to(orchestrator: Arc<Orchestrator<FakeClock>>) -> tokio::net::TcpStream {
    let listener = StdTcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ = handle_connection(orchestrator, stream).await;
    });
    tokio::net::TcpStream::connect(addr).await.unwrap()
}

async fn roundtrip(stream: &mut tokio::net::TcpStream, request: &OrchestratorRequest) -> OrchestratorResponse {
    let payload = encode(request).unwrap();
    write_message(stream, &payload).await.unwrap();
    let payload = read_message(stream).await.unwrap();
    decode(&payload).unwrap()
}

#[tokio::test]
async fn submit_then_status_round_trips_over_the_wire() {
    let orchestrator = make_orchestrator();
    let addr = spawn_stub_daemon(json!({"answer": 1})).await;
    orchestrator.registry.set_address_and_tags(NodeId::from_string("node-a"), addr.clone(), 1.0, Default::default());
    orchestrator.registry.set_address_and_tags(NodeId::from_string("node-b"), addr, 1.0, Default::default());

    let mut stream = connect_to(orchestrator).await;

    let config = serde_json::to_value(dim_core::PatternConfig::Collaborative {
        model_id: "llama-3".to_string(),
        nodes: vec!["node-a".to_string(), "node-b".to_string()],
        aggregation: dim_core::AggregationConfig { method: dim_core::AggregationMethod::Median },
        data_requirements: Default::default(),
        timeout: 5,
    })
    .unwrap();

    let response = roundtrip(
        &mut stream,
        &OrchestratorRequest::SubmitJob {
            user_id: "u1".to_string(),
            pattern: Pattern::Collaborative,
            config_json: config,
            input_data_json: json!({"prompt": "hi"}),
            priority: Priority::Normal,
            max_cost: None,
        },
    )
    .await;
    let job_id = match response {
        OrchestratorResponse::JobSubmitted { job_id, .. } => job_id,
        other => panic!("unexpected response: {other:?}"),
    };

    for _ in 0..100 {
        let response = roundtrip(&mut stream, &OrchestratorRequest::GetJobStatus { job_id: job_id.clone() }).await;
        if let OrchestratorResponse::JobStatus(status) = &response {
            if status.state == dim_core::JobState::Completed {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job never completed over the wire");
}

#[tokio::test]
async fn unknown_job_status_reports_error() {
    let orchestrator = make_orchestrator();
    let mut stream = connect_to(orchestrator).await;

    let response = roundtrip(&mut stream, &OrchestratorRequest::GetJobStatus { job_id: JobId::new() }).await;
    assert!(matches!(response, OrchestratorResponse::Error { .. }));
}

#[tokio::test]
async fn malformed_pattern_config_reports_error() {
    let orchestrator = make_orchestrator();
    let mut stream = connect_to(orchestrator).await;

    let response = roundtrip(
        &mut stream,
        &OrchestratorRequest::SubmitJob {
            user_id: "u1".to_string(),
            pattern: Pattern::Collaborative,
            config_json: json!({"not": "a valid pattern config"}),
            input_data_json: json!({}),
            priority: Priority::Normal,
            max_cost: None,
        },
    )
    .await;
    assert!(matches!(response, OrchestratorResponse::Error { .. }));
}
