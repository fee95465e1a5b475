// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent_command::AgentCommandBuilder;
use crate::agent_supervisor::{AgentProcessSpec, AgentSupervisor};
use crate::model_cache::{ModelCache, ModelCacheError, ModelFetcher};
use crate::prewarm::AccessTracker;
use crate::resource_manager::{FixedSampler, ResourceManager};
use async_trait::async_trait;
use dim_core::{FakeClock, JobId, NodeId, Priority};
use dim_net::{Monitoring, RateLimiter};
use dim_objectstore::InMemoryObjectStore;
use dim_wire::{decode, encode, read_message, write_message};
use std::path::Path;

struct StubFetcher;

#[async_trait]
impl ModelFetcher for StubFetcher {
    async fn fetch(&self, _model_id: &str) -> Result<Vec<u8>, ModelCacheError> {
        Ok(b"weights".to_vec())
    }
}

struct ScriptCommandBuilder {
    script: String,
}

impl AgentCommandBuilder for ScriptCommandBuilder {
    fn build(&self, _model_id: &str, _model_path: &Path) -> AgentProcessSpec {
        AgentProcessSpec::new("sh", vec!["-c".to_string(), self.script.clone()])
    }
}

fn make_daemon(script: &str) -> Arc<Daemon<FixedSampler, StubFetcher, FakeClock>> {
    let clock = FakeClock::new();
    let store: Arc<InMemoryObjectStore> = Arc::new(InMemoryObjectStore::new());
    let resource_manager = ResourceManager::new(FixedSampler::new(10.0, 10.0), 4, 90.0);
    let dir = tempfile::tempdir().unwrap();
    let model_cache = ModelCache::new(dir.path(), 1_000_000, StubFetcher, clock.clone());
    let supervisor = AgentSupervisor::with_grace_period(std::time::Duration::from_millis(200));
    let command_builder: Arc<dyn AgentCommandBuilder> =
        Arc::new(ScriptCommandBuilder { script: script.to_string() });
    let rate_limiter = RateLimiter::new(clock.clone(), 1_000_000.0, 1_000_000.0);
    let access_tracker = Arc::new(AccessTracker::new(clock.clone(), std::time::Duration::from_secs(3600)));

    Arc::new(Daemon::new(
        NodeId::new(),
        10,
        resource_manager,
        model_cache,
        supervisor,
        command_builder,
        store,
        rate_limiter,
        Monitoring::new(),
        clock,
        access_tracker,
    ))
}

async fn connect_to(daemon: Arc<Daemon<FixedSampler, StubFetcher, FakeClock>>) -> tokio::net::TcpStream {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ = handle_connection(daemon, stream).await;
    });
    tokio::net::TcpStream::connect(addr).await.unwrap()
}

async fn roundtrip(stream: &mut tokio::net::TcpStream, request: &DaemonRequest) -> DaemonResponse {
    let payload = encode(request).unwrap();
    write_message(stream, &payload).await.unwrap();
    let payload = read_message(stream).await.unwrap();
    decode(&payload).unwrap()
}

#[tokio::test]
async fn submit_then_status_round_trips_over_the_wire() {
    let daemon = make_daemon("echo '{\"output\": 1}'");
    tokio::spawn(daemon.clone().run_dispatcher());
    let mut stream = connect_to(daemon).await;

    let job_id = JobId::new();
    let response = roundtrip(
        &mut stream,
        &DaemonRequest::SubmitJob {
            job_id: job_id.clone(),
            model_id: "m1".to_string(),
            data_source: None,
            input_data_json: None,
            timeout: 5,
            priority: Priority::Normal,
        },
    )
    .await;
    assert!(matches!(response, DaemonResponse::JobSubmitted { .. }));

    for _ in 0..100 {
        let response = roundtrip(&mut stream, &DaemonRequest::GetJobStatus { job_id: job_id.clone() }).await;
        if let DaemonResponse::JobStatus { status, .. } = &response {
            if status == "completed" {
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("job never completed over the wire");
}

#[tokio::test]
async fn get_health_reports_node_id() {
    let daemon = make_daemon("echo '{}'");
    let node_id = daemon.node_id.clone();
    let mut stream = connect_to(daemon).await;

    let response = roundtrip(&mut stream, &DaemonRequest::GetHealth).await;
    match response {
        DaemonResponse::Health { node_id: reported, .. } => assert_eq!(reported, node_id.to_string()),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn unknown_job_status_reports_error() {
    let daemon = make_daemon("echo '{}'");
    let mut stream = connect_to(daemon).await;

    let response = roundtrip(&mut stream, &DaemonRequest::GetJobStatus { job_id: JobId::new() }).await;
    assert!(matches!(response, DaemonResponse::Error { .. }));
}
