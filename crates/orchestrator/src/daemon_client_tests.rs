// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dim_core::{FakeClock, JobId};
use dim_wire::{read_request, write_response};
use tokio::net::TcpListener;

async fn spawn_stub_daemon(response: DaemonResponse) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _req: DaemonRequest = read_request(&mut stream).await.unwrap();
        write_response(&mut stream, &response).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn call_round_trips_and_returns_connection_to_pool() {
    let job_id = JobId::new();
    let addr = spawn_stub_daemon(DaemonResponse::JobSubmitted { job_id, status: "queued".to_string() }).await;

    let client = DaemonClient::new(FakeClock::new(), 4, Duration::from_secs(300));
    let response = client
        .call(&addr, DaemonRequest::SubmitJob {
            job_id,
            model_id: "llama-3".to_string(),
            data_source: None,
            input_data_json: None,
            timeout: 30,
            priority: dim_core::Priority::Normal,
        })
        .await
        .unwrap();

    match response {
        DaemonResponse::JobSubmitted { status, .. } => assert_eq!(status, "queued"),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn connect_failure_surfaces_as_connect_error() {
    let client = DaemonClient::new(FakeClock::new(), 4, Duration::from_secs(300));
    let result = client.call("127.0.0.1:1", DaemonRequest::GetHealth).await;
    assert!(matches!(result, Err(DaemonClientError::Connect { .. })));
}
