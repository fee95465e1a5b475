use super::*;
use dim_core::{JobId, JobState, Pattern};
use dim_wire::{read_request, write_response, OrchestratorResponse};
use serde_json::json;
use tokio::net::TcpListener;

async fn spawn_stub(respond: impl Fn(OrchestratorRequest) -> OrchestratorResponse + Send + 'static) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request: OrchestratorRequest = read_request(&mut stream).await.unwrap();
        let response = respond(request);
        write_response(&mut stream, &response).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn submit_job_returns_job_id_and_state() {
    let addr = spawn_stub(|_req| OrchestratorResponse::JobSubmitted {
        job_id: JobId::from_string("job-1"),
        status: JobState::Queued,
        estimated_cost: None,
        estimated_completion_ms: None,
    })
    .await;

    let client = OrchestratorClient::new(addr);
    let config = json!({"pattern": "collaborative"});
    let (job_id, state) = client
        .submit_job(
            "alice".to_string(),
            Pattern::Collaborative,
            config,
            json!({}),
            dim_core::Priority::Normal,
            None,
        )
        .await
        .unwrap();
    assert_eq!(job_id, JobId::from_string("job-1"));
    assert_eq!(state, JobState::Queued);
}

#[tokio::test]
async fn server_error_surfaces_as_client_error() {
    let addr =
        spawn_stub(|_req| OrchestratorResponse::Error { kind: "invalid_spec".to_string(), message: "bad spec".to_string() })
            .await;

    let client = OrchestratorClient::new(addr);
    let err = client.get_job_status(JobId::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Server { .. }));
}

#[tokio::test]
async fn unexpected_response_is_rejected() {
    let addr = spawn_stub(|_req| OrchestratorResponse::CancelResult { success: true, message: "ok".to_string() }).await;

    let client = OrchestratorClient::new(addr);
    let err = client.get_job_status(JobId::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Unexpected(_)));
}

#[tokio::test]
async fn cancel_job_round_trips() {
    let addr =
        spawn_stub(|_req| OrchestratorResponse::CancelResult { success: true, message: "cancelled".to_string() }).await;

    let client = OrchestratorClient::new(addr);
    let (success, message) = client.cancel_job(JobId::new(), "alice".to_string()).await.unwrap();
    assert!(success);
    assert_eq!(message, "cancelled");
}

#[tokio::test]
async fn list_jobs_round_trips() {
    let job_id = JobId::from_string("job-2");
    let addr = spawn_stub(move |_req| OrchestratorResponse::JobList {
        jobs: vec![dim_wire::JobSummaryEntry { job_id, state: JobState::Running, pattern: Pattern::Comparative, submitted_at_ms: 10 }],
        total: 1,
        limit: 50,
        offset: 0,
    })
    .await;

    let client = OrchestratorClient::new(addr);
    let (jobs, total) = client.list_jobs(None, None, 50, 0).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(jobs[0].job_id, job_id);
}
