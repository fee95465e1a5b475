// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn successful_process_returns_stdout() {
    let supervisor = AgentSupervisor::new();
    let spec = AgentProcessSpec::new("cat", vec![]);
    let result = supervisor.run(&spec, b"hello", Duration::from_secs(5)).await.unwrap();
    assert_eq!(result, b"hello");
}

#[tokio::test]
async fn nonzero_exit_reports_crashed() {
    let supervisor = AgentSupervisor::new();
    let spec = AgentProcessSpec::new("sh", vec!["-c".to_string(), "exit 7".to_string()]);
    let err = supervisor.run(&spec, b"", Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, AgentError::Crashed(_)));
}

#[tokio::test]
async fn nonzero_exit_with_json_stdout_returns_the_payload() {
    let supervisor = AgentSupervisor::new();
    let spec = AgentProcessSpec::new("sh", vec!["-c".to_string(), "echo '{\"error\": \"bad input\"}'; exit 3".to_string()]);
    let result = supervisor.run(&spec, b"", Duration::from_secs(5)).await.unwrap();
    assert_eq!(result, br#"{"error": "bad input"}"#);
}

#[tokio::test]
async fn nonzero_exit_with_unparseable_stdout_reports_crashed() {
    let supervisor = AgentSupervisor::new();
    let spec = AgentProcessSpec::new("sh", vec!["-c".to_string(), "echo 'not json'; exit 3".to_string()]);
    let err = supervisor.run(&spec, b"", Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, AgentError::Crashed(_)));
}

#[tokio::test]
async fn unknown_program_reports_spawn_error() {
    let supervisor = AgentSupervisor::new();
    let spec = AgentProcessSpec::new("definitely-not-a-real-binary-xyz", vec![]);
    let err = supervisor.run(&spec, b"", Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, AgentError::Spawn(_)));
}

#[tokio::test]
async fn timeout_kills_child_and_returns_within_timeout_plus_grace() {
    let supervisor = AgentSupervisor::with_grace_period(Duration::from_millis(200));
    let spec = AgentProcessSpec::new("sh", vec!["-c".to_string(), "sleep 10".to_string()]);

    let start = Instant::now();
    let err = supervisor.run(&spec, b"", Duration::from_millis(100)).await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, AgentError::Timeout));
    assert!(elapsed < Duration::from_secs(2), "took too long: {elapsed:?}");
}

#[tokio::test]
async fn ignores_sigterm_child_is_sigkilled_after_grace() {
    let supervisor = AgentSupervisor::with_grace_period(Duration::from_millis(200));
    let spec = AgentProcessSpec::new("sh", vec!["-c".to_string(), "trap '' TERM; sleep 10".to_string()]);

    let start = Instant::now();
    let err = supervisor.run(&spec, b"", Duration::from_millis(100)).await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, AgentError::Timeout));
    assert!(elapsed < Duration::from_secs(2), "took too long: {elapsed:?}");
}

#[tokio::test]
async fn external_cancellation_kills_child() {
    let supervisor = AgentSupervisor::with_grace_period(Duration::from_millis(200));
    let spec = AgentProcessSpec::new("sh", vec!["-c".to_string(), "sleep 10".to_string()]);
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel_clone.cancel();
    });

    let start = Instant::now();
    let err = supervisor.run_cancellable(&spec, b"", Duration::from_secs(30), &cancel).await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, AgentError::Cancelled));
    assert!(elapsed < Duration::from_secs(2), "took too long: {elapsed:?}");
}
