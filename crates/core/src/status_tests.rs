// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::job::JobId;

#[test]
fn terminal_states_are_exhaustive() {
    assert!(JobState::Completed.is_terminal());
    assert!(JobState::Failed.is_terminal());
    assert!(JobState::Cancelled.is_terminal());
    assert!(!JobState::Queued.is_terminal());
    assert!(!JobState::Running.is_terminal());
}

#[test]
fn progress_fraction_handles_zero_total() {
    let p = Progress::default();
    assert_eq!(p.fraction(), 0.0);
}

#[test]
fn progress_fraction_computes_ratio() {
    let p = Progress { completed: 1, total: 4 };
    assert_eq!(p.fraction(), 0.25);
}

#[test]
fn job_status_round_trips_through_json() {
    let status = JobStatus {
        job_id: JobId::new(),
        state: JobState::Running,
        progress: Progress { completed: 2, total: 3 },
        subjobs: vec![SubjobStatus { label: "node-a".into(), state: JobState::Completed, error: None }],
        error: None,
        submitted_at_ms: 1000,
        updated_at_ms: 2000,
    };
    let json = serde_json::to_string(&status).unwrap();
    let back: JobStatus = serde_json::from_str(&json).unwrap();
    assert_eq!(back.job_id, status.job_id);
    assert_eq!(back.subjobs.len(), 1);
}
