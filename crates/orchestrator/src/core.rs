// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator's job-dispatch core: admission, pattern-engine
//! execution, and the status/result surface clients poll.

use crate::coordinator::OrchestratorCoordinator;
use crate::daemon_client::DaemonClient;
use crate::engines::{self, PatternContext};
use crate::model_reputation::ModelReputationTracker;
use crate::registry::NodeRegistry;
use dim_core::{
    Clock, DimError, DimResult, JobId, JobResult, JobSpec, JobState, JobStatus, OrchestratorId,
    Pattern, Progress,
};
use dim_net::{Monitoring, RateLimiter};
use dim_objectstore::topics::{JobEventType, JobUpdateEvent};
use dim_objectstore::ObjectStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

struct JobRecord {
    user_id: String,
    pattern: Pattern,
    state: JobState,
    error: Option<String>,
    result: Option<serde_json::Value>,
    submitted_at_ms: u64,
    started_at_ms: Option<u64>,
    completed_at_ms: Option<u64>,
    updated_at_ms: u64,
    cancel: CancellationToken,
    delegated_to: Option<OrchestratorId>,
}

/// Summary row returned by `list_jobs`.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub job_id: JobId,
    pub state: JobState,
    pub pattern: Pattern,
    pub submitted_at_ms: u64,
}

/// Dispatches submitted job specs across the node mesh via the pattern
/// engines, tracking lifecycle state for polling clients.
pub struct Orchestrator<C: Clock> {
    pub orchestrator_id: OrchestratorId,
    max_concurrent_jobs: u32,
    registry: Arc<NodeRegistry<C>>,
    daemon_client: Arc<DaemonClient<C>>,
    coordinator: Arc<OrchestratorCoordinator<C>>,
    store: Arc<dyn ObjectStore>,
    rate_limiter: RateLimiter<C>,
    monitoring: Monitoring,
    clock: C,
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    active_job_gauge: AtomicU32,
    model_reputation: Arc<ModelReputationTracker>,
}

impl<C: Clock> Orchestrator<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        orchestrator_id: OrchestratorId,
        max_concurrent_jobs: u32,
        registry: Arc<NodeRegistry<C>>,
        daemon_client: Arc<DaemonClient<C>>,
        coordinator: Arc<OrchestratorCoordinator<C>>,
        store: Arc<dyn ObjectStore>,
        rate_limiter: RateLimiter<C>,
        monitoring: Monitoring,
        clock: C,
    ) -> Self {
        Self {
            orchestrator_id,
            max_concurrent_jobs,
            registry,
            daemon_client,
            coordinator,
            store,
            rate_limiter,
            monitoring,
            clock,
            jobs: Mutex::new(HashMap::new()),
            active_job_gauge: AtomicU32::new(0),
            model_reputation: Arc::new(ModelReputationTracker::new()),
        }
    }

    async fn active_job_count(&self) -> u32 {
        self.jobs.lock().await.values().filter(|r| !r.state.is_terminal()).count() as u32
    }

    /// Cheap, lock-free snapshot of the active-job count, kept in step with
    /// the authoritative `jobs` map by every state transition below. Meant
    /// for the heartbeat loop, which needs a plain `Fn() -> u32`.
    pub fn active_job_count_sync(&self) -> u32 {
        self.active_job_gauge.load(Ordering::Relaxed)
    }

    pub async fn cancel_job(&self, job_id: &JobId, user_id: &str) -> DimResult<bool> {
        let mut jobs = self.jobs.lock().await;
        let Some(record) = jobs.get_mut(job_id) else { return Ok(false) };
        if record.user_id != user_id {
            return Err(DimError::InvalidSpec("job does not belong to this user".to_string()));
        }
        if record.state.is_terminal() {
            return Ok(false);
        }
        record.cancel.cancel();
        record.state = JobState::Cancelled;
        let ran_locally = record.delegated_to.is_none();
        let now_ms = self.clock.epoch_ms();
        record.completed_at_ms = Some(now_ms);
        record.updated_at_ms = now_ms;
        if ran_locally {
            self.active_job_gauge.fetch_sub(1, Ordering::Relaxed);
        }
        Ok(true)
    }

    pub async fn get_job_status(&self, job_id: &JobId) -> Option<JobStatus> {
        let jobs = self.jobs.lock().await;
        let record = jobs.get(job_id)?;
        Some(JobStatus {
            job_id: *job_id,
            state: record.state,
            progress: Progress::default(),
            subjobs: Vec::new(),
            error: record.error.clone(),
            submitted_at_ms: record.submitted_at_ms,
            updated_at_ms: record.updated_at_ms,
        })
    }

    pub async fn get_job_result(&self, job_id: &JobId) -> DimResult<JobResult> {
        let jobs = self.jobs.lock().await;
        let record = jobs
            .get(job_id)
            .ok_or_else(|| DimError::InvalidSpec(format!("unknown job: {job_id}")))?;
        if record.state != JobState::Completed {
            return Err(DimError::InvalidSpec(format!("job {job_id} has not completed (state: {})", record.state)));
        }
        let output = record.result.clone().unwrap_or(serde_json::Value::Null);
        let nodes_used = output
            .get("nodes_used")
            .and_then(|v| v.as_array())
            .map(|a| a.len() as u32)
            .unwrap_or(0);
        let total_execution_time_ms = match (record.started_at_ms, record.completed_at_ms) {
            (Some(s), Some(c)) => c.saturating_sub(s),
            _ => 0,
        };
        let mut metadata = HashMap::new();
        metadata.insert("nodes_used".to_string(), serde_json::json!(nodes_used));
        metadata.insert("total_execution_time_ms".to_string(), serde_json::json!(total_execution_time_ms));
        metadata.insert("total_cost".to_string(), serde_json::json!(0.0));
        metadata.insert("completed_at_ms".to_string(), serde_json::json!(record.completed_at_ms.unwrap_or(0)));
        Ok(JobResult { job_id: *job_id, output, metadata })
    }

    pub async fn list_jobs(&self, user_id: Option<&str>, status_filter: Option<JobState>, limit: u32, offset: u32) -> (Vec<JobSummary>, u32) {
        let jobs = self.jobs.lock().await;
        let mut matching: Vec<_> = jobs
            .iter()
            .filter(|(_, r)| user_id.map_or(true, |u| r.user_id == u))
            .filter(|(_, r)| status_filter.map_or(true, |s| r.state == s))
            .map(|(job_id, r)| JobSummary { job_id: *job_id, state: r.state, pattern: r.pattern, submitted_at_ms: r.submitted_at_ms })
            .collect();
        matching.sort_by_key(|j| j.submitted_at_ms);
        let total = matching.len() as u32;
        let page = matching.into_iter().skip(offset as usize).take(limit as usize).collect();
        (page, total)
    }

    /// Validate, admit, and either hand off to a peer or spawn local
    /// execution of a submitted job spec.
    pub async fn submit_job(self: &Arc<Self>, spec: JobSpec, user_id: String) -> DimResult<JobId> {
        let check = self.rate_limiter.check(&user_id, 1.0);
        if !check.allowed {
            return Err(DimError::RateLimitExceeded { retry_after_secs: check.retry_after_seconds });
        }

        engines::validate_spec(&spec.config)?;

        let active_jobs = self.active_job_count().await;
        if active_jobs >= self.max_concurrent_jobs {
            return Err(DimError::InsufficientResources(format!(
                "orchestrator at capacity ({active_jobs}/{})",
                self.max_concurrent_jobs
            )));
        }

        let job_id = spec.job_id.unwrap_or_else(JobId::new);
        let submitted_at_ms = self.clock.epoch_ms();
        let pattern = spec.pattern();

        let spec_bytes = serde_json::to_vec(&spec).map_err(|e| DimError::internal(e.to_string()))?;
        self.store.put(spec_bytes).await.map_err(|e| DimError::internal(e.to_string()))?;

        let spec_json = serde_json::to_value(&spec).map_err(|e| DimError::internal(e.to_string()))?;
        let delegated_to = self.coordinator.select_orchestrator_for_job(active_jobs, job_id, spec_json).await?;

        let record = JobRecord {
            user_id,
            pattern,
            state: JobState::Queued,
            error: None,
            result: None,
            submitted_at_ms,
            started_at_ms: None,
            completed_at_ms: None,
            updated_at_ms: submitted_at_ms,
            cancel: CancellationToken::new(),
            delegated_to,
        };
        self.jobs.lock().await.insert(job_id, record);
        self.monitoring.increment("orchestrator.jobs.submitted", &Default::default(), 1);

        if delegated_to.is_none() {
            self.active_job_gauge.fetch_add(1, Ordering::Relaxed);
            let this = self.clone();
            tokio::spawn(async move { this.execute(job_id, spec).await });
        }

        Ok(job_id)
    }

    async fn execute(self: Arc<Self>, job_id: JobId, spec: JobSpec) {
        let (cancel, started_ms) = {
            let mut jobs = self.jobs.lock().await;
            let Some(record) = jobs.get_mut(&job_id) else { return };
            if record.state == JobState::Cancelled {
                return;
            }
            let started_ms = self.clock.epoch_ms();
            record.state = JobState::Running;
            record.started_at_ms = Some(started_ms);
            record.updated_at_ms = started_ms;
            (record.cancel.clone(), started_ms)
        };

        let ctx = PatternContext::new(self.daemon_client.clone(), self.registry.clone(), self.model_reputation.clone());
        let outcome = engines::execute_pattern(&ctx, &spec.config, &spec.input_data, &cancel).await;

        let completed_ms = self.clock.epoch_ms();
        let mut jobs = self.jobs.lock().await;
        let Some(record) = jobs.get_mut(&job_id) else { return };
        if record.state == JobState::Cancelled {
            return;
        }
        record.completed_at_ms = Some(completed_ms);
        record.updated_at_ms = completed_ms;

        let event = match outcome {
            Ok(value) => {
                record.state = JobState::Completed;
                record.result = Some(value.clone());
                self.build_update_event(job_id, JobEventType::Completed, Some(value), None)
            }
            Err(e) => {
                record.state = JobState::Failed;
                record.error = Some(e.to_string());
                self.build_update_event(job_id, JobEventType::Failed, None, Some(e.to_string()))
            }
        };
        drop(jobs);
        self.active_job_gauge.fetch_sub(1, Ordering::Relaxed);
        let _ = started_ms;
        self.publish_job_event(event).await;
    }

    fn build_update_event(
        &self,
        job_id: JobId,
        event_type: JobEventType,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> JobUpdateEvent {
        JobUpdateEvent { job_id, event_type, node_id: None, result, error, timestamp: self.clock.epoch_ms() }
    }

    async fn publish_job_event(&self, event: JobUpdateEvent) {
        if let Ok(bytes) = serde_json::to_vec(&event) {
            let _ = self.store.publish(dim_objectstore::topics::JOBS_UPDATES, bytes).await;
        }
    }

    /// Run a job handed to this orchestrator by a peer (via the
    /// coordinator), bypassing admission checks already done upstream.
    pub async fn run_delegated_assignment(self: Arc<Self>, job_id: JobId, job_spec: serde_json::Value) {
        let spec: JobSpec = match serde_json::from_value(job_spec) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(%job_id, error = %e, "dropping malformed delegated job spec");
                return;
            }
        };
        let record = JobRecord {
            user_id: String::new(),
            pattern: spec.pattern(),
            state: JobState::Queued,
            error: None,
            result: None,
            submitted_at_ms: self.clock.epoch_ms(),
            started_at_ms: None,
            completed_at_ms: None,
            updated_at_ms: self.clock.epoch_ms(),
            cancel: CancellationToken::new(),
            delegated_to: None,
        };
        self.jobs.lock().await.insert(job_id, record);
        self.active_job_gauge.fetch_add(1, Ordering::Relaxed);
        self.execute(job_id, spec).await;
    }
}

#[cfg(test)]
#[path = "core_tests.rs"]
mod tests;
