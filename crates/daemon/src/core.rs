// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's job-execution core: tying the queue, resource manager,
//! model cache, and agent supervisor into one dispatch loop.

use crate::agent_command::AgentCommandBuilder;
use crate::agent_supervisor::{AgentError, AgentSupervisor};
use crate::job_queue::TrackedJobQueue;
use crate::model_cache::{ModelCache, ModelCacheError, ModelFetcher};
use crate::prewarm::AccessTracker;
use crate::resource_manager::{ResourceManager, ResourceSampler};
use dim_core::{Clock, DimError, DimResult, JobId, JobState, NodeId, Priority};
use dim_net::{Monitoring, RateLimiter};
use dim_objectstore::topics::{JobEventType, JobUpdateEvent, NodeHeartbeatEvent, ResultReadyEvent};
use dim_objectstore::{Cid, ObjectStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One queued unit of work: a job submitted to `SubmitJob`, waiting for
/// dispatch. Equality is by `job_id` only, so a cancel can locate and remove
/// a still-queued entry without reconstructing it exactly.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job_id: JobId,
    pub model_id: String,
    pub data_source: Option<String>,
    pub input_data: serde_json::Value,
    pub timeout_secs: u64,
    pub priority: Priority,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.job_id == other.job_id
    }
}

impl QueuedJob {
    fn marker(job_id: JobId) -> Self {
        Self {
            job_id,
            model_id: String::new(),
            data_source: None,
            input_data: serde_json::Value::Null,
            timeout_secs: 0,
            priority: Priority::Normal,
        }
    }
}

struct JobRecord {
    state: JobState,
    error: Option<String>,
    result: Option<serde_json::Value>,
    started_at_ms: Option<u64>,
    completed_at_ms: Option<u64>,
    execution_time_ms: Option<u64>,
    cancel: CancellationToken,
}

impl JobRecord {
    fn queued() -> Self {
        Self {
            state: JobState::Queued,
            error: None,
            result: None,
            started_at_ms: None,
            completed_at_ms: None,
            execution_time_ms: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Snapshot returned by `get_job_status`.
#[derive(Debug, Clone)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub state: JobState,
    pub error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub execution_time_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct HealthView {
    pub healthy: dim_wire::HealthStatus,
    pub cached_models: Vec<String>,
    pub active_jobs: u32,
    pub queued_jobs: u32,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub cpu_count: u32,
    pub memory_used_gb: f64,
    pub memory_available_gb: f64,
}

#[derive(Debug, Clone)]
pub struct StatsView {
    pub total_jobs: u64,
    pub successful_jobs: u64,
    pub failed_jobs: u64,
    pub avg_execution_time_ms: f64,
    pub cached_models_count: u32,
    pub cache_size_bytes: u64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub cpu_count: u32,
    pub memory_used_gb: f64,
    pub memory_available_gb: f64,
    pub rate_limit: dim_net::BucketStatus,
}

#[derive(Default)]
struct Stats {
    total_jobs: AtomicU64,
    successful_jobs: AtomicU64,
    failed_jobs: AtomicU64,
    total_execution_time_ms: AtomicU64,
    completed_count: AtomicU64,
}

/// Everything one worker node needs to accept, run, and report on jobs.
pub struct Daemon<S: ResourceSampler, F: ModelFetcher, C: Clock> {
    pub node_id: NodeId,
    max_queue_size: usize,
    queue: TrackedJobQueue<QueuedJob>,
    resource_manager: Arc<ResourceManager<S>>,
    model_cache: Arc<ModelCache<F, C>>,
    supervisor: Arc<AgentSupervisor>,
    command_builder: Arc<dyn AgentCommandBuilder>,
    store: Arc<dyn ObjectStore>,
    rate_limiter: RateLimiter<C>,
    monitoring: Monitoring,
    clock: C,
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    stats: Stats,
    access_tracker: Arc<AccessTracker<C>>,
}

impl<S: ResourceSampler + 'static, F: ModelFetcher + 'static, C: Clock> Daemon<S, F, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        node_id: NodeId,
        max_queue_size: usize,
        resource_manager: ResourceManager<S>,
        model_cache: ModelCache<F, C>,
        supervisor: AgentSupervisor,
        command_builder: Arc<dyn AgentCommandBuilder>,
        store: Arc<dyn ObjectStore>,
        rate_limiter: RateLimiter<C>,
        monitoring: Monitoring,
        clock: C,
        access_tracker: Arc<AccessTracker<C>>,
    ) -> Self {
        Self {
            node_id,
            max_queue_size,
            queue: TrackedJobQueue::new(max_queue_size),
            resource_manager: Arc::new(resource_manager),
            model_cache: Arc::new(model_cache),
            supervisor: Arc::new(supervisor),
            command_builder,
            store,
            rate_limiter,
            monitoring,
            clock,
            jobs: Mutex::new(HashMap::new()),
            stats: Stats::default(),
            access_tracker,
        }
    }

    pub async fn submit_job(
        &self,
        job_id: JobId,
        model_id: String,
        data_source: Option<String>,
        input_data: Option<serde_json::Value>,
        timeout_secs: u64,
        priority: Priority,
    ) -> DimResult<()> {
        let check = self.rate_limiter.check(self.node_id.as_str(), 1.0);
        if !check.allowed {
            return Err(DimError::RateLimitExceeded { retry_after_secs: check.retry_after_seconds });
        }

        self.access_tracker.record(&model_id);

        let queued = QueuedJob {
            job_id: job_id.clone(),
            model_id,
            data_source,
            input_data: input_data.unwrap_or(serde_json::Value::Null),
            timeout_secs,
            priority,
        };

        self.queue
            .enqueue(priority, job_id.to_string(), queued)
            .await
            .map_err(|_| DimError::QueueFull { max_size: self.max_queue_size })?;

        self.jobs.lock().await.insert(job_id, JobRecord::queued());
        self.monitoring.increment("daemon.jobs.submitted", &Default::default(), 1);
        Ok(())
    }

    pub async fn get_job_status(&self, job_id: &JobId) -> Option<JobStatusView> {
        let jobs = self.jobs.lock().await;
        jobs.get(job_id).map(|r| JobStatusView {
            job_id: job_id.clone(),
            state: r.state,
            error: r.error.clone(),
            result: r.result.clone(),
            started_at_ms: r.started_at_ms,
            completed_at_ms: r.completed_at_ms,
            execution_time_ms: r.execution_time_ms,
        })
    }

    /// Cancel a queued or running job. Returns `false` if unknown or already
    /// terminal.
    pub async fn cancel_job(&self, job_id: &JobId) -> bool {
        let mut jobs = self.jobs.lock().await;
        let Some(record) = jobs.get_mut(job_id) else { return false };
        if record.state.is_terminal() {
            return false;
        }
        if record.state == JobState::Queued {
            self.queue.remove(job_id.as_str(), &QueuedJob::marker(job_id.clone())).await;
        } else {
            record.cancel.cancel();
        }
        record.state = JobState::Cancelled;
        record.completed_at_ms = Some(self.clock.epoch_ms());
        true
    }

    pub async fn health(&self) -> HealthView {
        let snapshot = self.resource_manager.snapshot();
        HealthView {
            healthy: self.resource_manager.health_status(),
            cached_models: self.model_cache.model_ids(),
            active_jobs: snapshot.active_jobs,
            queued_jobs: self.queue.len().await as u32,
            cpu_percent: snapshot.cpu_percent,
            memory_percent: snapshot.memory_percent,
            cpu_count: self.resource_manager.cpu_count(),
            memory_used_gb: self.resource_manager.memory_used_gb(),
            memory_available_gb: self.resource_manager.memory_available_gb(),
        }
    }

    /// Shared handle to the model cache, for callers (e.g. a prewarm loop)
    /// that run alongside the dispatcher and need to populate it directly.
    pub fn model_cache_handle(&self) -> Arc<ModelCache<F, C>> {
        self.model_cache.clone()
    }

    /// Shared handle to the access tracker, for the prewarm loop to read
    /// organically-popular models recorded by live `submit_job` calls.
    pub fn access_tracker_handle(&self) -> Arc<AccessTracker<C>> {
        self.access_tracker.clone()
    }

    pub fn stats(&self) -> StatsView {
        let completed = self.stats.completed_count.load(Ordering::SeqCst);
        let avg = if completed == 0 {
            0.0
        } else {
            self.stats.total_execution_time_ms.load(Ordering::SeqCst) as f64 / completed as f64
        };
        let snapshot = self.resource_manager.snapshot();
        StatsView {
            total_jobs: self.stats.total_jobs.load(Ordering::SeqCst),
            successful_jobs: self.stats.successful_jobs.load(Ordering::SeqCst),
            failed_jobs: self.stats.failed_jobs.load(Ordering::SeqCst),
            avg_execution_time_ms: avg,
            cached_models_count: self.model_cache.model_ids().len() as u32,
            cache_size_bytes: self.model_cache.total_size(),
            cpu_percent: snapshot.cpu_percent,
            memory_percent: snapshot.memory_percent,
            cpu_count: self.resource_manager.cpu_count(),
            memory_used_gb: self.resource_manager.memory_used_gb(),
            memory_available_gb: self.resource_manager.memory_available_gb(),
            rate_limit: self.rate_limiter.status(self.node_id.as_str()),
        }
    }

    /// Drives the dispatch loop forever: wait for admission headroom, pop
    /// the highest-priority job, run it on its own task. Call once, spawned.
    pub async fn run_dispatcher(self: Arc<Self>) {
        loop {
            while self.resource_manager.can_accept_job().is_err() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            let job = self.queue.dequeue().await;
            self.queue.mark_dequeued(job.job_id.as_str()).await;
            self.resource_manager.job_started();

            let this = self.clone();
            tokio::spawn(async move { this.execute(job).await });
        }
    }

    /// Publish this node's heartbeat once. Call on a periodic interval.
    pub async fn publish_heartbeat(&self) -> DimResult<()> {
        let snapshot = self.resource_manager.snapshot();
        let event = NodeHeartbeatEvent {
            node_id: self.node_id.clone(),
            status: crate::health::to_node_status(self.resource_manager.health_status()),
            active_jobs: snapshot.active_jobs,
            queued_jobs: self.queue.len().await as u32,
            resources: snapshot,
            cached_models: self.model_cache.model_ids(),
            timestamp: self.clock.epoch_ms(),
        };
        let bytes = serde_json::to_vec(&event).map_err(|e| DimError::internal(e.to_string()))?;
        self.store
            .publish(dim_objectstore::topics::NODES_HEARTBEAT, bytes)
            .await
            .map_err(|e| DimError::internal(e.to_string()))
    }

    async fn execute(&self, job: QueuedJob) {
        let start_ms = self.clock.epoch_ms();
        let cancel = {
            let mut jobs = self.jobs.lock().await;
            let Some(record) = jobs.get_mut(&job.job_id) else {
                self.resource_manager.job_finished();
                return;
            };
            if record.state == JobState::Cancelled {
                self.resource_manager.job_finished();
                return;
            }
            record.state = JobState::Running;
            record.started_at_ms = Some(start_ms);
            record.cancel.clone()
        };

        let outcome = self.run_job(&job, &cancel).await;
        let completed_ms = self.clock.epoch_ms();
        let execution_time_ms = completed_ms.saturating_sub(start_ms);
        self.resource_manager.job_finished();
        self.stats.total_jobs.fetch_add(1, Ordering::SeqCst);

        let mut jobs = self.jobs.lock().await;
        let Some(record) = jobs.get_mut(&job.job_id) else { return };
        if record.state == JobState::Cancelled {
            return;
        }

        record.completed_at_ms = Some(completed_ms);
        record.execution_time_ms = Some(execution_time_ms);
        self.stats.completed_count.fetch_add(1, Ordering::SeqCst);
        self.stats.total_execution_time_ms.fetch_add(execution_time_ms, Ordering::SeqCst);

        let event = match outcome {
            Ok(value) => {
                record.state = JobState::Completed;
                record.result = Some(value.clone());
                self.stats.successful_jobs.fetch_add(1, Ordering::SeqCst);
                self.build_update_event(&job.job_id, JobEventType::Completed, Some(value), None)
            }
            Err(e) => {
                record.state = JobState::Failed;
                record.error = Some(e.to_string());
                self.stats.failed_jobs.fetch_add(1, Ordering::SeqCst);
                self.build_update_event(&job.job_id, JobEventType::Failed, None, Some(e.to_string()))
            }
        };
        drop(jobs);
        self.publish_job_event(event).await;
    }

    fn build_update_event(
        &self,
        job_id: &JobId,
        event_type: JobEventType,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> JobUpdateEvent {
        JobUpdateEvent {
            job_id: job_id.clone(),
            event_type,
            node_id: Some(self.node_id.clone()),
            result,
            error,
            timestamp: self.clock.epoch_ms(),
        }
    }

    async fn publish_job_event(&self, event: JobUpdateEvent) {
        let job_id = event.job_id.clone();
        let Ok(bytes) = serde_json::to_vec(&event) else { return };
        let _ = self.store.publish(dim_objectstore::topics::JOBS_UPDATES, bytes.clone()).await;

        if event.event_type == JobEventType::Completed {
            if let Ok(cid) = self.store.put(bytes).await {
                self.publish_result_ready(job_id, cid).await;
            }
        }
    }

    async fn publish_result_ready(&self, job_id: JobId, result_cid: Cid) {
        let event = ResultReadyEvent { job_id, result_cid: result_cid.to_string(), timestamp: self.clock.epoch_ms() };
        if let Ok(bytes) = serde_json::to_vec(&event) {
            let _ = self.store.publish(dim_objectstore::topics::RESULTS_READY, bytes).await;
        }
    }

    async fn run_job(&self, job: &QueuedJob, cancel: &CancellationToken) -> DimResult<serde_json::Value> {
        let model_path = self.model_cache.get(&job.model_id).await.map_err(|e| match e {
            ModelCacheError::ModelUnavailable(reason) => {
                DimError::ModelUnavailable { model_id: job.model_id.clone(), reason }
            }
            ModelCacheError::CacheFull => DimError::CacheFull { model_id: job.model_id.clone(), needed_bytes: 0 },
            ModelCacheError::Io(io) => DimError::internal(io.to_string()),
        })?;

        let input_bytes = serde_json::to_vec(&job.input_data).unwrap_or_default();
        let spec = self.command_builder.build(&job.model_id, &model_path);
        let timeout = Duration::from_secs(job.timeout_secs);

        let output = self
            .supervisor
            .run_cancellable(&spec, &input_bytes, timeout, cancel)
            .await
            .map_err(|e| match e {
                AgentError::Timeout => {
                    DimError::Timeout { elapsed_secs: job.timeout_secs, limit_secs: job.timeout_secs }
                }
                AgentError::Cancelled => DimError::internal("job cancelled"),
                AgentError::Crashed(status) => DimError::AgentCrashed(status),
                AgentError::Spawn(reason) => DimError::AgentCrashed(reason),
                AgentError::Io(io) => DimError::AgentCrashed(io.to_string()),
            })?;

        serde_json::from_slice(&output)
            .map_err(|e| DimError::internal(format!("malformed agent output: {e}")))
    }
}

#[cfg(test)]
#[path = "core_tests.rs"]
mod tests;
