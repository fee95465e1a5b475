// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer-to-peer orchestrator load balancing: heartbeat exchange between
//! orchestrators and round-robin job handoff once a local capacity
//! threshold is exceeded.

use dim_core::{Clock, DimError, DimResult, JobId, OrchestratorId};
use dim_objectstore::topics::{
    CoordinationEvent, CoordinationType, OrchestratorHeartbeatEvent, ORCHESTRATORS_COORDINATION,
    ORCHESTRATORS_HEARTBEAT,
};
use dim_objectstore::ObjectStore;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// A job handed to this orchestrator by a peer, awaiting local execution.
#[derive(Debug, Clone)]
pub struct JobAssignment {
    pub job_id: JobId,
    pub job_spec: serde_json::Value,
}

struct Inbox {
    queue: Mutex<VecDeque<JobAssignment>>,
    notify: Notify,
}

impl Inbox {
    fn new() -> Self {
        Self { queue: Mutex::new(VecDeque::new()), notify: Notify::new() }
    }

    async fn push(&self, assignment: JobAssignment) {
        self.queue.lock().await.push_back(assignment);
        self.notify.notify_one();
    }

    async fn next(&self) -> JobAssignment {
        loop {
            if let Some(assignment) = self.queue.lock().await.pop_front() {
                return assignment;
            }
            self.notify.notified().await;
        }
    }
}

/// Tracks sibling orchestrators and decides when a submitted job should be
/// handed off instead of run locally.
pub struct OrchestratorCoordinator<C: Clock> {
    store: Arc<dyn ObjectStore>,
    orchestrator_id: OrchestratorId,
    clock: C,
    heartbeat_interval: Duration,
    heartbeat_timeout_ms: u64,
    active_job_threshold: u32,
    known: Mutex<HashMap<OrchestratorId, u64>>,
    round_robin_cursor: AtomicUsize,
    last_heartbeat_sent_ms: AtomicU64,
    inbox: Inbox,
}

impl<C: Clock> OrchestratorCoordinator<C> {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        orchestrator_id: OrchestratorId,
        clock: C,
        heartbeat_interval: Duration,
        heartbeat_timeout: Duration,
        active_job_threshold: u32,
    ) -> Self {
        Self {
            store,
            orchestrator_id,
            clock,
            heartbeat_interval,
            heartbeat_timeout_ms: heartbeat_timeout.as_millis() as u64,
            active_job_threshold,
            known: Mutex::new(HashMap::new()),
            round_robin_cursor: AtomicUsize::new(0),
            last_heartbeat_sent_ms: AtomicU64::new(0),
            inbox: Inbox::new(),
        }
    }

    /// Publish this orchestrator's heartbeat once. Call on a periodic loop.
    pub async fn publish_heartbeat(&self, active_jobs: u32) -> DimResult<()> {
        let event = OrchestratorHeartbeatEvent {
            orchestrator_id: self.orchestrator_id,
            active_jobs,
            timestamp: self.clock.epoch_ms(),
        };
        let bytes = serde_json::to_vec(&event).map_err(|e| DimError::internal(e.to_string()))?;
        self.last_heartbeat_sent_ms.store(self.clock.epoch_ms(), Ordering::SeqCst);
        self.store.publish(ORCHESTRATORS_HEARTBEAT, bytes).await.map_err(|e| DimError::internal(e.to_string()))
    }

    pub async fn run_heartbeat_loop(&self, active_jobs: impl Fn() -> u32) {
        let mut ticker = tokio::time::interval(self.heartbeat_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.publish_heartbeat(active_jobs()).await {
                tracing::warn!(error = %e, "failed to publish orchestrator heartbeat");
            }
        }
    }

    /// Consume both the heartbeat and coordination topics forever. Spawn
    /// alongside `run_heartbeat_loop`.
    pub async fn run(&self) -> DimResult<()> {
        let mut heartbeats = self
            .store
            .subscribe(ORCHESTRATORS_HEARTBEAT)
            .await
            .map_err(|e| DimError::internal(e.to_string()))?;
        let mut coordination = self
            .store
            .subscribe(ORCHESTRATORS_COORDINATION)
            .await
            .map_err(|e| DimError::internal(e.to_string()))?;

        loop {
            tokio::select! {
                Some(bytes) = heartbeats.recv() => self.ingest_heartbeat(&bytes).await,
                Some(bytes) = coordination.recv() => self.ingest_coordination(&bytes).await,
                else => return Ok(()),
            }
        }
    }

    async fn ingest_heartbeat(&self, bytes: &[u8]) {
        let event: OrchestratorHeartbeatEvent = match serde_json::from_slice(bytes) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed orchestrator heartbeat");
                return;
            }
        };
        if event.orchestrator_id == self.orchestrator_id {
            return;
        }
        self.known.lock().await.insert(event.orchestrator_id, self.clock.epoch_ms());
    }

    async fn ingest_coordination(&self, bytes: &[u8]) {
        let event: CoordinationEvent = match serde_json::from_slice(bytes) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed coordination event");
                return;
            }
        };
        if event.kind != CoordinationType::JobAssignment {
            return;
        }
        if event.target_orchestrator_id != Some(self.orchestrator_id) {
            return;
        }
        let (Some(job_id), Some(job_spec)) = (event.job_id, event.job_spec) else {
            tracing::warn!("job_assignment coordination event missing job_id or job_spec");
            return;
        };
        self.inbox.push(JobAssignment { job_id, job_spec }).await;
    }

    /// Block until a peer hands this orchestrator a job to run locally.
    pub async fn next_assignment(&self) -> JobAssignment {
        self.inbox.next().await
    }

    /// Peers whose heartbeat is still within `heartbeat_timeout`.
    async fn active_peers(&self) -> Vec<OrchestratorId> {
        let now_ms = self.clock.epoch_ms();
        let known = self.known.lock().await;
        known
            .iter()
            .filter(|(_, last_seen)| now_ms.saturating_sub(**last_seen) < self.heartbeat_timeout_ms)
            .map(|(id, _)| *id)
            .collect()
    }

    /// If `local_active_jobs` exceeds the configured threshold and at least
    /// one peer is active, pick the next peer round-robin and hand off the
    /// job over `orchestrators.coordination`; otherwise return `None` so the
    /// caller runs it locally.
    pub async fn select_orchestrator_for_job(
        &self,
        local_active_jobs: u32,
        job_id: JobId,
        job_spec: serde_json::Value,
    ) -> DimResult<Option<OrchestratorId>> {
        if local_active_jobs <= self.active_job_threshold {
            return Ok(None);
        }
        let mut peers = self.active_peers().await;
        if peers.is_empty() {
            return Ok(None);
        }
        peers.sort_by_key(|id| id.as_str().to_string());

        let idx = self.round_robin_cursor.fetch_add(1, Ordering::SeqCst) % peers.len();
        let target = peers[idx];

        let event = CoordinationEvent {
            kind: CoordinationType::JobAssignment,
            orchestrator_id: self.orchestrator_id,
            target_orchestrator_id: Some(target),
            job_id: Some(job_id),
            job_spec: Some(job_spec),
            active_jobs: Some(local_active_jobs),
            capacity: None,
            timestamp: self.clock.epoch_ms(),
        };
        let bytes = serde_json::to_vec(&event).map_err(|e| DimError::internal(e.to_string()))?;
        self.store.publish(ORCHESTRATORS_COORDINATION, bytes).await.map_err(|e| DimError::internal(e.to_string()))?;
        Ok(Some(target))
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
