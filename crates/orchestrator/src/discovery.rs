// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscribes to the node-heartbeat topic, feeds the registry, and
//! republishes the roster snapshot under a mutable name at most once per
//! `republish_interval`.

use crate::registry::NodeRegistry;
use dim_core::{Clock, DimResult};
use dim_objectstore::topics::{NodeHeartbeatEvent, NODES_HEARTBEAT};
use dim_objectstore::ObjectStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct NodeDiscovery<C: Clock> {
    store: Arc<dyn ObjectStore>,
    registry: Arc<NodeRegistry<C>>,
    clock: C,
    registry_key: String,
    republish_interval_ms: u64,
    name_lifetime: Duration,
    last_published_ms: AtomicU64,
}

impl<C: Clock> NodeDiscovery<C> {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        registry: Arc<NodeRegistry<C>>,
        clock: C,
        registry_key: impl Into<String>,
        republish_interval: Duration,
        name_lifetime: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
            registry_key: registry_key.into(),
            republish_interval_ms: republish_interval.as_millis() as u64,
            name_lifetime,
            last_published_ms: AtomicU64::new(0),
        }
    }

    /// Consume `node_heartbeat` forever, upserting the registry and
    /// rate-limiting the roster republish. Runs until the topic's publisher
    /// side is dropped (never, in a live deployment); spawn and forget.
    pub async fn run(&self) -> DimResult<()> {
        let mut subscription = self
            .store
            .subscribe(NODES_HEARTBEAT)
            .await
            .map_err(|e| dim_core::DimError::internal(e.to_string()))?;

        while let Some(bytes) = subscription.recv().await {
            let event: NodeHeartbeatEvent = match serde_json::from_slice(&bytes) {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed node heartbeat");
                    continue;
                }
            };
            self.registry.upsert_heartbeat(&event);
            self.maybe_republish().await;
        }
        Ok(())
    }

    async fn maybe_republish(&self) {
        let now_ms = self.clock.epoch_ms();
        let last = self.last_published_ms.load(Ordering::SeqCst);
        if now_ms.saturating_sub(last) < self.republish_interval_ms {
            return;
        }
        self.last_published_ms.store(now_ms, Ordering::SeqCst);

        let snapshot = self.registry.snapshot();
        let bytes = match serde_json::to_vec(&snapshot) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize registry snapshot");
                return;
            }
        };
        let cid = match self.store.put(bytes).await {
            Ok(cid) => cid,
            Err(e) => {
                tracing::warn!(error = %e, "failed to publish registry snapshot blob");
                return;
            }
        };
        if let Err(e) = self.store.name_publish(&self.registry_key, cid, self.name_lifetime).await {
            tracing::warn!(error = %e, "failed to republish registry mutable name");
        }
    }

    /// Periodic sweep marking stale nodes unreachable. Spawn alongside `run`.
    pub async fn sweep_stale_loop(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let marked = self.registry.reap_stale();
            if marked > 0 {
                tracing::debug!(marked, "marked nodes unreachable on heartbeat timeout");
            }
        }
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
