// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutable-name-backed roster of known daemons.
//!
//! The in-process map is the orchestrator's own live view, kept current by
//! [`crate::discovery::NodeDiscovery`] ingesting heartbeats. `snapshot`
//! additionally caches its result for `cache_ttl`, matching the "reads are
//! cached locally with a 30s TTL" contract readers of the published registry
//! are expected to honour.

use dim_core::{Clock, NodeId, NodeInfo, NodeStatus};
use dim_objectstore::topics::NodeHeartbeatEvent;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

struct Cache {
    built_at_ms: u64,
    nodes: Vec<NodeInfo>,
}

pub struct NodeRegistry<C: Clock> {
    clock: C,
    heartbeat_timeout_ms: u64,
    cache_ttl_ms: u64,
    nodes: Mutex<HashMap<NodeId, NodeInfo>>,
    cache: Mutex<Option<Cache>>,
}

impl<C: Clock> NodeRegistry<C> {
    pub fn new(clock: C, heartbeat_timeout: Duration, cache_ttl: Duration) -> Self {
        Self {
            clock,
            heartbeat_timeout_ms: heartbeat_timeout.as_millis() as u64,
            cache_ttl_ms: cache_ttl.as_millis() as u64,
            nodes: Mutex::new(HashMap::new()),
            cache: Mutex::new(None),
        }
    }

    /// Explicit registration (first-contact, outside the heartbeat stream).
    pub fn register(&self, node: NodeInfo) {
        self.nodes.lock().insert(node.node_id, node);
        self.invalidate_cache();
    }

    pub fn remove(&self, node_id: &NodeId) -> bool {
        let removed = self.nodes.lock().remove(node_id).is_some();
        if removed {
            self.invalidate_cache();
        }
        removed
    }

    /// Merge one heartbeat into the roster: upsert the node, refresh its
    /// `last_heartbeat_ms`, and carry the reported resources/status forward.
    pub fn upsert_heartbeat(&self, event: &NodeHeartbeatEvent) {
        let now_ms = self.clock.epoch_ms();
        let mut nodes = self.nodes.lock();
        nodes
            .entry(event.node_id)
            .and_modify(|n| {
                n.status = event.status;
                n.resources = event.resources;
                n.models = event.cached_models.clone();
                n.last_heartbeat_ms = now_ms;
            })
            .or_insert_with(|| NodeInfo {
                node_id: event.node_id,
                address: String::new(),
                models: event.cached_models.clone(),
                reputation: default_reputation(),
                resources: event.resources,
                status: event.status,
                last_heartbeat_ms: now_ms,
                tags: HashMap::new(),
            });
        drop(nodes);
        self.invalidate_cache();
    }

    /// Attach (or update) the routable address and static metadata for a
    /// node, independent of heartbeat ingest (heartbeats don't carry these).
    pub fn set_address_and_tags(&self, node_id: NodeId, address: String, reputation: f64, tags: HashMap<String, String>) {
        let mut nodes = self.nodes.lock();
        let entry = nodes.entry(node_id).or_insert_with(|| NodeInfo {
            node_id,
            address: address.clone(),
            models: Vec::new(),
            reputation,
            resources: Default::default(),
            status: NodeStatus::Healthy,
            last_heartbeat_ms: self.clock.epoch_ms(),
            tags: tags.clone(),
        });
        entry.address = address;
        entry.reputation = reputation;
        entry.tags = tags;
        drop(nodes);
        self.invalidate_cache();
    }

    fn invalidate_cache(&self) {
        *self.cache.lock() = None;
    }

    /// Full roster, including nodes whose heartbeat has gone stale.
    pub fn snapshot(&self) -> Vec<NodeInfo> {
        let now_ms = self.clock.epoch_ms();
        let mut cache = self.cache.lock();
        if let Some(c) = cache.as_ref() {
            if now_ms.saturating_sub(c.built_at_ms) < self.cache_ttl_ms {
                return c.nodes.clone();
            }
        }
        let nodes: Vec<NodeInfo> = self.nodes.lock().values().cloned().collect();
        *cache = Some(Cache { built_at_ms: now_ms, nodes: nodes.clone() });
        nodes
    }

    /// Nodes whose heartbeat is still fresh — the only nodes eligible for
    /// selection (invariant: `get_active_nodes` never returns a stale node).
    pub fn active_nodes(&self) -> Vec<NodeInfo> {
        let now_ms = self.clock.epoch_ms();
        self.snapshot().into_iter().filter(|n| n.is_active(now_ms, self.heartbeat_timeout_ms)).collect()
    }

    pub fn get(&self, node_id: &NodeId) -> Option<NodeInfo> {
        self.nodes.lock().get(node_id).cloned()
    }

    pub fn find_by_str(&self, node_id: &str) -> Option<NodeInfo> {
        self.nodes.lock().values().find(|n| n.node_id.as_str() == node_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark nodes whose heartbeat is stale beyond `heartbeat_timeout` as
    /// `Unreachable`. Nodes are never removed by staleness alone — only an
    /// explicit `remove` drops a roster entry — so a node that resumes
    /// heartbeating picks its entry back up instead of re-registering.
    /// Intended for a periodic background sweep.
    pub fn reap_stale(&self) -> usize {
        let now_ms = self.clock.epoch_ms();
        let timeout = self.heartbeat_timeout_ms;
        let mut nodes = self.nodes.lock();
        let mut marked = 0;
        for node in nodes.values_mut() {
            if !node.is_active(now_ms, timeout) && node.status != NodeStatus::Unreachable {
                node.status = NodeStatus::Unreachable;
                marked += 1;
            }
        }
        if marked > 0 {
            drop(nodes);
            self.invalidate_cache();
        }
        marked
    }
}

fn default_reputation() -> f64 {
    1.0
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
