// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-endpoint bounded pool of reusable RPC channels.
//!
//! Generic over the channel type `T` so the same pool shape serves both the
//! orchestrator's daemon client and any peer-orchestrator client; `T` is
//! whatever the wire layer considers a connected, reusable transport handle.

use dim_core::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;

struct Idle<T> {
    channel: T,
    idle_since_ms: u64,
}

struct EndpointPool<T> {
    idle: Vec<Idle<T>>,
    in_use: usize,
}

impl<T> Default for EndpointPool<T> {
    fn default() -> Self {
        Self { idle: Vec::new(), in_use: 0 }
    }
}

/// Bounded, per-endpoint connection pool with an idle-timeout sweep.
///
/// `get_channel` hands out an idle channel if one exists, otherwise builds a
/// new one via the supplied factory up to `max_per_endpoint`; beyond that it
/// still builds a temporary channel (logged) rather than blocking, matching
/// the reference design's "never block admission on transport capacity"
/// stance.
pub struct ConnectionPool<T, C: Clock> {
    clock: C,
    max_per_endpoint: usize,
    idle_timeout_ms: u64,
    pools: Mutex<HashMap<String, EndpointPool<T>>>,
}

impl<T, C: Clock> ConnectionPool<T, C> {
    pub fn new(clock: C, max_per_endpoint: usize, idle_timeout: std::time::Duration) -> Self {
        Self {
            clock,
            max_per_endpoint,
            idle_timeout_ms: idle_timeout.as_millis() as u64,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Return an idle channel for `endpoint`, or `None` if the pool has
    /// none cached (caller should build a fresh one, temporary or pooled
    /// depending on `at_capacity`).
    pub fn take_idle(&self, endpoint: &str) -> Option<T> {
        let mut guard = self.pools.lock();
        let pool = guard.entry(endpoint.to_string()).or_default();
        let channel = pool.idle.pop().map(|idle| idle.channel);
        if channel.is_some() {
            pool.in_use += 1;
        }
        channel
    }

    /// Whether `endpoint` is at its pooled-connection cap; a caller at
    /// capacity should still connect, just not retain the channel afterward.
    pub fn at_capacity(&self, endpoint: &str) -> bool {
        let guard = self.pools.lock();
        guard.get(endpoint).map(|p| p.in_use >= self.max_per_endpoint).unwrap_or(false)
    }

    pub fn record_checked_out(&self, endpoint: &str) {
        let mut guard = self.pools.lock();
        guard.entry(endpoint.to_string()).or_default().in_use += 1;
    }

    /// Mark a channel available for reuse (or drop it if the endpoint is
    /// already at capacity for idle channels).
    pub fn return_channel(&self, endpoint: &str, channel: T) {
        let now_ms = self.clock.epoch_ms();
        let mut guard = self.pools.lock();
        let pool = guard.entry(endpoint.to_string()).or_default();
        pool.in_use = pool.in_use.saturating_sub(1);
        if pool.idle.len() < self.max_per_endpoint {
            pool.idle.push(Idle { channel, idle_since_ms: now_ms });
        }
    }

    /// Drop channels idle longer than the configured timeout. Intended to be
    /// called from a periodic background task.
    pub fn sweep_idle(&self) {
        let now_ms = self.clock.epoch_ms();
        let mut guard = self.pools.lock();
        for pool in guard.values_mut() {
            pool.idle.retain(|idle| now_ms.saturating_sub(idle.idle_since_ms) < self.idle_timeout_ms);
        }
    }

    pub fn idle_count(&self, endpoint: &str) -> usize {
        self.pools.lock().get(endpoint).map(|p| p.idle.len()).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "connection_pool_tests.rs"]
mod tests;
