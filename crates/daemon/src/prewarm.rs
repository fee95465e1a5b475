// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Model prewarming: fetch popular models into the cache before they are
//! first requested by a job, so the first `get_model` for them is a hit.

use crate::model_cache::{ModelCache, ModelFetcher};
use dim_core::Clock;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Tracks recent `submit_job` accesses per model id within a rolling window,
/// so the prewarmer can promote organically popular models alongside the
/// operator-configured list.
pub struct AccessTracker<C: Clock> {
    clock: C,
    window_ms: u64,
    accesses: Mutex<HashMap<String, VecDeque<u64>>>,
}

impl<C: Clock> AccessTracker<C> {
    pub fn new(clock: C, window: Duration) -> Self {
        Self { clock, window_ms: window.as_millis() as u64, accesses: Mutex::new(HashMap::new()) }
    }

    pub fn record(&self, model_id: &str) {
        let now = self.clock.epoch_ms();
        let mut guard = self.accesses.lock();
        let entry = guard.entry(model_id.to_string()).or_default();
        entry.push_back(now);
        Self::prune(entry, now, self.window_ms);
    }

    pub fn count(&self, model_id: &str) -> usize {
        let now = self.clock.epoch_ms();
        let mut guard = self.accesses.lock();
        let Some(entry) = guard.get_mut(model_id) else { return 0 };
        Self::prune(entry, now, self.window_ms);
        entry.len()
    }

    /// Every model id whose within-window access count is at least `min_count`.
    pub fn popular(&self, min_count: u32) -> Vec<String> {
        let now = self.clock.epoch_ms();
        let mut guard = self.accesses.lock();
        let mut result = Vec::new();
        for (model_id, timestamps) in guard.iter_mut() {
            Self::prune(timestamps, now, self.window_ms);
            if timestamps.len() as u32 >= min_count {
                result.push(model_id.clone());
            }
        }
        result
    }

    fn prune(entry: &mut VecDeque<u64>, now: u64, window_ms: u64) {
        while let Some(&oldest) = entry.front() {
            if now.saturating_sub(oldest) > window_ms {
                entry.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Proactively fetches configured and organically-popular models into the
/// cache. Call [`Self::run_once`] on a periodic interval; a no-op if
/// prewarming is disabled.
pub struct Prewarmer<F: ModelFetcher, C: Clock> {
    enabled: bool,
    popular_models: Vec<String>,
    min_access_count: u32,
    model_cache: Arc<ModelCache<F, C>>,
    tracker: Arc<AccessTracker<C>>,
}

impl<F: ModelFetcher, C: Clock> Prewarmer<F, C> {
    pub fn new(
        enabled: bool,
        popular_models: Vec<String>,
        min_access_count: u32,
        model_cache: Arc<ModelCache<F, C>>,
        tracker: Arc<AccessTracker<C>>,
    ) -> Self {
        Self { enabled, popular_models, min_access_count, model_cache, tracker }
    }

    pub async fn run_once(&self) {
        if !self.enabled {
            return;
        }
        let mut targets = self.popular_models.clone();
        for model_id in self.tracker.popular(self.min_access_count) {
            if !targets.contains(&model_id) {
                targets.push(model_id);
            }
        }
        for model_id in targets {
            if self.model_cache.contains(&model_id) {
                continue;
            }
            if let Err(e) = self.model_cache.get(&model_id).await {
                tracing::warn!(model_id, error = %e, "prewarm fetch failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "prewarm_tests.rs"]
mod tests;
