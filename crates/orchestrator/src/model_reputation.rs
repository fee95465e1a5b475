// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-model reputation for the comparative pattern's `weighted_vote`
//! consensus method, generalizing [`crate::registry::NodeRegistry`]'s
//! per-node reputation to the model axis: several models run on one node,
//! so node reputation alone can't distinguish between them.
//!
//! Reputation starts at a neutral `1.0` and is nudged by an exponential
//! moving average each time a comparative job's consensus settles: a model
//! whose output matched the tally's winner gains weight, a dissenter loses
//! some, so a model that is consistently right relative to its peers
//! out-votes one that consistently isn't.

use parking_lot::Mutex;
use std::collections::HashMap;

const NEUTRAL_REPUTATION: f64 = 1.0;
const EMA_ALPHA: f64 = 0.2;
const MIN_REPUTATION: f64 = 0.1;
const MAX_REPUTATION: f64 = 5.0;

pub struct ModelReputationTracker {
    scores: Mutex<HashMap<String, f64>>,
}

impl ModelReputationTracker {
    pub fn new() -> Self {
        Self { scores: Mutex::new(HashMap::new()) }
    }

    /// Current weight for `model_id`, defaulting to neutral for a model
    /// never seen before.
    pub fn reputation_of(&self, model_id: &str) -> f64 {
        self.scores.lock().get(model_id).copied().unwrap_or(NEUTRAL_REPUTATION)
    }

    /// Fold one consensus outcome into `model_id`'s running reputation.
    pub fn record_agreement(&self, model_id: &str, agreed: bool) {
        let mut scores = self.scores.lock();
        let current = scores.get(model_id).copied().unwrap_or(NEUTRAL_REPUTATION);
        let target = if agreed { MAX_REPUTATION } else { MIN_REPUTATION };
        let updated = current + EMA_ALPHA * (target - current);
        scores.insert(model_id.to_string(), updated.clamp(MIN_REPUTATION, MAX_REPUTATION));
    }
}

impl Default for ModelReputationTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "model_reputation_tests.rs"]
mod tests;
