// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filter + reputation-weighted sampling over the node registry.

use dim_core::{NodeInfo, NodeStatus};
use rand::Rng;

/// Selection request: `data_type`/`location` match against a node's `tags`.
#[derive(Debug, Clone, Default)]
pub struct SelectionCriteria {
    pub count: usize,
    pub reputation_min: f64,
    pub data_type: Option<String>,
    pub location: Option<String>,
}

/// Reputation floor below which a node is never weighted into a draw, even
/// as a last resort — avoids a single misbehaving node with reputation 0
/// dominating the weighted draw once everyone else is exhausted.
const MIN_SAMPLING_WEIGHT: f64 = 1e-6;

pub struct NodeSelector;

impl NodeSelector {
    /// Filter `nodes` down to eligible candidates, sorted by reputation
    /// descending (ties broken by `node_id`), then sample `criteria.count`
    /// of them without replacement, weighted by reputation.
    pub fn select(nodes: &[NodeInfo], criteria: &SelectionCriteria, rng: &mut impl Rng) -> Vec<NodeInfo> {
        let mut candidates: Vec<NodeInfo> = nodes
            .iter()
            .filter(|n| n.status != NodeStatus::Unreachable)
            .filter(|n| n.reputation >= criteria.reputation_min)
            .filter(|n| Self::tag_matches(n, "data_type", criteria.data_type.as_deref()))
            .filter(|n| Self::tag_matches(n, "location", criteria.location.as_deref()))
            .cloned()
            .collect();

        if candidates.is_empty() {
            return Vec::new();
        }

        candidates.sort_by(|a, b| {
            b.reputation.partial_cmp(&a.reputation).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.node_id.as_str().cmp(b.node_id.as_str()))
        });

        Self::weighted_sample(candidates, criteria.count, rng)
    }

    fn tag_matches(node: &NodeInfo, key: &str, wanted: Option<&str>) -> bool {
        match wanted {
            None => true,
            Some(value) => node.tags.get(key).map(|v| v == value).unwrap_or(false),
        }
    }

    /// Weighted sampling without replacement (reputation-weighted). When
    /// `count` exceeds the candidate pool, every candidate is returned —
    /// the "top up deterministically from the sorted prefix" case, trivially
    /// satisfied since the whole (already reputation-sorted) pool is used.
    fn weighted_sample(mut candidates: Vec<NodeInfo>, count: usize, rng: &mut impl Rng) -> Vec<NodeInfo> {
        let take = count.min(candidates.len());
        let mut selected = Vec::with_capacity(take);

        for _ in 0..take {
            let total_weight: f64 = candidates.iter().map(|n| n.reputation.max(MIN_SAMPLING_WEIGHT)).sum();
            let mut draw = rng.gen::<f64>() * total_weight;
            let mut chosen = candidates.len() - 1;
            for (i, node) in candidates.iter().enumerate() {
                draw -= node.reputation.max(MIN_SAMPLING_WEIGHT);
                if draw <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            selected.push(candidates.remove(chosen));
        }
        selected
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
