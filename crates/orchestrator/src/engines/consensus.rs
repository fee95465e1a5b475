// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consensus semantics for the comparative pattern: reconciling the outputs
//! of several models run against the same data on one node.

use dim_core::ConsensusMethod;
use serde_json::{json, Value};

/// Canonicalize a value to a string key so structurally-equal outputs
/// (object key order aside — `serde_json::Value`'s `PartialEq` already
/// ignores that) tally as the same vote.
fn vote_key(value: &Value) -> String {
    value.to_string()
}

struct Tally {
    winner: Value,
    winning_key: String,
    agreement_level: f64,
}

fn tally_votes(per_model: &[(String, Value)], weight_of: impl Fn(&str) -> f64) -> Tally {
    use std::collections::HashMap;
    let mut weights: HashMap<String, f64> = HashMap::new();
    let mut representative: HashMap<String, Value> = HashMap::new();
    let total_weight: f64 = per_model.iter().map(|(id, _)| weight_of(id).max(0.0)).sum::<f64>().max(1.0);

    for (model_id, value) in per_model {
        let key = vote_key(value);
        *weights.entry(key.clone()).or_insert(0.0) += weight_of(model_id).max(0.0);
        representative.entry(key).or_insert_with(|| value.clone());
    }

    let (winning_key, winning_weight) =
        weights.into_iter().max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)).unwrap_or_default();

    Tally {
        winner: representative.remove(&winning_key).unwrap_or(Value::Null),
        winning_key,
        agreement_level: winning_weight / total_weight,
    }
}

/// Outcome of a settled consensus tally: the JSON result plus, per model,
/// whether that model's output agreed with the declared winner. Callers use
/// the latter to update any reputation they track per model.
pub struct Aggregated {
    pub result: Value,
    pub agreements: Vec<(String, bool)>,
}

/// Aggregate comparative per-model outputs into the consensus result shape.
/// Falls back to `expert_review` (surfacing every output, no declared
/// winner) whenever the tallied agreement falls short of `min_agreement`.
///
/// `weight_of` supplies the per-model weight used by `WeightedVote`; callers
/// that don't track model-level weight (or methods other than
/// `WeightedVote`) can pass `|_| 1.0`.
pub fn aggregate(
    method: &ConsensusMethod,
    min_agreement: f64,
    per_model: &[(String, Value)],
    weight_of: impl Fn(&str) -> f64,
) -> Aggregated {
    if matches!(method, ConsensusMethod::ExpertReview) {
        return Aggregated { result: expert_review_result(method, per_model, None), agreements: Vec::new() };
    }

    let weight_of = |model_id: &str| match method {
        ConsensusMethod::WeightedVote => weight_of(model_id),
        _ => 1.0,
    };
    let tally = tally_votes(per_model, weight_of);

    if tally.agreement_level < min_agreement {
        return Aggregated {
            result: expert_review_result(method, per_model, Some(tally.agreement_level)),
            agreements: per_model.iter().map(|(id, v)| (id.clone(), vote_key(v) == tally.winning_key)).collect(),
        };
    }

    let result = json!({
        "method": method.as_str(),
        "model_count": per_model.len(),
        "consensus_output": tally.winner,
        "agreement_level": tally.agreement_level,
        "fallback_to_expert_review": false,
    });
    let agreements = per_model.iter().map(|(id, v)| (id.clone(), vote_key(v) == tally.winning_key)).collect();
    Aggregated { result, agreements }
}

fn expert_review_result(method: &ConsensusMethod, per_model: &[(String, Value)], agreement_level: Option<f64>) -> Value {
    json!({
        "method": method.as_str(),
        "model_count": per_model.len(),
        "all_outputs": per_model.iter().map(|(id, v)| json!({"model_id": id, "result": v})).collect::<Vec<_>>(),
        "agreement_level": agreement_level,
        "fallback_to_expert_review": true,
    })
}

#[cfg(test)]
#[path = "consensus_tests.rs"]
mod tests;
