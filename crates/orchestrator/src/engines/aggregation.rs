// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregation semantics for the collaborative pattern.
//!
//! The methods named in the spec (`federated_averaging`, `weighted_average`,
//! `median`) are given concrete, deterministic definitions here — the core
//! contract only requires the aggregator be a pure function of the method
//! tag and the sub-output multiset, so these are documented extension
//! points rather than a fixed standard.

use dim_core::AggregationMethod;
use serde_json::{json, Value};

/// Extract the numeric contribution of one subjob's result: either the
/// value itself (if it's a bare number) or its `output` field.
fn numeric_value(value: &Value) -> Option<f64> {
    value.as_f64().or_else(|| value.get("output").and_then(Value::as_f64))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn weighted_mean(pairs: &[(f64, f64)]) -> f64 {
    let total_weight: f64 = pairs.iter().map(|(_, w)| *w).sum();
    if total_weight <= 0.0 {
        return mean(&pairs.iter().map(|(v, _)| *v).collect::<Vec<_>>());
    }
    pairs.iter().map(|(v, w)| v * w).sum::<f64>() / total_weight
}

/// Aggregate the per-node results of a collaborative job into the `{method,
/// node_count, per_node_results, aggregated_output, nodes_used}` output
/// shape. `reputation_of` supplies the weight for `weighted_average`.
pub fn aggregate(method: &AggregationMethod, per_node: &[(String, Value)], reputation_of: impl Fn(&str) -> f64) -> Value {
    let numerics: Vec<(String, f64)> =
        per_node.iter().filter_map(|(node_id, v)| numeric_value(v).map(|n| (node_id.clone(), n))).collect();
    let bare_values: Vec<f64> = numerics.iter().map(|(_, v)| *v).collect();

    let aggregated_output = match method {
        AggregationMethod::FederatedAveraging | AggregationMethod::Custom(_) => mean(&bare_values),
        AggregationMethod::WeightedAverage => {
            let weighted: Vec<(f64, f64)> = numerics.iter().map(|(id, v)| (*v, reputation_of(id).max(0.0))).collect();
            weighted_mean(&weighted)
        }
        AggregationMethod::Median => median(&bare_values),
    };

    json!({
        "method": method.as_str(),
        "node_count": per_node.len(),
        "per_node_results": per_node.iter().map(|(id, v)| json!({"node_id": id, "result": v})).collect::<Vec<_>>(),
        "aggregated_output": aggregated_output,
        "nodes_used": per_node.iter().map(|(id, _)| id.clone()).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
#[path = "aggregation_tests.rs"]
mod tests;
