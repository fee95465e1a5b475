// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn federated_averaging_matches_s1_scenario() {
    // S1: two daemons return {output: 1.0} and {output: 2.0}.
    let per_node = vec![("n1".to_string(), json!({"output": 1.0})), ("n2".to_string(), json!({"output": 2.0}))];
    let result = aggregate(&AggregationMethod::FederatedAveraging, &per_node, |_| 1.0);

    assert_eq!(result["method"], "federated_averaging");
    assert_eq!(result["node_count"], 2);
    assert_eq!(result["aggregated_output"], 1.5);
    assert_eq!(result["nodes_used"], json!(["n1", "n2"]));
}

#[test]
fn weighted_average_favours_higher_reputation() {
    let per_node = vec![("n1".to_string(), json!({"output": 0.0})), ("n2".to_string(), json!({"output": 10.0}))];
    let result = aggregate(&AggregationMethod::WeightedAverage, &per_node, |id| if id == "n2" { 3.0 } else { 1.0 });
    // weighted mean = (0*1 + 10*3) / 4 = 7.5
    assert_eq!(result["aggregated_output"], 7.5);
}

#[test]
fn median_picks_middle_value_of_odd_set() {
    let per_node = vec![
        ("n1".to_string(), json!({"output": 1.0})),
        ("n2".to_string(), json!({"output": 5.0})),
        ("n3".to_string(), json!({"output": 3.0})),
    ];
    let result = aggregate(&AggregationMethod::Median, &per_node, |_| 1.0);
    assert_eq!(result["aggregated_output"], 3.0);
}

#[test]
fn non_numeric_outputs_are_excluded_from_numerics() {
    let per_node = vec![("n1".to_string(), json!({"output": "not a number"})), ("n2".to_string(), json!({"output": 4.0}))];
    let result = aggregate(&AggregationMethod::FederatedAveraging, &per_node, |_| 1.0);
    assert_eq!(result["aggregated_output"], 4.0);
    assert_eq!(result["node_count"], 2);
}
