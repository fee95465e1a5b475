// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pattern_config_tag_selects_pattern() {
    let cfg = PatternConfig::Chained {
        pipeline: vec![PipelineStep {
            step: 1,
            name: "a".into(),
            model_id: "m1".into(),
            node_id: "n1".into(),
            input_source: Some("client_data".into()),
            timeout: 60,
        }],
        error_handling: ErrorHandling::default(),
    };
    assert_eq!(cfg.pattern(), Pattern::Chained);
}

#[test]
fn unknown_aggregation_method_round_trips_as_custom() {
    let json = "\"bayesian_fusion\"";
    let method: AggregationMethod = serde_json::from_str(json).unwrap();
    assert_eq!(method, AggregationMethod::Custom("bayesian_fusion".into()));
    assert_eq!(method.as_str(), "bayesian_fusion");
}

#[test]
fn collaborative_spec_deserializes_with_defaults() {
    let json = serde_json::json!({
        "pattern": "collaborative",
        "model_id": "llama-3",
        "nodes": ["n1", "n2"],
        "aggregation": {"method": "federated_averaging"},
    });
    let cfg: PatternConfig = serde_json::from_value(json).unwrap();
    match cfg {
        PatternConfig::Collaborative { timeout, data_requirements, .. } => {
            assert_eq!(timeout, 120);
            assert!(data_requirements.fields.is_empty());
        }
        _ => panic!("expected collaborative"),
    }
}

#[test]
fn error_handling_defaults_to_fail_fast() {
    let eh = ErrorHandling::default();
    assert_eq!(eh.on_failure, OnFailure::FailFast);
    assert_eq!(eh.max_retries, 1);
}
