// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::pattern::{AggregationConfig, AggregationMethod};

fn sample_config() -> PatternConfig {
    PatternConfig::Collaborative {
        model_id: "llama-3".into(),
        nodes: vec!["node-a".into(), "node-b".into()],
        aggregation: AggregationConfig { method: AggregationMethod::FederatedAveraging },
        data_requirements: Default::default(),
        timeout: 120,
    }
}

#[test]
fn priority_defaults_to_normal_when_absent() {
    let json = serde_json::json!({
        "config": {
            "pattern": "collaborative",
            "model_id": "llama-3",
            "nodes": ["node-a"],
            "aggregation": {"method": "median"},
        },
    });
    let spec: JobSpec = serde_json::from_value(json).unwrap();
    assert_eq!(spec.priority, Priority::Normal);
    assert!(spec.job_id.is_none());
}

#[test]
fn pattern_accessor_matches_config() {
    let spec = JobSpec {
        job_id: Some(JobId::new()),
        config: sample_config(),
        input_data: serde_json::Value::Null,
        priority: Priority::High,
        max_cost: Some(1.5),
        metadata: Default::default(),
    };
    assert_eq!(spec.pattern(), crate::pattern::Pattern::Collaborative);
}

#[test]
fn job_id_carries_stable_prefix() {
    let id = JobId::new();
    assert!(id.as_str().starts_with("job-"));
}
