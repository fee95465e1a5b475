// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed set of execution patterns and their per-pattern configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Composition shape for a job. Closed set — dispatch is a `match`, never a
/// dynamic registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    Collaborative,
    Comparative,
    Chained,
}

crate::simple_display! {
    Pattern {
        Collaborative => "collaborative",
        Comparative => "comparative",
        Chained => "chained",
    }
}

/// Aggregation method for the collaborative pattern.
///
/// Unknown tags are accepted (the core contract only requires the aggregator
/// be a deterministic pure function of the method tag and sub-output
/// multiset); `Custom` preserves the tag for engines to special-case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    FederatedAveraging,
    WeightedAverage,
    Median,
    #[serde(untagged)]
    Custom(String),
}

impl AggregationMethod {
    pub fn as_str(&self) -> &str {
        match self {
            AggregationMethod::FederatedAveraging => "federated_averaging",
            AggregationMethod::WeightedAverage => "weighted_average",
            AggregationMethod::Median => "median",
            AggregationMethod::Custom(s) => s,
        }
    }
}

/// Consensus method for the comparative pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusMethod {
    MajorityVote,
    WeightedVote,
    ExpertReview,
    #[serde(untagged)]
    Custom(String),
}

impl ConsensusMethod {
    pub fn as_str(&self) -> &str {
        match self {
            ConsensusMethod::MajorityVote => "majority_vote",
            ConsensusMethod::WeightedVote => "weighted_vote",
            ConsensusMethod::ExpertReview => "expert_review",
            ConsensusMethod::Custom(s) => s,
        }
    }
}

/// Failure policy for a chained pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    FailFast,
    RollbackAndRetry,
}

impl Default for OnFailure {
    fn default() -> Self {
        OnFailure::FailFast
    }
}

fn default_max_retries() -> u32 {
    1
}

/// Failure-handling config for a chained pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandling {
    #[serde(default)]
    pub on_failure: OnFailure,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ErrorHandling {
    fn default() -> Self {
        Self { on_failure: OnFailure::default(), max_retries: default_max_retries() }
    }
}

/// Aggregation config attached to a collaborative spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    pub method: AggregationMethod,
}

/// Consensus config attached to a comparative spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    pub method: ConsensusMethod,
    #[serde(default = "default_min_agreement")]
    pub min_agreement: f64,
}

fn default_min_agreement() -> f64 {
    0.75
}

/// Data requirements a collaborative subjob carries to the target node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataRequirements {
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

/// One step of a chained pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    pub step: u32,
    pub name: String,
    pub model_id: String,
    pub node_id: String,
    /// "client_data" on step 1 reads the job's `input_data`; otherwise the
    /// prior step's result feeds this step.
    #[serde(default)]
    pub input_source: Option<String>,
    #[serde(default = "default_step_timeout")]
    pub timeout: u64,
}

fn default_step_timeout() -> u64 {
    120
}

/// Pattern-shaped job configuration. Closed enum — the Rust-native
/// replacement for a dynamically-typed config dict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum PatternConfig {
    Collaborative {
        model_id: String,
        nodes: Vec<String>,
        aggregation: AggregationConfig,
        #[serde(default)]
        data_requirements: DataRequirements,
        #[serde(default = "default_subjob_timeout")]
        timeout: u64,
    },
    Comparative {
        model_ids: Vec<String>,
        node_id: String,
        consensus: ConsensusConfig,
        #[serde(default)]
        data_source: Option<String>,
        #[serde(default = "default_subjob_timeout")]
        timeout: u64,
    },
    Chained {
        pipeline: Vec<PipelineStep>,
        #[serde(default)]
        error_handling: ErrorHandling,
    },
}

fn default_subjob_timeout() -> u64 {
    120
}

impl PatternConfig {
    pub fn pattern(&self) -> Pattern {
        match self {
            PatternConfig::Collaborative { .. } => Pattern::Collaborative,
            PatternConfig::Comparative { .. } => Pattern::Comparative,
            PatternConfig::Chained { .. } => Pattern::Chained,
        }
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
