// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data-parallel pattern: one model fanned out to several nodes, results
//! aggregated across the multiset of sub-outputs.

use super::{aggregation, run_subjob, PatternContext};
use dim_core::{Clock, DimError, DimResult, PatternConfig};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub fn validate(model_id: &str, nodes: &[String]) -> DimResult<()> {
    if nodes.len() < 2 {
        return Err(DimError::InvalidSpec("collaborative config requires at least 2 nodes".to_string()));
    }
    if model_id.is_empty() {
        return Err(DimError::InvalidSpec("collaborative config requires a model_id".to_string()));
    }
    Ok(())
}

pub async fn execute<C: Clock>(
    ctx: &PatternContext<C>,
    config: &PatternConfig,
    input_data: &Value,
    cancel: &CancellationToken,
) -> DimResult<Value> {
    let PatternConfig::Collaborative { model_id, nodes, aggregation: agg_config, timeout, .. } = config else {
        return Err(DimError::internal("collaborative engine given a non-collaborative config"));
    };
    validate(model_id, nodes)?;

    let mut set = tokio::task::JoinSet::new();
    for node_id in nodes {
        let address = ctx.resolve_address(node_id)?;
        let client = ctx.daemon_client.clone();
        let model_id = model_id.clone();
        let input_data = input_data.clone();
        let node_id = node_id.clone();
        let timeout_secs = *timeout;
        let cancel = cancel.clone();
        set.spawn(async move {
            let result = run_subjob(&client, &address, &model_id, None, &input_data, timeout_secs, &cancel).await;
            (node_id, result)
        });
    }

    let mut successes = Vec::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                set.abort_all();
                return Err(DimError::internal("job cancelled"));
            }
            joined = set.join_next() => {
                match joined {
                    None => break,
                    Some(result) => {
                        let (node_id, outcome) = result.map_err(|e| DimError::internal(e.to_string()))?;
                        match outcome {
                            Ok(value) => successes.push((node_id, value)),
                            Err(e) => tracing::warn!(node_id, error = %e, "collaborative subjob failed"),
                        }
                    }
                }
            }
        }
    }

    if successes.is_empty() {
        return Err(DimError::internal("all collaborative subjobs failed; at least one success is required"));
    }

    Ok(aggregation::aggregate(&agg_config.method, &successes, |node_id| ctx.reputation_of(node_id)))
}

#[cfg(test)]
#[path = "collaborative_tests.rs"]
mod tests;
