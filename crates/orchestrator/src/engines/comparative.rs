// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Model-parallel pattern: several models executed on one node against the
//! same data, reconciled via consensus.

use super::{consensus, run_subjob, PatternContext};
use dim_core::{Clock, DimError, DimResult, PatternConfig};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub fn validate(model_ids: &[String], node_id: &str) -> DimResult<()> {
    if model_ids.len() < 2 {
        return Err(DimError::InvalidSpec("comparative config requires at least 2 model_ids".to_string()));
    }
    if node_id.is_empty() {
        return Err(DimError::InvalidSpec("comparative config requires a node_id".to_string()));
    }
    Ok(())
}

pub async fn execute<C: Clock>(
    ctx: &PatternContext<C>,
    config: &PatternConfig,
    input_data: &Value,
    cancel: &CancellationToken,
) -> DimResult<Value> {
    let PatternConfig::Comparative { model_ids, node_id, consensus: consensus_config, data_source, timeout } = config else {
        return Err(DimError::internal("comparative engine given a non-comparative config"));
    };
    validate(model_ids, node_id)?;
    let address = ctx.resolve_address(node_id)?;

    let mut set = tokio::task::JoinSet::new();
    for model_id in model_ids {
        let client = ctx.daemon_client.clone();
        let address = address.clone();
        let model_id = model_id.clone();
        let data_source = data_source.clone();
        let input_data = input_data.clone();
        let timeout_secs = *timeout;
        let cancel = cancel.clone();
        set.spawn(async move {
            let result = run_subjob(&client, &address, &model_id, data_source, &input_data, timeout_secs, &cancel).await;
            (model_id, result)
        });
    }

    let mut outputs = Vec::new();
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
                        let (model_id, outcome) = result.map_err(|e| DimError::internal(e.to_string()))?;
                        match outcome {
                            Ok(value) => outputs.push((model_id, value)),
                            Err(e) => tracing::warn!(model_id, error = %e, "comparative subjob failed"),
                        }
                    }
                }
            }
        }
    }

    if outputs.is_empty() {
        return Err(DimError::internal("all comparative subjobs failed; consensus requires at least one output"));
    }

    let aggregated = consensus::aggregate(&consensus_config.method, consensus_config.min_agreement, &outputs, |model_id| {
        ctx.model_reputation.reputation_of(model_id)
    });
    for (model_id, agreed) in &aggregated.agreements {
        ctx.model_reputation.record_agreement(model_id, *agreed);
    }
    Ok(aggregated.result)
}

#[cfg(test)]
#[path = "comparative_tests.rs"]
mod tests;
