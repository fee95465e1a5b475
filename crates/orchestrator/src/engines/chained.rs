// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequential pipeline pattern: steps execute strictly in order, each
//! consuming the prior step's output (or the client's input, if marked).

use super::{run_subjob, PatternContext};
use dim_core::{Clock, DimError, DimResult, OnFailure, PatternConfig, PipelineStep};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

pub fn validate(pipeline: &[PipelineStep]) -> DimResult<()> {
    if pipeline.len() < 2 {
        return Err(DimError::InvalidSpec("chained pipeline requires at least 2 steps".to_string()));
    }
    for (i, step) in pipeline.iter().enumerate() {
        let expected = i as u32 + 1;
        if step.step != expected {
            return Err(DimError::InvalidSpec(format!(
                "pipeline steps must be numbered 1..N strictly increasing; expected {expected}, got {}",
                step.step
            )));
        }
    }
    Ok(())
}

pub async fn execute<C: Clock>(
    ctx: &PatternContext<C>,
    config: &PatternConfig,
    input_data: &Value,
    cancel: &CancellationToken,
) -> DimResult<Value> {
    let PatternConfig::Chained { pipeline, error_handling } = config else {
        return Err(DimError::internal("chained engine given a non-chained config"));
    };
    validate(pipeline)?;

    let max_retries = match error_handling.on_failure {
        OnFailure::RollbackAndRetry => error_handling.max_retries,
        OnFailure::FailFast => 0,
    };

    let mut current_output = input_data.clone();
    let mut trace = Vec::new();
    let mut steps_completed = Vec::new();

    for step in pipeline {
        if cancel.is_cancelled() {
            return Err(DimError::internal("job cancelled"));
        }

        let step_input = match step.input_source.as_deref() {
            Some("client_data") => input_data.clone(),
            _ => current_output.clone(),
        };
        let address = ctx.resolve_address(&step.node_id)?;

        let mut attempt = 0;
        let outcome = loop {
            let result = run_subjob(&ctx.daemon_client, &address, &step.model_id, None, &step_input, step.timeout, cancel).await;
            match result {
                Ok(value) => break Ok(value),
                Err(e) if attempt < max_retries => {
                    attempt += 1;
                    tracing::warn!(step = step.step, attempt, error = %e, "chained step failed, retrying with original input");
                    continue;
                }
                Err(e) => break Err(e),
            }
        };

        match outcome {
            Ok(value) => {
                trace.push(json!({"step": step.step, "name": step.name, "result": value}));
                steps_completed.push(step.step);
                current_output = value;
            }
            Err(e) => {
                return Err(DimError::internal(format!("pipeline failed at step {} ({}): {e}", step.step, step.name)));
            }
        }
    }

    Ok(json!({
        "output": current_output,
        "pipeline_trace": trace,
        "steps_completed": steps_completed,
    }))
}

#[cfg(test)]
#[path = "chained_tests.rs"]
mod tests;
