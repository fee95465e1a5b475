// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dim result` - fetch a completed job's output

use anyhow::Result;
use clap::Args;
use dim_core::JobId;

use crate::client::OrchestratorClient;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct ResultArgs {
    /// Job ID to fetch the result for
    pub job_id: String,
}

pub async fn handle(client: &OrchestratorClient, args: ResultArgs, format: OutputFormat) -> Result<()> {
    let job_id = JobId::from_string(args.job_id);
    let (output, metadata) = client.get_job_result(job_id).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({"output": output, "metadata": metadata}))?);
        }
        OutputFormat::Text => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            println!(
                "\nnodes used: {}, execution time: {}ms, cost: {}",
                metadata.nodes_used, metadata.total_execution_time_ms, metadata.total_cost
            );
        }
    }
    Ok(())
}
