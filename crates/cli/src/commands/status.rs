// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dim status` - poll a job's lifecycle state

use anyhow::Result;
use clap::Args;
use dim_core::JobId;

use crate::client::OrchestratorClient;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct StatusArgs {
    /// Job ID returned by `dim submit`
    pub job_id: String,
}

pub async fn handle(client: &OrchestratorClient, args: StatusArgs, format: OutputFormat) -> Result<()> {
    let job_id = JobId::from_string(args.job_id);
    let status = client.get_job_status(job_id).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Text => {
            println!("job {}: {}", status.job_id, status.state);
            if let Some(error) = &status.error {
                println!("  error: {error}");
            }
            println!("  submitted: {}ms, updated: {}ms", status.submitted_at_ms, status.updated_at_ms);
        }
    }
    Ok(())
}
