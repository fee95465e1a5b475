// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dim cancel` - cancel a queued or running job

use anyhow::Result;
use clap::Args;
use dim_core::JobId;

use crate::client::OrchestratorClient;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct CancelArgs {
    /// Job ID to cancel
    pub job_id: String,

    /// User ID that owns the job
    #[arg(long)]
    pub user: String,
}

pub async fn handle(client: &OrchestratorClient, args: CancelArgs, format: OutputFormat) -> Result<()> {
    let job_id = JobId::from_string(args.job_id);
    let (success, message) = client.cancel_job(job_id, args.user).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({"success": success, "message": message}))?);
        }
        OutputFormat::Text => println!("{message}"),
    }

    if !success {
        return Err(ExitError::new(1, message).into());
    }
    Ok(())
}
