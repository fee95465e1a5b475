// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dim list` - page through submitted jobs

use anyhow::{bail, Result};
use clap::Args;
use dim_core::JobState;

use crate::client::OrchestratorClient;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct ListArgs {
    /// Only show jobs submitted by this user
    #[arg(long)]
    pub user: Option<String>,

    /// Only show jobs in this state: queued, running, completed, failed, cancelled
    #[arg(long)]
    pub status: Option<String>,

    /// Page size
    #[arg(long, default_value_t = 50)]
    pub limit: u32,

    /// Page offset
    #[arg(long, default_value_t = 0)]
    pub offset: u32,
}

pub async fn handle(client: &OrchestratorClient, args: ListArgs, format: OutputFormat) -> Result<()> {
    let status_filter = match args.status.as_deref() {
        Some("queued") => Some(JobState::Queued),
        Some("running") => Some(JobState::Running),
        Some("completed") => Some(JobState::Completed),
        Some("failed") => Some(JobState::Failed),
        Some("cancelled") => Some(JobState::Cancelled),
        Some(other) => bail!("unknown status {other:?}"),
        None => None,
    };

    let (jobs, total) = client.list_jobs(args.user, status_filter, args.limit, args.offset).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({"jobs": jobs, "total": total}))?);
        }
        OutputFormat::Text => {
            for job in &jobs {
                println!("{}  {:<10}  {:<13}  submitted {}ms", job.job_id, job.state, job.pattern, job.submitted_at_ms);
            }
            println!("\n{} of {total} jobs", jobs.len());
        }
    }
    Ok(())
}
