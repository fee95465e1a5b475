// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dim submit` - submit a new job

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use dim_core::{PatternConfig, Priority};

use crate::client::OrchestratorClient;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct SubmitArgs {
    /// Path to a JSON file holding the pattern config (collaborative/comparative/chained)
    #[arg(long)]
    pub config: PathBuf,

    /// Path to a JSON file holding the input data passed to the job. Defaults to `null`.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// User ID the job is submitted on behalf of
    #[arg(long)]
    pub user: String,

    /// Priority band: low, normal, or high
    #[arg(long, default_value = "normal")]
    pub priority: String,

    /// Advisory cost ceiling in whatever unit the node pool reports costs in
    #[arg(long)]
    pub max_cost: Option<f64>,
}

pub async fn handle(client: &OrchestratorClient, args: SubmitArgs, format: OutputFormat) -> Result<()> {
    let config_bytes = std::fs::read(&args.config)
        .with_context(|| format!("reading pattern config from {}", args.config.display()))?;
    let config: PatternConfig =
        serde_json::from_slice(&config_bytes).with_context(|| "pattern config is not valid JSON for a known pattern")?;
    let pattern = config.pattern();
    let config_json = serde_json::to_value(&config)?;

    let input_data_json = match &args.input {
        Some(path) => {
            let bytes = std::fs::read(path).with_context(|| format!("reading input data from {}", path.display()))?;
            serde_json::from_slice(&bytes).with_context(|| "input data is not valid JSON")?
        }
        None => serde_json::Value::Null,
    };

    let priority = match args.priority.as_str() {
        "low" => Priority::Low,
        "normal" => Priority::Normal,
        "high" => Priority::High,
        other => bail!("unknown priority {other:?}, expected low, normal, or high"),
    };

    let (job_id, status) =
        client.submit_job(args.user, pattern, config_json, input_data_json, priority, args.max_cost).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({"job_id": job_id, "status": status}))?);
        }
        OutputFormat::Text => println!("Submitted {job_id} ({status})"),
    }
    Ok(())
}
