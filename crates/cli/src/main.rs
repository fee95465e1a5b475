// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dim`: command-line client for the orchestrator's RPC surface.

mod client;
mod commands;
mod exit_error;
mod output;

use clap::{Parser, Subcommand};
use client::OrchestratorClient;
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "dim", about = "Distributed inference mesh client")]
struct Cli {
    /// Orchestrator address to connect to
    #[arg(long, env = "DIM_ORCHESTRATOR_ADDR", default_value = "127.0.0.1:7520", global = true)]
    address: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a new job
    Submit(commands::submit::SubmitArgs),
    /// Poll a job's lifecycle state
    Status(commands::status::StatusArgs),
    /// Cancel a queued or running job
    Cancel(commands::cancel::CancelArgs),
    /// Fetch a completed job's output
    Result(commands::result::ResultArgs),
    /// Page through submitted jobs
    List(commands::list::ListArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        if let Some(exit_err) = err.downcast_ref::<ExitError>() {
            eprintln!("{}", exit_err.message);
            std::process::exit(exit_err.code);
        }
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = OrchestratorClient::new(cli.address);
    match cli.command {
        Command::Submit(args) => commands::submit::handle(&client, args, cli.format).await,
        Command::Status(args) => commands::status::handle(&client, args, cli.format).await,
        Command::Cancel(args) => commands::cancel::handle(&client, args, cli.format).await,
        Command::Result(args) => commands::result::handle(&client, args, cli.format).await,
        Command::List(args) => commands::list::handle(&client, args, cli.format).await,
    }
}
