// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dimo`: the orchestrator binary. Wires config, node discovery, peer
//! coordination, the dispatch core, and the RPC listener together, then
//! runs until killed.

use clap::Parser;
use dim_core::{OrchestratorId, SystemClock};
use dim_net::{Monitoring, RateLimiter};
use dim_objectstore::InMemoryObjectStore;
use dim_orchestrator::{DaemonClient, NodeDiscovery, NodeRegistry, Orchestrator, OrchestratorConfig, OrchestratorCoordinator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "dimo", about = "Distributed inference mesh orchestrator")]
struct Args {
    /// Path to a TOML config file. Falls back to defaults plus `DIM_ORCHESTRATOR_*` env overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for orchestrator log files (stdout logging is always on too).
    #[arg(long, env = "DIM_ORCHESTRATOR_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_tracing(args.log_dir.as_deref());
    run(args).await
}

fn init_tracing(log_dir: Option<&std::path::Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "dimo.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).init();
            None
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = OrchestratorConfig::load(args.config.as_deref())?;
    let orchestrator_id = match &config.orchestrator_id {
        Some(id) => OrchestratorId::from_string(id.clone()),
        None => OrchestratorId::new(),
    };
    tracing::info!(orchestrator_id = %orchestrator_id, grpc_address = %config.grpc_address, "starting dimo");

    let clock = SystemClock;
    let store: Arc<dyn dim_objectstore::ObjectStore> = Arc::new(InMemoryObjectStore::new());

    let registry = Arc::new(NodeRegistry::new(clock.clone(), config.node_heartbeat_timeout(), config.registry_cache_ttl()));
    let discovery = Arc::new(NodeDiscovery::new(
        store.clone(),
        registry.clone(),
        clock.clone(),
        config.registry_key.clone(),
        config.registry_cache_ttl(),
        config.registry_cache_ttl() * 2,
    ));

    let daemon_client = Arc::new(DaemonClient::new(
        clock.clone(),
        config.connection_pool.max_connections_per_endpoint,
        config.connection_idle_timeout(),
    ));

    let coordinator = Arc::new(OrchestratorCoordinator::new(
        store.clone(),
        orchestrator_id,
        clock.clone(),
        config.heartbeat_interval(),
        config.heartbeat_timeout(),
        config.active_job_threshold,
    ));

    let mut rate_limiter = if config.rate_limit.enabled {
        RateLimiter::new(clock.clone(), config.rate_limit.default_rate_per_minute, config.rate_limit.burst_size)
    } else {
        RateLimiter::new(clock.clone(), f64::MAX, f64::MAX)
    };
    for (id, (rate, burst)) in &config.rate_limit.user_limits {
        rate_limiter = rate_limiter.with_override(id.clone(), *rate, *burst);
    }

    let orchestrator = Arc::new(Orchestrator::new(
        orchestrator_id,
        config.max_concurrent_jobs,
        registry,
        daemon_client,
        coordinator.clone(),
        store,
        rate_limiter,
        Monitoring::new(),
        clock,
    ));

    tokio::spawn({
        let discovery = discovery.clone();
        async move {
            if let Err(e) = discovery.run().await {
                tracing::error!(error = %e, "node discovery loop exited");
            }
        }
    });
    let node_heartbeat_timeout = config.node_heartbeat_timeout();
    tokio::spawn({
        let discovery = discovery.clone();
        async move { discovery.sweep_stale_loop(node_heartbeat_timeout).await }
    });

    tokio::spawn({
        let coordinator = coordinator.clone();
        async move {
            if let Err(e) = coordinator.run().await {
                tracing::error!(error = %e, "orchestrator coordination loop exited");
            }
        }
    });
    tokio::spawn({
        let coordinator = coordinator.clone();
        let orchestrator = orchestrator.clone();
        async move { coordinator.run_heartbeat_loop(move || orchestrator.active_job_count_sync()).await }
    });
    tokio::spawn(delegated_assignment_loop(orchestrator.clone(), coordinator));

    dim_orchestrator::listener::serve(orchestrator, &config.grpc_address).await?;
    Ok(())
}

async fn delegated_assignment_loop<C: dim_core::Clock + 'static>(
    orchestrator: Arc<Orchestrator<C>>,
    coordinator: Arc<OrchestratorCoordinator<C>>,
) {
    loop {
        let assignment = coordinator.next_assignment().await;
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.run_delegated_assignment(assignment.job_id, assignment.job_spec).await;
        });
    }
}
