// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dimd`: the worker-node daemon binary. Wires config, the dispatch core,
//! and the RPC listener together, then runs until killed.

use clap::Parser;
use dim_core::{NodeId, SystemClock};
use dim_daemon::model_cache::ObjectStoreModelFetcher;
use dim_daemon::prewarm::{AccessTracker, Prewarmer};
use dim_daemon::resource_manager::ResourceManager;
use dim_daemon::system_sampler::SystemResourceSampler;
use dim_daemon::{AgentSupervisor, Daemon, DaemonConfig, FixedBinaryCommandBuilder, ModelCache};
use dim_net::{Monitoring, RateLimiter};
use dim_objectstore::InMemoryObjectStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "dimd", about = "Distributed inference mesh worker daemon")]
struct Args {
    /// Path to a TOML config file. Falls back to defaults plus `DIM_DAEMON_*` env overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Executable invoked per job as `<binary> --model-id <id> --model-path <path>`.
    #[arg(long, env = "DIM_DAEMON_AGENT_BINARY", default_value = "dim-agent")]
    agent_binary: String,

    /// Directory for daemon log files (stdout logging is always on too).
    #[arg(long, env = "DIM_DAEMON_LOG_DIR")]
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
            let file_appender = tracing_appender::rolling::daily(dir, "dimd.log");
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
    let config = DaemonConfig::load(args.config.as_deref())?;
    let node_id = match &config.node_id {
        Some(id) => NodeId::from_string(id.clone()),
        None => NodeId::new(),
    };
    tracing::info!(node_id = %node_id, grpc_address = %config.grpc_address, "starting dimd");

    let clock = SystemClock;
    let store: Arc<dyn dim_objectstore::ObjectStore> = Arc::new(InMemoryObjectStore::new());

    std::fs::create_dir_all(&config.cache_dir)?;
    let model_cache = ModelCache::new(
        config.cache_dir.clone(),
        config.max_cache_bytes(),
        ObjectStoreModelFetcher::new(store.clone()),
        clock.clone(),
    );

    let resource_manager =
        ResourceManager::new(SystemResourceSampler::new(), config.max_concurrent_jobs, config.max_cpu_percent);
    let supervisor = AgentSupervisor::new();
    let command_builder: Arc<dyn dim_daemon::AgentCommandBuilder> =
        Arc::new(FixedBinaryCommandBuilder::new(args.agent_binary.clone()));

    let mut rate_limiter = if config.rate_limit.enabled {
        RateLimiter::new(clock.clone(), config.rate_limit.default_rate_per_minute, config.rate_limit.burst_size)
    } else {
        RateLimiter::new(clock.clone(), f64::MAX, f64::MAX)
    };
    for (id, (rate, burst)) in &config.rate_limit.user_limits {
        rate_limiter = rate_limiter.with_override(id.clone(), *rate, *burst);
    }

    let access_tracker =
        Arc::new(AccessTracker::new(clock.clone(), Duration::from_secs(config.prewarm.access_window_hours as u64 * 3600)));

    let daemon = Arc::new(Daemon::new(
        node_id,
        (config.max_concurrent_jobs as usize) * 100,
        resource_manager,
        model_cache,
        supervisor,
        command_builder,
        store,
        rate_limiter,
        Monitoring::new(),
        clock,
        access_tracker,
    ));

    tokio::spawn(daemon.clone().run_dispatcher());
    tokio::spawn(heartbeat_loop(daemon.clone()));

    if config.prewarm.enabled {
        tokio::spawn(prewarm_loop(daemon.clone(), config.clone()));
    }

    dim_daemon::listener::serve(daemon, &config.grpc_address).await?;
    Ok(())
}

async fn heartbeat_loop<S, F, C>(daemon: Arc<Daemon<S, F, C>>)
where
    S: dim_daemon::resource_manager::ResourceSampler + 'static,
    F: dim_daemon::model_cache::ModelFetcher + 'static,
    C: dim_core::Clock,
{
    let mut interval = tokio::time::interval(Duration::from_secs(10));
    loop {
        interval.tick().await;
        if let Err(e) = daemon.publish_heartbeat().await {
            tracing::warn!(error = %e, "failed to publish heartbeat");
        }
    }
}

async fn prewarm_loop(daemon: Arc<Daemon<SystemResourceSampler, ObjectStoreModelFetcher, SystemClock>>, config: DaemonConfig) {
    let prewarmer = Prewarmer::new(
        config.prewarm.enabled,
        config.prewarm.popular_models.clone(),
        config.prewarm.min_access_count,
        daemon.model_cache_handle(),
        daemon.access_tracker_handle(),
    );
    let mut interval = tokio::time::interval(Duration::from_secs(300));
    loop {
        interval.tick().await;
        prewarmer.run_once().await;
    }
}
