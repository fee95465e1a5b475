// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration: defaults, TOML file, environment overrides —
//! in that increasing order of precedence.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_grpc_address() -> String {
    "127.0.0.1:7520".to_string()
}

fn default_coordination_topic() -> String {
    dim_objectstore::topics::ORCHESTRATORS_COORDINATION.to_string()
}

fn default_heartbeat_topic() -> String {
    dim_objectstore::topics::ORCHESTRATORS_HEARTBEAT.to_string()
}

fn default_heartbeat_interval_seconds() -> u64 {
    30
}

fn default_heartbeat_timeout_seconds() -> u64 {
    90
}

fn default_max_concurrent_jobs() -> u32 {
    100
}

fn default_node_heartbeat_timeout_seconds() -> u64 {
    90
}

fn default_registry_cache_ttl_seconds() -> u64 {
    30
}

fn default_registry_key() -> String {
    "dim-registry".to_string()
}

fn default_active_job_threshold() -> u32 {
    50
}

/// Connection-pool tuning, shared shape with the daemon.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionPoolConfig {
    pub max_connections_per_endpoint: usize,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self { max_connections_per_endpoint: 10, connection_timeout_seconds: 30, idle_timeout_seconds: 300 }
    }
}

/// Rate-limiting config, mirrored from §6 of the spec.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub default_rate_per_minute: f64,
    pub burst_size: f64,
    pub user_limits: std::collections::HashMap<String, (f64, f64)>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { enabled: true, default_rate_per_minute: 120.0, burst_size: 20.0, user_limits: Default::default() }
    }
}

/// TLS material, mirrored from §6 of the spec. `spec.md` treats TLS
/// transport as a non-goal, so these fields are declared and parsed but
/// never consulted by `listener.rs`/`daemon_client.rs` — a config naming
/// them is accepted rather than silently rejecting the unknown keys.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub enable_tls: bool,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    pub tls_ca: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub orchestrator_id: Option<String>,
    #[serde(default = "default_grpc_address")]
    pub grpc_address: String,
    #[serde(default = "default_coordination_topic")]
    pub coordination_topic: String,
    #[serde(default = "default_heartbeat_topic")]
    pub heartbeat_topic: String,
    #[serde(default = "default_heartbeat_interval_seconds")]
    pub heartbeat_interval_seconds: u64,
    #[serde(default = "default_heartbeat_timeout_seconds")]
    pub heartbeat_timeout_seconds: u64,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: u32,
    #[serde(default = "default_active_job_threshold")]
    pub active_job_threshold: u32,
    #[serde(default = "default_node_heartbeat_timeout_seconds")]
    pub node_heartbeat_timeout_seconds: u64,
    #[serde(default = "default_registry_cache_ttl_seconds")]
    pub registry_cache_ttl_seconds: u64,
    #[serde(default = "default_registry_key")]
    pub registry_key: String,
    pub rate_limit: RateLimitConfig,
    pub connection_pool: ConnectionPoolConfig,
    pub security: SecurityConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            orchestrator_id: None,
            grpc_address: default_grpc_address(),
            coordination_topic: default_coordination_topic(),
            heartbeat_topic: default_heartbeat_topic(),
            heartbeat_interval_seconds: default_heartbeat_interval_seconds(),
            heartbeat_timeout_seconds: default_heartbeat_timeout_seconds(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            active_job_threshold: default_active_job_threshold(),
            node_heartbeat_timeout_seconds: default_node_heartbeat_timeout_seconds(),
            registry_cache_ttl_seconds: default_registry_cache_ttl_seconds(),
            registry_key: default_registry_key(),
            rate_limit: RateLimitConfig::default(),
            connection_pool: ConnectionPoolConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_seconds)
    }

    pub fn node_heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.node_heartbeat_timeout_seconds)
    }

    pub fn registry_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.registry_cache_ttl_seconds)
    }

    pub fn connection_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_pool.idle_timeout_seconds)
    }

    /// Load from a TOML file, then apply `DIM_ORCHESTRATOR_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|e| ConfigError::Read(p.to_path_buf(), e))?;
                toml::from_str(&text).map_err(|e| ConfigError::Parse(p.to_path_buf(), e))?
            }
            None => OrchestratorConfig::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DIM_ORCHESTRATOR_ID") {
            self.orchestrator_id = Some(v);
        }
        if let Ok(v) = std::env::var("DIM_ORCHESTRATOR_GRPC_ADDRESS") {
            self.grpc_address = v;
        }
        if let Some(v) = std::env::var("DIM_ORCHESTRATOR_MAX_CONCURRENT_JOBS").ok().and_then(|s| s.parse().ok()) {
            self.max_concurrent_jobs = v;
        }
        if let Some(v) = std::env::var("DIM_ORCHESTRATOR_ACTIVE_JOB_THRESHOLD").ok().and_then(|s| s.parse().ok()) {
            self.active_job_threshold = v;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse config at {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
