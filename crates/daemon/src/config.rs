// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: defaults, TOML file, environment overrides — in
//! that increasing order of precedence.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_cache_dir() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("dim").join("models")
}

fn default_max_cache_gb() -> f64 {
    50.0
}

fn default_max_concurrent_jobs() -> u32 {
    10
}

fn default_max_memory_gb() -> f64 {
    64.0
}

fn default_max_cpu_percent() -> f64 {
    80.0
}

fn default_grpc_address() -> String {
    "127.0.0.1:7420".to_string()
}

/// Prewarming config: fetch popular models before they're first requested.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrewarmConfig {
    pub enabled: bool,
    pub popular_models: Vec<String>,
    pub min_access_count: u32,
    pub access_window_hours: u32,
}

impl Default for PrewarmConfig {
    fn default() -> Self {
        Self { enabled: false, popular_models: Vec::new(), min_access_count: 5, access_window_hours: 24 }
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
        Self { enabled: true, default_rate_per_minute: 60.0, burst_size: 10.0, user_limits: Default::default() }
    }
}

/// Connection-pool tuning, shared shape with the orchestrator.
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

/// TLS material, mirrored from §6 of the spec. `spec.md` treats TLS
/// transport as a non-goal, so these fields are declared and parsed but
/// never consulted by `listener.rs` — a config naming them is accepted
/// rather than silently rejecting the unknown keys.
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
pub struct DaemonConfig {
    pub node_id: Option<String>,
    #[serde(default = "default_grpc_address")]
    pub grpc_address: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_max_cache_gb")]
    pub max_cache_gb: f64,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: u32,
    #[serde(default = "default_max_memory_gb")]
    pub max_memory_gb: f64,
    #[serde(default = "default_max_cpu_percent")]
    pub max_cpu_percent: f64,
    pub prewarm: PrewarmConfig,
    pub rate_limit: RateLimitConfig,
    pub connection_pool: ConnectionPoolConfig,
    pub security: SecurityConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            grpc_address: default_grpc_address(),
            cache_dir: default_cache_dir(),
            max_cache_gb: default_max_cache_gb(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            max_memory_gb: default_max_memory_gb(),
            max_cpu_percent: default_max_cpu_percent(),
            prewarm: PrewarmConfig::default(),
            rate_limit: RateLimitConfig::default(),
            connection_pool: ConnectionPoolConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl DaemonConfig {
    pub fn max_cache_bytes(&self) -> u64 {
        (self.max_cache_gb * 1024.0 * 1024.0 * 1024.0) as u64
    }

    pub fn connection_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_pool.idle_timeout_seconds)
    }

    /// Load from a TOML file, then apply `DIM_DAEMON_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|e| ConfigError::Read(p.to_path_buf(), e))?;
                toml::from_str(&text).map_err(|e| ConfigError::Parse(p.to_path_buf(), e))?
            }
            None => DaemonConfig::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DIM_DAEMON_NODE_ID") {
            self.node_id = Some(v);
        }
        if let Ok(v) = std::env::var("DIM_DAEMON_GRPC_ADDRESS") {
            self.grpc_address = v;
        }
        if let Ok(v) = std::env::var("DIM_DAEMON_CACHE_DIR") {
            self.cache_dir = PathBuf::from(v);
        }
        if let Some(v) = std::env::var("DIM_DAEMON_MAX_CACHE_GB").ok().and_then(|s| s.parse().ok()) {
            self.max_cache_gb = v;
        }
        if let Some(v) = std::env::var("DIM_DAEMON_MAX_CONCURRENT_JOBS").ok().and_then(|s| s.parse().ok()) {
            self.max_concurrent_jobs = v;
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
