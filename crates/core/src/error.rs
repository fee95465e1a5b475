// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared across the orchestrator, daemon, and RPC layers.
//!
//! Each variant maps to a stable string tag via [`DimError::kind`] so wire
//! responses can carry the tag independently of the human-readable message
//! (the message is free to change; the tag is the stable contract clients
//! match on).

use thiserror::Error;

/// Stable error tag, independent of the `Display` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidSpec,
    InsufficientResources,
    QueueFull,
    ModelUnavailable,
    CacheFull,
    AgentCrashed,
    Timeout,
    RateLimitExceeded,
    RpcUnavailable,
    Internal,
}

crate::simple_display! {
    ErrorKind {
        InvalidSpec => "INVALID_SPEC",
        InsufficientResources => "INSUFFICIENT_RESOURCES",
        QueueFull => "QUEUE_FULL",
        ModelUnavailable => "MODEL_UNAVAILABLE",
        CacheFull => "CACHE_FULL",
        AgentCrashed => "AGENT_CRASHED",
        Timeout => "TIMEOUT",
        RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
        RpcUnavailable => "RPC_UNAVAILABLE",
        Internal => "INTERNAL_ERROR",
    }
}

/// Unified error type for the DIM core domain.
#[derive(Debug, Error)]
pub enum DimError {
    #[error("invalid job spec: {0}")]
    InvalidSpec(String),

    #[error("insufficient resources: {0}")]
    InsufficientResources(String),

    #[error("queue full (max_size={max_size})")]
    QueueFull { max_size: usize },

    #[error("model unavailable: {model_id}: {reason}")]
    ModelUnavailable { model_id: String, reason: String },

    #[error("cache full: could not free enough space for {model_id} ({needed_bytes} bytes)")]
    CacheFull { model_id: String, needed_bytes: u64 },

    #[error("agent crashed: {0}")]
    AgentCrashed(String),

    #[error("timeout after {elapsed_secs}s (limit {limit_secs}s)")]
    Timeout { elapsed_secs: u64, limit_secs: u64 },

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("rpc unavailable: {0}")]
    RpcUnavailable(String),

    #[error("internal error [{correlation_id}]: {message}")]
    Internal { correlation_id: String, message: String },
}

impl DimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DimError::InvalidSpec(_) => ErrorKind::InvalidSpec,
            DimError::InsufficientResources(_) => ErrorKind::InsufficientResources,
            DimError::QueueFull { .. } => ErrorKind::QueueFull,
            DimError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            DimError::CacheFull { .. } => ErrorKind::CacheFull,
            DimError::AgentCrashed(_) => ErrorKind::AgentCrashed,
            DimError::Timeout { .. } => ErrorKind::Timeout,
            DimError::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
            DimError::RpcUnavailable(_) => ErrorKind::RpcUnavailable,
            DimError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        DimError::Internal { correlation_id: nanoid::nanoid!(10), message: message.into() }
    }
}

pub type DimResult<T> = Result<T, DimError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
