// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC client the orchestrator uses to drive a daemon's `SubmitJob` /
//! `GetJobStatus` surface, pooled per endpoint address.

use dim_core::Clock;
use dim_net::ConnectionPool;
use dim_wire::{read_message, write_message, DaemonRequest, DaemonResponse, ProtocolError};
use std::time::Duration;
use tokio::net::TcpStream;

#[derive(Debug, thiserror::Error)]
pub enum DaemonClientError {
    #[error("failed to connect to daemon at {endpoint}: {source}")]
    Connect { endpoint: String, source: std::io::Error },
    #[error("protocol error talking to daemon at {endpoint}: {source}")]
    Protocol { endpoint: String, source: ProtocolError },
}

/// Pooled client for one orchestrator's daemon RPC traffic. Connections are
/// round-tripped on a single in-order request/response pair (no pipelining,
/// matching the daemon listener's one-request-at-a-time loop) and returned
/// to the pool on success; a connection that errors mid-call is dropped
/// rather than returned, since its framing state is no longer trustworthy.
pub struct DaemonClient<C: Clock> {
    pool: ConnectionPool<TcpStream, C>,
}

impl<C: Clock> DaemonClient<C> {
    pub fn new(clock: C, max_per_endpoint: usize, idle_timeout: Duration) -> Self {
        Self { pool: ConnectionPool::new(clock, max_per_endpoint, idle_timeout) }
    }

    pub async fn call(&self, endpoint: &str, request: DaemonRequest) -> Result<DaemonResponse, DaemonClientError> {
        let mut stream = match self.pool.take_idle(endpoint) {
            Some(stream) => stream,
            None => TcpStream::connect(endpoint)
                .await
                .map_err(|source| DaemonClientError::Connect { endpoint: endpoint.to_string(), source })?,
        };

        match self.round_trip(&mut stream, &request).await {
            Ok(response) => {
                self.pool.return_channel(endpoint, stream);
                Ok(response)
            }
            Err(source) => Err(DaemonClientError::Protocol { endpoint: endpoint.to_string(), source }),
        }
    }

    async fn round_trip(&self, stream: &mut TcpStream, request: &DaemonRequest) -> Result<DaemonResponse, ProtocolError> {
        let payload = dim_wire::encode(request)?;
        write_message(stream, &payload).await?;
        let response_bytes = read_message(stream).await?;
        dim_wire::decode(&response_bytes)
    }

    pub fn sweep_idle(&self) {
        self.pool.sweep_idle();
    }
}

#[cfg(test)]
#[path = "daemon_client_tests.rs"]
mod tests;
