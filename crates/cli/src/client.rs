// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A thin TCP client for the orchestrator's RPC surface. Each call opens a
//! fresh connection, sends one framed request, and reads back one framed
//! response — commands are infrequent enough that pooling isn't worth it.

use dim_wire::{decode, encode, read_message, write_message, OrchestratorRequest, OrchestratorResponse};
use thiserror::Error;
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach orchestrator at {address}: {source}")]
    Connect { address: String, source: std::io::Error },

    #[error("connection to orchestrator failed: {0}")]
    Protocol(#[from] dim_wire::ProtocolError),

    #[error("orchestrator returned an error ({kind}): {message}")]
    Server { kind: String, message: String },

    #[error("unexpected response from orchestrator: {0:?}")]
    Unexpected(OrchestratorResponse),
}

pub struct OrchestratorClient {
    address: String,
}

impl OrchestratorClient {
    pub fn new(address: impl Into<String>) -> Self {
        Self { address: address.into() }
    }

    async fn send(&self, request: &OrchestratorRequest) -> Result<OrchestratorResponse, ClientError> {
        let mut stream = TcpStream::connect(&self.address)
            .await
            .map_err(|source| ClientError::Connect { address: self.address.clone(), source })?;

        let payload = encode(request)?;
        write_message(&mut stream, &payload).await?;
        let payload = read_message(&mut stream).await?;
        let response: OrchestratorResponse = decode(&payload)?;

        if let OrchestratorResponse::Error { kind, message } = response {
            return Err(ClientError::Server { kind, message });
        }
        Ok(response)
    }

    fn reject(response: OrchestratorResponse) -> Result<std::convert::Infallible, ClientError> {
        Err(ClientError::Unexpected(response))
    }

    pub async fn submit_job(
        &self,
        user_id: String,
        pattern: dim_core::Pattern,
        config_json: serde_json::Value,
        input_data_json: serde_json::Value,
        priority: dim_core::Priority,
        max_cost: Option<f64>,
    ) -> Result<(dim_core::JobId, dim_core::JobState), ClientError> {
        let request = OrchestratorRequest::SubmitJob { user_id, pattern, config_json, input_data_json, priority, max_cost };
        match self.send(&request).await? {
            OrchestratorResponse::JobSubmitted { job_id, status, .. } => Ok((job_id, status)),
            other => match Self::reject(other)? {},
        }
    }

    pub async fn get_job_status(&self, job_id: dim_core::JobId) -> Result<dim_core::JobStatus, ClientError> {
        let request = OrchestratorRequest::GetJobStatus { job_id };
        match self.send(&request).await? {
            OrchestratorResponse::JobStatus(status) => Ok(*status),
            other => match Self::reject(other)? {},
        }
    }

    pub async fn cancel_job(&self, job_id: dim_core::JobId, user_id: String) -> Result<(bool, String), ClientError> {
        let request = OrchestratorRequest::CancelJob { job_id, user_id };
        match self.send(&request).await? {
            OrchestratorResponse::CancelResult { success, message } => Ok((success, message)),
            other => match Self::reject(other)? {},
        }
    }

    pub async fn get_job_result(
        &self,
        job_id: dim_core::JobId,
    ) -> Result<(serde_json::Value, dim_wire::JobResultMetadata), ClientError> {
        let request = OrchestratorRequest::GetJobResult { job_id };
        match self.send(&request).await? {
            OrchestratorResponse::JobResult { result_json, metadata } => Ok((result_json, metadata)),
            other => match Self::reject(other)? {},
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn list_jobs(
        &self,
        user_id: Option<String>,
        status_filter: Option<dim_core::JobState>,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<dim_wire::JobSummaryEntry>, u32), ClientError> {
        let request = OrchestratorRequest::ListJobs { user_id, status_filter, limit, offset };
        match self.send(&request).await? {
            OrchestratorResponse::JobList { jobs, total, .. } => Ok((jobs, total)),
            other => match Self::reject(other)? {},
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
