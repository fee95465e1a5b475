// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-process agent execution with a wall-clock deadline.
//!
//! Spawns the agent as a separate OS process for strict isolation from the
//! daemon's address space. A reaper task always awaits the child so it is
//! never left a zombie, even on timeout.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Program + args to launch one agent invocation. The daemon core builds
/// this from a `model_path` resolved via [`crate::model_cache::ModelCache`];
/// the supervisor itself is agnostic to what the program does.
#[derive(Debug, Clone)]
pub struct AgentProcessSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl AgentProcessSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("failed to spawn agent process: {0}")]
    Spawn(String),
    #[error("agent process exited without a result (status: {0})")]
    Crashed(String),
    #[error("agent timed out")]
    Timeout,
    #[error("agent cancelled")]
    Cancelled,
    #[error("agent io error: {0}")]
    Io(#[from] std::io::Error),
}

/// How long to wait after SIGTERM before escalating to SIGKILL.
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// A nonzero exit still counts as a delivered result if the agent managed to
/// write a well-formed JSON payload before dying (e.g. it caught its own
/// error and reported it, then exited nonzero to signal it upstream). Only
/// an empty or malformed stdout is treated as a genuine crash — the caller
/// (`core.rs::run_job`) does its own `serde_json::from_slice` on the bytes
/// we hand back, so this check mirrors that exact parse.
fn stdout_holds_a_result(stdout: &[u8]) -> bool {
    !stdout.is_empty() && serde_json::from_slice::<serde_json::Value>(stdout).is_ok()
}

pub struct AgentSupervisor {
    grace_period: Duration,
}

impl Default for AgentSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentSupervisor {
    pub fn new() -> Self {
        Self { grace_period: DEFAULT_GRACE_PERIOD }
    }

    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self { grace_period }
    }

    /// Run `spec` with `input` piped to stdin, bounded by `timeout`, with no
    /// external cancellation source.
    pub async fn run(
        &self,
        spec: &AgentProcessSpec,
        input: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, AgentError> {
        self.run_cancellable(spec, input, timeout, &CancellationToken::new()).await
    }

    /// Like [`Self::run`], but also races a `cancel` token. Cancellation is
    /// delivered to the child exactly like a timeout: SIGTERM, then SIGKILL
    /// after the grace period.
    pub async fn run_cancellable(
        &self,
        spec: &AgentProcessSpec,
        input: &[u8],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, AgentError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| AgentError::Spawn(e.to_string()))?;
        let pid = child.id().ok_or_else(|| AgentError::Spawn("child has no pid".to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            let input = input.to_vec();
            tokio::spawn(async move {
                let _ = stdin.write_all(&input).await;
                let _ = stdin.shutdown().await;
            });
        }

        let (tx, mut rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = match child.wait_with_output().await {
                Ok(output) if output.status.success() => Ok(output.stdout),
                Ok(output) if stdout_holds_a_result(&output.stdout) => Ok(output.stdout),
                Ok(output) => Err(AgentError::Crashed(output.status.to_string())),
                Err(e) => Err(AgentError::Io(e)),
            };
            let _ = tx.send(outcome);
        });

        tokio::select! {
            result = &mut rx => result.unwrap_or(Err(AgentError::Crashed("reaper dropped".to_string()))),
            _ = tokio::time::sleep(timeout) => {
                self.kill_with_grace(pid, &mut rx).await;
                Err(AgentError::Timeout)
            }
            _ = cancel.cancelled() => {
                self.kill_with_grace(pid, &mut rx).await;
                Err(AgentError::Cancelled)
            }
        }
    }

    async fn kill_with_grace(&self, pid: u32, rx: &mut oneshot::Receiver<Result<Vec<u8>, AgentError>>) {
        let nix_pid = Pid::from_raw(pid as i32);
        let _ = signal::kill(nix_pid, Signal::SIGTERM);

        tokio::select! {
            _ = rx => {}
            _ = tokio::time::sleep(self.grace_period) => {
                let _ = signal::kill(nix_pid, Signal::SIGKILL);
            }
        }
    }
}

#[cfg(test)]
#[path = "agent_supervisor_tests.rs"]
mod tests;
