// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps a cached model path to the OS process the supervisor should launch.
//!
//! The inference backend itself (MLX/CoreML/PyTorch/ONNX or anything else)
//! is out of scope; the daemon only needs an executable that reads the job's
//! input from stdin and writes its result to stdout.

use crate::agent_supervisor::AgentProcessSpec;
use std::path::Path;

pub trait AgentCommandBuilder: Send + Sync {
    fn build(&self, model_id: &str, model_path: &Path) -> AgentProcessSpec;
}

/// Invokes a single configured binary as `<binary> --model-id <id> --model-path <path>`.
/// Good enough for any backend willing to speak that convention; swap in a
/// different `AgentCommandBuilder` for anything else.
pub struct FixedBinaryCommandBuilder {
    pub binary: String,
}

impl FixedBinaryCommandBuilder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl AgentCommandBuilder for FixedBinaryCommandBuilder {
    fn build(&self, model_id: &str, model_path: &Path) -> AgentProcessSpec {
        AgentProcessSpec::new(
            self.binary.clone(),
            vec![
                "--model-id".to_string(),
                model_id.to_string(),
                "--model-path".to_string(),
                model_path.display().to_string(),
            ],
        )
    }
}

#[cfg(test)]
#[path = "agent_command_tests.rs"]
mod tests;
