// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identity and the top-level job spec submitted by clients.

use crate::pattern::PatternConfig;
use crate::priority::Priority;
use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    /// Identifies a job across its whole lifetime, orchestrator and daemons alike.
    pub struct JobId("job-");
}

fn default_priority() -> Priority {
    Priority::Normal
}

fn default_max_cost() -> Option<f64> {
    None
}

/// The spec a client submits to an orchestrator. `config` carries the
/// pattern-specific shape; `pattern()` on [`PatternConfig`] recovers the tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(default)]
    pub job_id: Option<JobId>,
    pub config: PatternConfig,
    #[serde(default)]
    pub input_data: Value,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    /// Advisory ceiling surfaced to clients; the core contract does not
    /// itself refuse jobs that exceed it (see SPEC_FULL.md open question
    /// resolutions — cost accounting is a downstream concern).
    #[serde(default = "default_max_cost")]
    pub max_cost: Option<f64>,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, Value>,
}

impl JobSpec {
    pub fn pattern(&self) -> crate::pattern::Pattern {
        self.config.pattern()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
