// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job priority bands.

use serde::{Deserialize, Serialize};

/// Three-band priority used by the daemon's job queue. Ordered so that
/// `High > Normal > Low` under the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

crate::simple_display! {
    Priority {
        Low => "low",
        Normal => "normal",
        High => "high",
    }
}

impl Priority {
    /// All bands, highest first — the order the queue drains in.
    pub const BANDS_HIGH_TO_LOW: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];
}

#[cfg(test)]
#[path = "priority_tests.rs"]
mod tests;
