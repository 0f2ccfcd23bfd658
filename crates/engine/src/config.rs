//! Engine configuration
//!
//! Loaded from a JSON file; every field has a default so a partial file
//! (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Who may change the owner set and threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceMode {
    /// Any single current owner may add, remove or replace owners and set
    /// the threshold directly (DEFAULT)
    #[default]
    Unilateral,

    /// Direct calls are refused; changes only happen by executing a
    /// governance action that reached quorum
    Quorum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on a single dispatch call. Expiry counts as failure.
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,

    #[serde(default)]
    pub governance_mode: GovernanceMode,

    /// Capacity of the event broadcast channel; slow subscribers lag
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_dispatch_timeout_ms() -> u64 {
    30_000
}

fn default_event_buffer() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            governance_mode: GovernanceMode::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    pub fn with_governance_mode(mut self, mode: GovernanceMode) -> Self {
        self.governance_mode = mode;
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}
