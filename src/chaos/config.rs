//! Configuration for chaos runs.

use crate::config::humantime_serde;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default file the last plan is written to.
pub const DEFAULT_PLAN_NAME: &str = "glitch_plan.yaml";

/// Origin marker attached to every dispatch.
pub const DEFAULT_ORIGIN: &str = "glitch";

/// Event kind attached to every dispatch.
pub const DEFAULT_EVENT_KIND: &str = "glitch.activate";

/// Chaos run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    /// Where the plan about to execute is written, overwritten each run
    pub plan_path: PathBuf,
    /// Delay between successive dispatches
    #[serde(with = "humantime_serde")]
    pub pacing_interval: Duration,
    /// Number of entries in a generated plan
    pub default_count: usize,
    /// Origin marker for bus dispatches
    pub origin: String,
    /// Event kind for bus dispatches
    pub event_kind: String,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            plan_path: PathBuf::from(DEFAULT_PLAN_NAME),
            pacing_interval: Duration::from_secs(2),
            default_count: 5,
            origin: DEFAULT_ORIGIN.to_string(),
            event_kind: DEFAULT_EVENT_KIND.to_string(),
        }
    }
}

impl ChaosConfig {
    /// Development configuration (fast pacing)
    pub fn development() -> Self {
        Self {
            pacing_interval: Duration::from_millis(200),
            default_count: 3,
            ..Self::default()
        }
    }

    pub fn with_plan_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan_path = path.into();
        self
    }

    pub fn with_pacing_interval(mut self, interval: Duration) -> Self {
        self.pacing_interval = interval;
        self
    }
}
