//! Common test utilities for integration tests.

pub mod fixtures;

use glitch::bus::{EventBus, Payload};
use glitch::chaos::{ActionRegistry, ChaosConfig, GlitchExecutor, SelectorRegistry};
use glitch::error::{GlitchError, Result};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

// Re-export common types
pub use fixtures::*;

/// Test environment holding the directory plans are written to.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub plan_path: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let plan_path = temp_dir.path().join("glitch_plan.yaml");
        Self {
            temp_dir,
            plan_path,
        }
    }

    /// Chaos config writing into this environment.
    pub fn chaos_config(&self, pacing: Duration) -> ChaosConfig {
        ChaosConfig::default()
            .with_plan_path(&self.plan_path)
            .with_pacing_interval(pacing)
    }

    /// Executor with the built-in registries.
    pub fn executor(&self, pacing: Duration) -> GlitchExecutor {
        GlitchExecutor::new(
            self.chaos_config(pacing),
            Arc::new(SelectorRegistry::builtin()),
            Arc::new(ActionRegistry::builtin()),
        )
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// One accepted dispatch.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub origin: String,
    pub kind: String,
    pub at: Instant,
}

/// Bus that records dispatches, optionally running their payloads inline.
#[derive(Default)]
pub struct RecordingBus {
    dispatches: Mutex<Vec<Dispatch>>,
    pending: Mutex<Vec<Payload>>,
    refuse_after: Option<usize>,
}

impl RecordingBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Accept `limit` dispatches, then refuse.
    pub fn refusing_after(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            refuse_after: Some(limit),
            ..Self::default()
        })
    }

    pub fn dispatches(&self) -> Vec<Dispatch> {
        self.dispatches.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.dispatches.lock().len()
    }

    /// Run every payload accepted so far, in order, returning their results.
    pub async fn drain(&self) -> Vec<Result<()>> {
        let payloads: Vec<Payload> = std::mem::take(&mut *self.pending.lock());
        let mut results = Vec::with_capacity(payloads.len());
        for payload in payloads {
            results.push(payload().await);
        }
        results
    }
}

impl EventBus for RecordingBus {
    fn dispatch(&self, origin: &str, payload: Payload, kind: &str) -> Result<()> {
        let mut dispatches = self.dispatches.lock();
        if self.refuse_after.is_some_and(|limit| dispatches.len() >= limit) {
            return Err(GlitchError::Dispatch("recording bus is full".into()));
        }

        dispatches.push(Dispatch {
            origin: origin.to_string(),
            kind: kind.to_string(),
            at: Instant::now(),
        });
        self.pending.lock().push(payload);
        Ok(())
    }
}
