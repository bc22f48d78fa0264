//! Snapshot-backed topology.

use super::Topology;
use crate::error::{GlitchError, Result};
use crate::types::UnitStatus;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::info;

/// Serializable description of a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    #[serde(default)]
    pub applications: BTreeMap<String, ApplicationSnapshot>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub controllers: Vec<String>,
    #[serde(default)]
    pub relations: Vec<String>,
}

/// One application and its units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSnapshot {
    #[serde(default)]
    pub units: BTreeMap<String, UnitStatus>,
}

/// A command an action ran against a unit.
#[derive(Debug, Clone)]
pub struct CommandRecord {
    pub unit: String,
    pub command: String,
    pub at: DateTime<Utc>,
}

/// In-process [`Topology`] built from a [`TopologySnapshot`].
///
/// Commands are recorded rather than executed, which makes this the model
/// behind dry runs of the CLI and the test suite.
pub struct InMemoryTopology {
    snapshot: RwLock<TopologySnapshot>,
    commands: RwLock<Vec<CommandRecord>>,
    failing_units: RwLock<HashSet<String>>,
}

impl InMemoryTopology {
    pub fn new() -> Self {
        Self::from_snapshot(TopologySnapshot::default())
    }

    pub fn from_snapshot(snapshot: TopologySnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            commands: RwLock::new(Vec::new()),
            failing_units: RwLock::new(HashSet::new()),
        }
    }

    /// Load a snapshot document. `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GlitchError::Config(format!("Failed to read topology {}: {}", path.display(), e))
        })?;

        let snapshot: TopologySnapshot = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };

        info!(
            applications = snapshot.applications.len(),
            "Loaded topology from {}",
            path.display()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Add an application with `count` idle, active units named `<app>/<n>`.
    /// The first unit is the leader.
    pub fn with_application(self, name: &str, count: usize) -> Self {
        for i in 0..count {
            self.add_unit(
                name,
                &format!("{}/{}", name, i),
                UnitStatus {
                    leader: i == 0,
                    agent_status: "idle".into(),
                    workload_status: Some("active".into()),
                },
            );
        }
        if count == 0 {
            self.snapshot
                .write()
                .applications
                .entry(name.to_string())
                .or_default();
        }
        self
    }

    pub fn add_unit(&self, application: &str, unit: &str, status: UnitStatus) {
        self.snapshot
            .write()
            .applications
            .entry(application.to_string())
            .or_default()
            .units
            .insert(unit.to_string(), status);
    }

    /// Make every later command on `unit` fail.
    pub fn fail_commands_on(&self, unit: &str) {
        self.failing_units.write().insert(unit.to_string());
    }

    pub fn snapshot(&self) -> TopologySnapshot {
        self.snapshot.read().clone()
    }

    /// Commands run so far, oldest first.
    pub fn commands(&self) -> Vec<CommandRecord> {
        self.commands.read().clone()
    }
}

impl Default for InMemoryTopology {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Topology for InMemoryTopology {
    fn applications(&self) -> Vec<String> {
        self.snapshot.read().applications.keys().cloned().collect()
    }

    fn units(&self) -> Vec<String> {
        self.snapshot
            .read()
            .applications
            .values()
            .flat_map(|app| app.units.keys().cloned())
            .collect()
    }

    fn models(&self) -> Vec<String> {
        self.snapshot.read().models.clone()
    }

    fn controllers(&self) -> Vec<String> {
        self.snapshot.read().controllers.clone()
    }

    fn relations(&self) -> Vec<String> {
        self.snapshot.read().relations.clone()
    }

    fn units_of(&self, application: &str) -> Vec<String> {
        self.snapshot
            .read()
            .applications
            .get(application)
            .map(|app| app.units.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn application_of(&self, unit: &str) -> Option<String> {
        self.snapshot
            .read()
            .applications
            .iter()
            .find(|(_, app)| app.units.contains_key(unit))
            .map(|(name, _)| name.clone())
    }

    fn unit_status(&self, unit: &str) -> Option<UnitStatus> {
        self.snapshot
            .read()
            .applications
            .values()
            .find_map(|app| app.units.get(unit).cloned())
    }

    async fn run(&self, unit: &str, command: &str) -> Result<()> {
        if self.application_of(unit).is_none() {
            return Err(GlitchError::CommandFailed {
                target: unit.to_string(),
                reason: "unit not in topology".into(),
            });
        }

        self.commands.write().push(CommandRecord {
            unit: unit.to_string(),
            command: command.to_string(),
            at: Utc::now(),
        });

        if self.failing_units.read().contains(unit) {
            return Err(GlitchError::CommandFailed {
                target: unit.to_string(),
                reason: format!("{:?} exited non-zero", command),
            });
        }

        Ok(())
    }
}
