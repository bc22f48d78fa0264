//! Core type definitions for glitch.
//!
//! Entities are never owned here. An [`EntityRef`] is a handle (kind plus
//! name) into the external model, and every fact about the entity is queried
//! back through the [`Topology`](crate::topology::Topology) trait.
//!
//! # Examples
//!
//! ```rust
//! use glitch::types::{EntityKind, EntityRef};
//!
//! let unit = EntityRef::unit("zookeeper/0");
//! assert_eq!(unit.kind, EntityKind::Unit);
//! assert_eq!(EntityKind::from_key("application"), Some(EntityKind::Application));
//! assert_eq!(EntityKind::from_key("value"), None);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of topology entity the planner can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Application,
    Unit,
    Model,
    Controller,
    Relation,
}

impl EntityKind {
    /// Every kind, in lookup order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Application,
        EntityKind::Unit,
        EntityKind::Model,
        EntityKind::Controller,
        EntityKind::Relation,
    ];

    /// Map a selector parameter key to the kind it names, if any.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == key)
    }

    /// The parameter key for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Application => "application",
            EntityKind::Unit => "unit",
            EntityKind::Model => "model",
            EntityKind::Controller => "controller",
            EntityKind::Relation => "relation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a live entity in the external model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub name: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn application(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Application, name)
    }

    pub fn unit(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Unit, name)
    }

    pub fn is_unit(&self) -> bool {
        self.kind == EntityKind::Unit
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// The candidate entities produced by a selector chain.
pub type WorkingSet = Vec<EntityRef>;

/// Point-in-time status of a unit, as reported by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStatus {
    /// Whether the unit currently holds leadership of its application
    #[serde(default)]
    pub leader: bool,
    /// Agent status, e.g. `idle` or `executing`
    #[serde(default)]
    pub agent_status: String,
    /// Workload status, e.g. `active` or `blocked`
    #[serde(default)]
    pub workload_status: Option<String>,
}
