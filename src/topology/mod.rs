//! Topology provider interface.
//!
//! The planner never owns topology state. It reads names and unit facts
//! through [`Topology`] and hands [`EntityRef`] handles around. The one write
//! path, [`Topology::run`], exists for actions; selectors and the generator
//! only query.

mod memory;

pub use memory::{ApplicationSnapshot, CommandRecord, InMemoryTopology, TopologySnapshot};

use crate::error::Result;
use crate::types::{EntityKind, EntityRef, UnitStatus, WorkingSet};
use serde_json::Value;
use std::fmt;

/// The live model a chaos run is aimed at.
#[async_trait::async_trait]
pub trait Topology: Send + Sync {
    /// Names of every application in the model
    fn applications(&self) -> Vec<String>;

    /// Names of every unit, across all applications
    fn units(&self) -> Vec<String>;

    fn models(&self) -> Vec<String>;

    fn controllers(&self) -> Vec<String>;

    fn relations(&self) -> Vec<String>;

    /// Unit names of one application, in the model's order
    fn units_of(&self, application: &str) -> Vec<String>;

    /// Owning application of a unit
    fn application_of(&self, unit: &str) -> Option<String>;

    /// Current status of a unit
    fn unit_status(&self, unit: &str) -> Option<UnitStatus>;

    /// Run a shell command on a unit.
    async fn run(&self, unit: &str, command: &str) -> Result<()>;
}

impl EntityKind {
    /// Names in the model collection for this kind.
    pub fn names_in(&self, model: &dyn Topology) -> Vec<String> {
        match self {
            EntityKind::Application => model.applications(),
            EntityKind::Unit => model.units(),
            EntityKind::Model => model.models(),
            EntityKind::Controller => model.controllers(),
            EntityKind::Relation => model.relations(),
        }
    }
}

/// All units of all applications, application by application.
pub fn all_units(model: &dyn Topology) -> WorkingSet {
    model
        .applications()
        .iter()
        .flat_map(|app| model.units_of(app))
        .map(EntityRef::unit)
        .collect()
}

/// Resolves entity names found in a plan to live references.
pub trait EntityResolver: Send + Sync {
    fn resolve(&self, model: &dyn Topology, kind: EntityKind, name: &str) -> Option<EntityRef>;
}

/// Looks the name up in the model collection matching its kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl EntityResolver for DefaultResolver {
    fn resolve(&self, model: &dyn Topology, kind: EntityKind, name: &str) -> Option<EntityRef> {
        kind.names_in(model)
            .iter()
            .any(|n| n == name)
            .then(|| EntityRef::new(kind, name))
    }
}

/// A selector parameter after resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A name that matched a live entity
    Entity(EntityRef),
    /// A value passed through as written
    Literal(Value),
    /// A name under an entity key that matched nothing
    Unresolved { kind: EntityKind, name: String },
}

impl Param {
    /// Resolve one `key: value` pair from a selector spec.
    ///
    /// Only strings under keys that name an entity kind are looked up; a miss
    /// keeps the raw name as [`Param::Unresolved`].
    pub fn resolve(
        resolver: &dyn EntityResolver,
        model: &dyn Topology,
        key: &str,
        value: &Value,
    ) -> Self {
        match (EntityKind::from_key(key), value) {
            (Some(kind), Value::String(name)) => match resolver.resolve(model, kind, name) {
                Some(entity) => Param::Entity(entity),
                None => Param::Unresolved {
                    kind,
                    name: name.clone(),
                },
            },
            _ => Param::Literal(value.clone()),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Entity(entity) => write!(f, "{}", entity),
            Param::Literal(value) => write!(f, "literal {}", value),
            Param::Unresolved { name, .. } => write!(f, "unresolved name {:?}", name),
        }
    }
}
