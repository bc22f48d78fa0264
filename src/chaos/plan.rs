//! Chaos plans: data model, validation, generation, and the plan document.
//!
//! A generated plan written to disk looks like:
//!
//! ```yaml
//! actions:
//!   - action: reboot
//!     selectors:
//!       - selector: units
//!         application: zookeeper
//!       - selector: one
//! ```
//!
//! Selector parameters and action arguments sit beside the `selector` and
//! `action` keys in the document; in the typed model they are collected into
//! [`SelectorSpec::params`] and [`ActionEntry::extra`].

use super::actions::ActionRegistry;
use crate::error::{GlitchError, Result};
use crate::topology::Topology;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Action-specific keyword arguments, passed through verbatim.
pub type Extra = BTreeMap<String, Value>;

// ============================================================================
// Plan model
// ============================================================================

/// An ordered list of chaos actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<ActionEntry>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, entry: ActionEntry) -> Self {
        self.actions.push(entry);
        self
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The plan in document form, the shape [`validate_plan`] accepts.
    pub fn to_document(&self) -> Result<Value> {
        self.check_flattened_keys()?;
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        self.check_flattened_keys()?;
        Ok(serde_yaml::to_string(self)?)
    }

    /// Extras and selector params share a mapping with the named fields in
    /// document form, so they must not reuse those names.
    fn check_flattened_keys(&self) -> Result<()> {
        for entry in &self.actions {
            if let Some(key) = ENTRY_KEYS.iter().find(|k| entry.extra.contains_key(**k)) {
                return Err(GlitchError::InvalidAction(format!(
                    "{}: extra argument {:?} clashes with the entry field",
                    entry.action, key
                )));
            }
            for spec in &entry.selectors {
                if spec.params.contains_key(SPEC_KEY) {
                    return Err(GlitchError::InvalidAction(format!(
                        "{}: selector {} has a {:?} parameter",
                        entry.action, spec.selector, SPEC_KEY
                    )));
                }
            }
        }
        Ok(())
    }
}

const ENTRY_KEYS: [&str; 2] = ["action", "selectors"];
const SPEC_KEY: &str = "selector";

/// One action and the selector chain that picks its targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub action: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<SelectorSpec>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ActionEntry {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            selectors: Vec::new(),
            extra: Extra::new(),
        }
    }

    pub fn selector(mut self, spec: SelectorSpec) -> Self {
        self.selectors.push(spec);
        self
    }

    /// Add an extra argument. `action` and `selectors` are reserved; a plan
    /// using them fails to serialize.
    pub fn arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// A selector name and its raw parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorSpec {
    pub selector: String,
    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
}

impl SelectorSpec {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter. `selector` is reserved; a plan using it fails to
    /// serialize.
    pub fn param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Check the structure of a plan document and return the typed plan.
///
/// Only structure is checked. Whether the named actions and selectors exist,
/// and whether selector parameters fit, is left to execution time.
pub fn validate_plan(mut document: Value) -> Result<Plan> {
    let entries = match document.get("actions") {
        None => {
            return Err(GlitchError::InvalidPlan(format!(
                "missing \"actions\" key: {}",
                document
            )))
        }
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(GlitchError::InvalidPlan(format!(
                "\"actions\" must be a sequence, got {}",
                other
            )))
        }
    };

    for entry in entries {
        validate_entry(entry)?;
    }

    // A null selector list reads as "no selectors".
    if let Some(Value::Array(entries)) = document.get_mut("actions") {
        for fields in entries.iter_mut().filter_map(Value::as_object_mut) {
            if fields.get("selectors") == Some(&Value::Null) {
                fields.remove("selectors");
            }
        }
    }

    serde_json::from_value(document).map_err(|e| GlitchError::InvalidPlan(e.to_string()))
}

fn validate_entry(entry: &Value) -> Result<()> {
    if !entry.is_object() {
        return Err(GlitchError::InvalidAction(format!(
            "entry must be a mapping, got {}",
            entry
        )));
    }

    match entry.get("action") {
        Some(Value::String(_)) => {}
        Some(other) => {
            return Err(GlitchError::InvalidAction(format!(
                "\"action\" must be a string, got {}",
                other
            )))
        }
        None => {
            return Err(GlitchError::InvalidAction(format!(
                "missing \"action\" key: {}",
                entry
            )))
        }
    }

    match entry.get("selectors") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(specs)) => {
            match specs
                .iter()
                .find(|spec| !matches!(spec.get("selector"), Some(Value::String(_))))
            {
                Some(spec) => Err(GlitchError::InvalidAction(format!(
                    "selector spec needs a string \"selector\" key: {}",
                    spec
                ))),
                None => Ok(()),
            }
        }
        Some(other) => Err(GlitchError::InvalidAction(format!(
            "\"selectors\" must be a sequence, got {}",
            other
        ))),
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Builds random plans from the live topology.
#[derive(Clone)]
pub struct PlanGenerator {
    actions: Arc<ActionRegistry>,
}

impl PlanGenerator {
    pub fn new(actions: Arc<ActionRegistry>) -> Self {
        Self { actions }
    }

    /// Generate `count` entries, each a random action against one random unit.
    pub fn generate(&self, model: &dyn Topology, count: usize) -> Result<Plan> {
        self.generate_with_rng(model, count, &mut rand::thread_rng())
    }

    /// Like [`generate`](Self::generate), drawing from the given RNG.
    ///
    /// Units are snapshotted once on entry. Each entry targets its unit through
    /// the implicit chain `units(application) -> one`.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        model: &dyn Topology,
        count: usize,
        rng: &mut R,
    ) -> Result<Plan> {
        let candidates: Vec<(String, String)> = model
            .applications()
            .into_iter()
            .flat_map(|app| {
                model
                    .units_of(&app)
                    .into_iter()
                    .map(move |unit| (app.clone(), unit))
            })
            .collect();

        if candidates.is_empty() {
            return Err(GlitchError::NoUnits);
        }

        let action_names = self.actions.names();
        if count > 0 && action_names.is_empty() {
            return Err(GlitchError::NoActions);
        }

        let mut plan = Plan::new();
        for _ in 0..count {
            let (application, unit) = candidates.choose(rng).ok_or(GlitchError::NoUnits)?;
            let action = action_names.choose(rng).ok_or(GlitchError::NoActions)?;

            debug!(action = %action, unit = %unit, "Planned action");
            plan = plan.push(
                ActionEntry::new(action.clone())
                    .selector(SelectorSpec::new("units").param("application", json!(application)))
                    .selector(SelectorSpec::new("one")),
            );
        }

        Ok(plan)
    }
}

// ============================================================================
// Plan document
// ============================================================================

/// Write the plan document at `path`, replacing whatever was there.
///
/// The document is written to a sibling file, synced, then renamed over
/// `path`, so the file is either the previous plan or this one in full.
pub fn write_plan(path: &Path, plan: &Plan) -> Result<()> {
    let yaml = plan.to_yaml()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = Path::new(&staging);

    {
        let mut file = File::create(staging)?;
        file.write_all(yaml.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(staging, path)?;

    info!(actions = plan.len(), "Wrote glitch plan to {}", path.display());
    Ok(())
}

/// Read a plan document without validating it.
pub fn read_plan(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}
