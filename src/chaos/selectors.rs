//! Selectors and selector chain evaluation.
//!
//! A chain is evaluated strictly left to right. The first selector sees only
//! the model; every later one also sees the working set produced before it.
//! Selectors are not commutative: `one` reduces a set, so it has to come after
//! something that produced the set.

use super::plan::SelectorSpec;
use super::registry::{Named, Registry};
use crate::error::{GlitchError, Result};
use crate::topology::{all_units, DefaultResolver, EntityResolver, Param, Topology};
use crate::types::{EntityKind, EntityRef, UnitStatus, WorkingSet};
use rand::seq::SliceRandom;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// A named step that narrows a working set.
pub trait Selector: Named + Send + Sync {
    fn select(
        &self,
        model: &dyn Topology,
        input: Option<&WorkingSet>,
        params: &Params,
    ) -> Result<WorkingSet>;
}

/// Registry of selectors.
pub type SelectorRegistry = Registry<dyn Selector>;

impl Registry<dyn Selector> {
    /// Registry holding the built-in selectors.
    pub fn builtin() -> Self {
        let mut registry = Self::new("selector");
        registry
            .register(Arc::new(Units))
            .register(Arc::new(Leader))
            .register(Arc::new(AgentStatus))
            .register(Arc::new(WorkloadStatus))
            .register(Arc::new(One));
        registry
    }
}

/// Resolved parameters of one selector spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, Param>,
}

impl Params {
    /// Resolve every parameter of a spec against the model.
    pub fn resolve(
        resolver: &dyn EntityResolver,
        model: &dyn Topology,
        raw: &BTreeMap<String, Value>,
    ) -> Self {
        let values = raw
            .iter()
            .map(|(key, value)| (key.clone(), Param::resolve(resolver, model, key, value)))
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Param> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, param: Param) -> &mut Self {
        self.values.insert(key.into(), param);
        self
    }

    /// Fail on any parameter the selector does not take.
    pub fn allow_only(&self, selector: &str, allowed: &[&str]) -> Result<()> {
        match self.values.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(key) => Err(GlitchError::SelectorInput {
                selector: selector.to_string(),
                reason: format!("unexpected parameter {}", key),
            }),
            None => Ok(()),
        }
    }

    /// An entity parameter. Absent or null means `None`; an unresolved name
    /// or any other literal is a type error.
    pub fn entity(
        &self,
        selector: &str,
        key: &str,
        kind: EntityKind,
    ) -> Result<Option<EntityRef>> {
        match self.values.get(key) {
            None | Some(Param::Literal(Value::Null)) => Ok(None),
            Some(Param::Entity(entity)) if entity.kind == kind => Ok(Some(entity.clone())),
            Some(other) => Err(type_error(selector, key, kind.as_str(), other)),
        }
    }

    pub fn bool_or(&self, selector: &str, key: &str, default: bool) -> Result<bool> {
        match self.values.get(key) {
            None => Ok(default),
            Some(Param::Literal(Value::Bool(b))) => Ok(*b),
            Some(other) => Err(type_error(selector, key, "boolean", other)),
        }
    }

    /// A string literal. Absent or null means `None`.
    pub fn string(&self, selector: &str, key: &str) -> Result<Option<String>> {
        match self.values.get(key) {
            None | Some(Param::Literal(Value::Null)) => Ok(None),
            Some(Param::Literal(Value::String(s))) => Ok(Some(s.clone())),
            Some(other) => Err(type_error(selector, key, "string", other)),
        }
    }
}

fn type_error(selector: &str, key: &str, expected: &str, got: &Param) -> GlitchError {
    GlitchError::ResolutionType {
        selector: selector.to_string(),
        param: key.to_string(),
        expected: expected.to_string(),
        got: got.to_string(),
    }
}

fn require_input<'a>(selector: &str, input: Option<&'a WorkingSet>) -> Result<&'a WorkingSet> {
    input.ok_or_else(|| GlitchError::SelectorInput {
        selector: selector.to_string(),
        reason: "needs a working set from an earlier selector".into(),
    })
}

/// Keep the units of `input` whose status satisfies `keep`.
fn filter_units(
    selector: &str,
    model: &dyn Topology,
    input: Option<&WorkingSet>,
    keep: impl Fn(&UnitStatus) -> bool,
) -> Result<WorkingSet> {
    let input = require_input(selector, input)?;
    let mut selected = Vec::new();

    for entity in input {
        if !entity.is_unit() {
            return Err(GlitchError::SelectorInput {
                selector: selector.to_string(),
                reason: format!("expects units, got {}", entity),
            });
        }
        if model.unit_status(&entity.name).is_some_and(|status| keep(&status)) {
            selected.push(entity.clone());
        }
    }

    Ok(selected)
}

/// Units of the given application, or of every application.
pub struct Units;

impl Named for Units {
    fn name(&self) -> &str {
        "units"
    }
}

impl Selector for Units {
    fn select(
        &self,
        model: &dyn Topology,
        input: Option<&WorkingSet>,
        params: &Params,
    ) -> Result<WorkingSet> {
        if input.is_some() {
            return Err(GlitchError::SelectorInput {
                selector: self.name().to_string(),
                reason: "starts a chain and takes no working set".into(),
            });
        }
        params.allow_only(self.name(), &["application"])?;

        match params.entity(self.name(), "application", EntityKind::Application)? {
            Some(app) => Ok(model.units_of(&app.name).into_iter().map(EntityRef::unit).collect()),
            None => Ok(all_units(model)),
        }
    }
}

/// Units that are, or are not, their application's leader.
pub struct Leader;

impl Named for Leader {
    fn name(&self) -> &str {
        "leader"
    }
}

impl Selector for Leader {
    fn select(
        &self,
        model: &dyn Topology,
        input: Option<&WorkingSet>,
        params: &Params,
    ) -> Result<WorkingSet> {
        params.allow_only(self.name(), &["value"])?;
        let value = params.bool_or(self.name(), "value", true)?;
        filter_units(self.name(), model, input, |status| status.leader == value)
    }
}

/// Units whose agent status matches `expect`.
pub struct AgentStatus;

impl Named for AgentStatus {
    fn name(&self) -> &str {
        "agent_status"
    }
}

impl Selector for AgentStatus {
    fn select(
        &self,
        model: &dyn Topology,
        input: Option<&WorkingSet>,
        params: &Params,
    ) -> Result<WorkingSet> {
        params.allow_only(self.name(), &["expect"])?;
        let expect = params
            .string(self.name(), "expect")?
            .ok_or_else(|| GlitchError::SelectorInput {
                selector: self.name().to_string(),
                reason: "missing required parameter expect".into(),
            })?;
        filter_units(self.name(), model, input, |status| status.agent_status == expect)
    }
}

/// Units whose workload status matches `expect`; no `expect` matches units
/// reporting no workload status.
pub struct WorkloadStatus;

impl Named for WorkloadStatus {
    fn name(&self) -> &str {
        "workload_status"
    }
}

impl Selector for WorkloadStatus {
    fn select(
        &self,
        model: &dyn Topology,
        input: Option<&WorkingSet>,
        params: &Params,
    ) -> Result<WorkingSet> {
        params.allow_only(self.name(), &["expect"])?;
        let expect = params.string(self.name(), "expect")?;
        filter_units(self.name(), model, input, |status| status.workload_status == expect)
    }
}

/// Exactly one element of the working set, picked at random so repeated runs
/// don't always hit the first unit.
pub struct One;

impl Named for One {
    fn name(&self) -> &str {
        "one"
    }
}

impl Selector for One {
    fn select(
        &self,
        _model: &dyn Topology,
        input: Option<&WorkingSet>,
        params: &Params,
    ) -> Result<WorkingSet> {
        params.allow_only(self.name(), &[])?;
        let input = require_input(self.name(), input)?;

        input
            .choose(&mut rand::thread_rng())
            .map(|entity| vec![entity.clone()])
            .ok_or_else(|| GlitchError::EmptyWorkingSet {
                selector: self.name().to_string(),
            })
    }
}

/// Evaluates selector chains against a model.
#[derive(Clone)]
pub struct SelectorResolver {
    selectors: Arc<SelectorRegistry>,
    resolver: Arc<dyn EntityResolver>,
}

impl SelectorResolver {
    pub fn new(selectors: Arc<SelectorRegistry>) -> Self {
        Self {
            selectors,
            resolver: Arc::new(DefaultResolver),
        }
    }

    /// Swap the name resolver used for entity parameters.
    pub fn with_resolver(mut self, resolver: Arc<dyn EntityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn selectors(&self) -> &Arc<SelectorRegistry> {
        &self.selectors
    }

    /// Evaluate `chain` into a working set.
    ///
    /// An empty chain returns `fallback` as-is, or fails with
    /// [`GlitchError::EmptySelection`] when there is none.
    pub fn select(
        &self,
        model: &dyn Topology,
        chain: &[SelectorSpec],
        fallback: Option<WorkingSet>,
    ) -> Result<WorkingSet> {
        if chain.is_empty() {
            return fallback.ok_or(GlitchError::EmptySelection);
        }

        let mut working_set: Option<WorkingSet> = None;

        for spec in chain {
            let selector = self
                .selectors
                .get(&spec.selector)
                .ok_or_else(|| GlitchError::UnknownSelector(spec.selector.clone()))?;

            let params = Params::resolve(self.resolver.as_ref(), model, &spec.params);
            let next = selector.select(model, working_set.as_ref(), &params)?;

            trace!(selector = %spec.selector, size = next.len(), "Selector applied");
            working_set = Some(next);
        }

        working_set.ok_or(GlitchError::EmptySelection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::InMemoryTopology;
    use serde_json::json;

    fn model() -> InMemoryTopology {
        let model = InMemoryTopology::new()
            .with_application("zookeeper", 3)
            .with_application("kafka", 2);
        model.add_unit(
            "kafka",
            "kafka/2",
            UnitStatus {
                leader: false,
                agent_status: "executing".into(),
                workload_status: Some("blocked".into()),
            },
        );
        model
    }

    fn resolver() -> SelectorResolver {
        SelectorResolver::new(Arc::new(SelectorRegistry::builtin()))
    }

    #[test]
    fn test_units_then_one() {
        let model = model();
        let chain = vec![
            SelectorSpec::new("units").param("application", json!("zookeeper")),
            SelectorSpec::new("one"),
        ];

        for _ in 0..20 {
            let selected = resolver().select(&model, &chain, None).unwrap();
            assert_eq!(selected.len(), 1);
            assert!(selected[0].name.starts_with("zookeeper/"));
        }
    }

    #[test]
    fn test_units_without_application() {
        let selected = resolver()
            .select(&model(), &[SelectorSpec::new("units")], None)
            .unwrap();
        assert_eq!(selected.len(), 6);
    }

    #[test]
    fn test_empty_chain() {
        let model = model();
        let err = resolver().select(&model, &[], None).unwrap_err();
        assert!(matches!(err, GlitchError::EmptySelection));

        let fallback = vec![EntityRef::unit("u1"), EntityRef::unit("u2")];
        let selected = resolver()
            .select(&model, &[], Some(fallback.clone()))
            .unwrap();
        assert_eq!(selected, fallback);
    }

    #[test]
    fn test_unknown_selector() {
        let err = resolver()
            .select(&model(), &[SelectorSpec::new("healthiest")], None)
            .unwrap_err();
        assert!(matches!(err, GlitchError::UnknownSelector(name) if name == "healthiest"));
    }

    #[test]
    fn test_unresolved_application_is_type_error() {
        let chain = vec![SelectorSpec::new("units").param("application", json!("ghost"))];
        let err = resolver().select(&model(), &chain, None).unwrap_err();
        assert!(matches!(err, GlitchError::ResolutionType { param, .. } if param == "application"));
    }

    #[test]
    fn test_one_needs_a_working_set() {
        let err = resolver()
            .select(&model(), &[SelectorSpec::new("one")], None)
            .unwrap_err();
        assert!(matches!(err, GlitchError::SelectorInput { .. }));
    }

    #[test]
    fn test_one_over_empty_set() {
        let chain = vec![
            SelectorSpec::new("units").param("application", json!("kafka")),
            SelectorSpec::new("agent_status").param("expect", json!("lost")),
            SelectorSpec::new("one"),
        ];
        let err = resolver().select(&model(), &chain, None).unwrap_err();
        assert!(matches!(err, GlitchError::EmptyWorkingSet { .. }));
    }

    #[test]
    fn test_leader_filter() {
        let model = model();
        let leaders = resolver()
            .select(
                &model,
                &[SelectorSpec::new("units"), SelectorSpec::new("leader")],
                None,
            )
            .unwrap();
        assert_eq!(
            leaders,
            vec![EntityRef::unit("kafka/0"), EntityRef::unit("zookeeper/0")]
        );

        let followers = resolver()
            .select(
                &model,
                &[
                    SelectorSpec::new("units").param("application", json!("zookeeper")),
                    SelectorSpec::new("leader").param("value", json!(false)),
                ],
                None,
            )
            .unwrap();
        assert_eq!(followers.len(), 2);
    }

    #[test]
    fn test_leader_rejects_non_boolean() {
        let chain = vec![
            SelectorSpec::new("units"),
            SelectorSpec::new("leader").param("value", json!("yes")),
        ];
        let err = resolver().select(&model(), &chain, None).unwrap_err();
        assert!(matches!(err, GlitchError::ResolutionType { .. }));
    }

    #[test]
    fn test_status_filters() {
        let model = model();
        let executing = resolver()
            .select(
                &model,
                &[
                    SelectorSpec::new("units"),
                    SelectorSpec::new("agent_status").param("expect", json!("executing")),
                ],
                None,
            )
            .unwrap();
        assert_eq!(executing, vec![EntityRef::unit("kafka/2")]);

        let active = resolver()
            .select(
                &model,
                &[
                    SelectorSpec::new("units"),
                    SelectorSpec::new("workload_status").param("expect", json!("active")),
                ],
                None,
            )
            .unwrap();
        assert_eq!(active.len(), 5);
    }

    #[test]
    fn test_agent_status_requires_expect() {
        let chain = vec![SelectorSpec::new("units"), SelectorSpec::new("agent_status")];
        let err = resolver().select(&model(), &chain, None).unwrap_err();
        assert!(matches!(err, GlitchError::SelectorInput { .. }));
    }

    #[test]
    fn test_units_rejects_working_set() {
        let chain = vec![SelectorSpec::new("units"), SelectorSpec::new("units")];
        let err = resolver().select(&model(), &chain, None).unwrap_err();
        assert!(matches!(err, GlitchError::SelectorInput { .. }));
    }

    #[test]
    fn test_unexpected_parameter() {
        let chain = vec![SelectorSpec::new("units").param("zone", json!("east"))];
        let err = resolver().select(&model(), &chain, None).unwrap_err();
        assert!(matches!(err, GlitchError::SelectorInput { .. }));
    }

    #[test]
    fn test_chain_is_not_mutated() {
        let chain = vec![SelectorSpec::new("units").param("application", json!("kafka"))];
        let before = chain.clone();
        resolver().select(&model(), &chain, None).unwrap();
        assert_eq!(chain, before);
    }

    #[test]
    fn test_custom_resolver() {
        struct Alias;

        impl EntityResolver for Alias {
            fn resolve(
                &self,
                _model: &dyn Topology,
                kind: EntityKind,
                name: &str,
            ) -> Option<EntityRef> {
                (name == "zk").then(|| EntityRef::new(kind, "zookeeper"))
            }
        }

        let chain = vec![SelectorSpec::new("units").param("application", json!("zk"))];
        let selected = resolver()
            .with_resolver(Arc::new(Alias))
            .select(&model(), &chain, None)
            .unwrap();
        assert_eq!(selected.len(), 3);
    }
}
