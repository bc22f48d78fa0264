//! Destructive actions and their registry.
//!
//! An action receives the model, the working set its selector chain produced,
//! and the entry's extra arguments. It runs on the bus, after the executor has
//! already moved on, so its result is only visible to bus subscribers.

use super::plan::Extra;
use super::registry::{Named, Registry};
use crate::error::{GlitchError, Result};
use crate::topology::Topology;
use crate::types::{EntityRef, WorkingSet};
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A named destructive operation against a working set.
#[async_trait::async_trait]
pub trait Action: Named + Send + Sync {
    async fn apply(
        &self,
        model: Arc<dyn Topology>,
        targets: WorkingSet,
        extra: Extra,
    ) -> Result<()>;
}

/// Registry of actions.
pub type ActionRegistry = Registry<dyn Action>;

impl Registry<dyn Action> {
    /// Registry holding the built-in destructive actions.
    ///
    /// [`Sleep`] is not included, so generated plans never pick it; register
    /// it explicitly to use it in hand-written plans.
    pub fn builtin() -> Self {
        let mut registry = Self::new("action");
        registry.register(Arc::new(Reboot));
        registry
    }
}

type ActionFuture = BoxFuture<'static, Result<()>>;

/// An action backed by a closure.
pub struct FnAction {
    name: String,
    f: Box<dyn Fn(Arc<dyn Topology>, WorkingSet, Extra) -> ActionFuture + Send + Sync>,
}

impl Named for FnAction {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait::async_trait]
impl Action for FnAction {
    async fn apply(
        &self,
        model: Arc<dyn Topology>,
        targets: WorkingSet,
        extra: Extra,
    ) -> Result<()> {
        (self.f)(model, targets, extra).await
    }
}

/// Wrap an async closure as a registrable action.
///
/// ```rust
/// use glitch::chaos::{action_fn, ActionRegistry};
///
/// let mut actions = ActionRegistry::builtin();
/// actions.register(action_fn("noop", |_model, _targets, _extra| async { Ok(()) }));
/// assert!(actions.contains("noop"));
/// ```
pub fn action_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<FnAction>
where
    F: Fn(Arc<dyn Topology>, WorkingSet, Extra) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnAction {
        name: name.into(),
        f: Box::new(
            move |model: Arc<dyn Topology>, targets: WorkingSet, extra: Extra| -> ActionFuture {
                Box::pin(f(model, targets, extra))
            },
        ),
    })
}

fn require_unit(action: &str, target: &EntityRef) -> Result<()> {
    if target.is_unit() {
        Ok(())
    } else {
        Err(GlitchError::InvalidArgument(format!(
            "{} applies to units, got {}",
            action, target
        )))
    }
}

/// Send a reboot to every unit in the working set.
pub struct Reboot;

impl Named for Reboot {
    fn name(&self) -> &str {
        "reboot"
    }
}

#[async_trait::async_trait]
impl Action for Reboot {
    async fn apply(
        &self,
        model: Arc<dyn Topology>,
        targets: WorkingSet,
        _extra: Extra,
    ) -> Result<()> {
        for unit in &targets {
            require_unit(self.name(), unit)?;
            info!(unit = %unit.name, "Rebooting unit");
            model.run(&unit.name, "sudo reboot").await?;
        }
        Ok(())
    }
}

/// Sleep `seconds` (default 2) once per target. Not part of
/// [`ActionRegistry::builtin`].
pub struct Sleep;

impl Sleep {
    const DEFAULT: Duration = Duration::from_secs(2);

    fn duration(extra: &Extra) -> Result<Duration> {
        let value = match extra.get("seconds") {
            None | Some(Value::Null) => return Ok(Self::DEFAULT),
            Some(value) => value,
        };
        value
            .as_f64()
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .ok_or_else(|| {
                GlitchError::InvalidArgument(format!(
                    "sleep seconds must be a non-negative number in range, got {}",
                    value
                ))
            })
    }
}

impl Named for Sleep {
    fn name(&self) -> &str {
        "sleep"
    }
}

#[async_trait::async_trait]
impl Action for Sleep {
    async fn apply(
        &self,
        _model: Arc<dyn Topology>,
        targets: WorkingSet,
        extra: Extra,
    ) -> Result<()> {
        let duration = Self::duration(&extra)?;
        for _ in &targets {
            tokio::time::sleep(duration).await;
        }
        Ok(())
    }
}
