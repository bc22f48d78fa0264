//! Plan execution.
//!
//! The executor turns a plan into a paced series of bus dispatches:
//!
//! ```text
//! plan? ──► generate ──► validate ──► persist ──► for each entry:
//!                                                   select ─► lookup ─► dispatch ─► pace
//! ```
//!
//! Nothing is persisted or dispatched if validation fails. Any failure after
//! that aborts the remaining entries; entries already handed to the bus keep
//! running.

use super::actions::ActionRegistry;
use super::config::ChaosConfig;
use super::plan::{validate_plan, write_plan, PlanGenerator};
use super::selectors::{SelectorRegistry, SelectorResolver};
use crate::bus::EventBus;
use crate::error::{GlitchError, Result};
use crate::shutdown::ShutdownCoordinator;
use crate::topology::Topology;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a run acts on and where it sends work.
#[derive(Clone)]
pub struct GlitchContext {
    pub model: Arc<dyn Topology>,
    pub bus: Arc<dyn EventBus>,
}

impl GlitchContext {
    pub fn new(model: Arc<dyn Topology>, bus: Arc<dyn EventBus>) -> Self {
        Self { model, bus }
    }
}

/// Summary of a run in which every entry was submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    /// Where the executed plan was written
    pub plan_path: PathBuf,
    /// Entries handed to the bus
    pub submitted: usize,
    /// Action names in submission order
    pub actions: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Runs chaos plans against a topology.
pub struct GlitchExecutor {
    config: ChaosConfig,
    resolver: SelectorResolver,
    actions: Arc<ActionRegistry>,
    generator: PlanGenerator,
    shutdown: Option<ShutdownCoordinator>,
}

impl GlitchExecutor {
    pub fn new(
        config: ChaosConfig,
        selectors: Arc<SelectorRegistry>,
        actions: Arc<ActionRegistry>,
    ) -> Self {
        Self {
            config,
            resolver: SelectorResolver::new(selectors),
            generator: PlanGenerator::new(Arc::clone(&actions)),
            actions,
            shutdown: None,
        }
    }

    /// Use a custom selector resolver, e.g. one with a different entity resolver.
    pub fn with_resolver(mut self, resolver: SelectorResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Stop pacing and abort the run when `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: ShutdownCoordinator) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn config(&self) -> &ChaosConfig {
        &self.config
    }

    /// Execute `plan`, or a freshly generated plan of `count` entries when
    /// none is given.
    pub async fn run(
        &self,
        ctx: &GlitchContext,
        plan: Option<Value>,
        count: Option<usize>,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        let document = match plan {
            Some(document) => document,
            None => {
                let count = count.unwrap_or(self.config.default_count);
                self.generator
                    .generate(ctx.model.as_ref(), count)?
                    .to_document()?
            }
        };

        let plan = validate_plan(document)?;
        write_plan(&self.config.plan_path, &plan)?;

        info!(
            run_id = %run_id,
            actions = plan.len(),
            "Starting chaos run"
        );

        let total = plan.len();
        let mut submitted = Vec::with_capacity(total);

        for (index, entry) in plan.actions.into_iter().enumerate() {
            let targets = self
                .resolver
                .select(ctx.model.as_ref(), &entry.selectors, None)?;

            let action = self
                .actions
                .get(&entry.action)
                .ok_or_else(|| GlitchError::UnknownAction(entry.action.clone()))?;

            debug!(
                action = %entry.action,
                targets = targets.len(),
                "Dispatching action"
            );

            let model = Arc::clone(&ctx.model);
            let extra = entry.extra;
            ctx.bus.dispatch(
                &self.config.origin,
                Box::new(move || async move { action.apply(model, targets, extra).await }.boxed()),
                &self.config.event_kind,
            )?;
            submitted.push(entry.action);

            if index + 1 < total {
                self.pace(submitted.len()).await?;
            }
        }

        info!(run_id = %run_id, submitted = submitted.len(), "Chaos run submitted");

        Ok(RunReport {
            run_id,
            plan_path: self.config.plan_path.clone(),
            submitted: submitted.len(),
            actions: submitted,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn pace(&self, submitted: usize) -> Result<()> {
        let interval = self.config.pacing_interval;

        match &self.shutdown {
            Some(shutdown) => {
                tokio::select! {
                    biased;
                    _ = shutdown.wait_for_shutdown() => {
                        warn!(submitted, "Chaos run cancelled");
                        Err(GlitchError::Cancelled { submitted })
                    }
                    _ = tokio::time::sleep(interval) => Ok(()),
                }
            }
            None => {
                tokio::time::sleep(interval).await;
                Ok(())
            }
        }
    }
}
