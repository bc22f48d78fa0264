//! Chaos planning and dispatch.
//!
//! Builds or accepts a plan of destructive actions, checks its structure,
//! writes it to disk, then resolves each entry's targets and hands the action
//! to the event bus one entry at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      GlitchExecutor                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PlanGenerator  │  validate_plan  │  write_plan / read_plan │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SelectorResolver ─► SelectorRegistry │ ActionRegistry      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Topology (model, command channel)  │  EventBus (dispatch)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use glitch::bus::LocalBus;
//! use glitch::chaos::{
//!     ActionRegistry, ChaosConfig, GlitchContext, GlitchExecutor, SelectorRegistry,
//! };
//! use glitch::topology::InMemoryTopology;
//! use std::sync::Arc;
//!
//! # async fn example() -> glitch::Result<()> {
//! let executor = GlitchExecutor::new(
//!     ChaosConfig::default(),
//!     Arc::new(SelectorRegistry::builtin()),
//!     Arc::new(ActionRegistry::builtin()),
//! );
//!
//! let model = Arc::new(InMemoryTopology::new().with_application("zookeeper", 3));
//! let ctx = GlitchContext::new(model, LocalBus::new(256));
//!
//! // Generate five random reboots and dispatch them two seconds apart
//! let report = executor.run(&ctx, None, Some(5)).await?;
//! println!("submitted {} actions", report.submitted);
//! # Ok(())
//! # }
//! ```

// Submodules
mod actions;
mod config;
mod executor;
mod plan;
mod registry;
mod selectors;

// Re-export configuration types
pub use config::{ChaosConfig, DEFAULT_EVENT_KIND, DEFAULT_ORIGIN, DEFAULT_PLAN_NAME};

// Re-export registry types
pub use registry::{Named, Registry};

// Re-export plan types
pub use plan::{
    read_plan, validate_plan, write_plan, ActionEntry, Extra, Plan, PlanGenerator, SelectorSpec,
};

// Re-export selector types
pub use selectors::{
    AgentStatus, Leader, One, Params, Selector, SelectorRegistry, SelectorResolver, Units,
    WorkloadStatus,
};

// Re-export action types
pub use actions::{action_fn, Action, ActionRegistry, FnAction, Reboot, Sleep};

// Re-export executor types
pub use executor::{GlitchContext, GlitchExecutor, RunReport};
