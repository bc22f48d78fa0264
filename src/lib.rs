//! Glitch - a chaos planner and dispatcher for modelled deployments.
//!
//! Glitch generates or accepts a plan of destructive actions (reboots,
//! pauses) aimed at units of a deployment, checks the plan's structure, keeps
//! a copy on disk, and hands each action to an event bus at a fixed pace.
//!
//! # Features
//!
//! - **Selector chains**: composable, left-to-right narrowing of targets.
//! - **Plan generation**: random plans against whatever units exist.
//! - **Pluggable registries**: register your own selectors and actions by name.
//! - **Paced dispatch**: fire-and-forget submission with a fixed interval.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Glitch                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI: run | generate | validate | list                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Chaos: Executor | Generator | Validator | Selectors        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Topology (model + command channel) | Event Bus             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use glitch::chaos::{validate_plan, read_plan};
//! use std::path::Path;
//!
//! fn main() -> glitch::Result<()> {
//!     let plan = validate_plan(read_plan(Path::new("glitch_plan.yaml"))?)?;
//!     println!("{} actions", plan.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

pub mod bus;
pub mod chaos;
pub mod shutdown;
pub mod topology;

pub mod cli;
pub mod observability;

// Re-exports
pub use error::{GlitchError, Result};
pub use types::*;
