//! Error types for the glitch planner.
//!
//! This module provides a unified error type [`GlitchError`] for every stage of
//! a chaos run, along with a convenient [`Result`] type alias.
//!
//! # Error Categories
//!
//! - **Plan structure**: raised by the validator before anything is persisted
//! - **Generation**: the topology or registry has nothing to plan against
//! - **Selection**: selector chains that cannot be evaluated
//! - **Dispatch**: registry misses and bus refusals during execution
//! - **Configuration**: invalid settings or unreadable config files
//!
//! None of these are retried. A run that fails part way stops there, and the
//! persisted plan document stays on disk as the record of what was attempted.
//!
//! # Example
//!
//! ```rust
//! use glitch::error::{GlitchError, Result};
//!
//! fn require_action(entry: &serde_json::Value) -> Result<&str> {
//!     entry
//!         .get("action")
//!         .and_then(|a| a.as_str())
//!         .ok_or_else(|| GlitchError::InvalidAction(entry.to_string()))
//! }
//!
//! let err = require_action(&serde_json::json!({})).unwrap_err();
//! assert!(err.is_plan_error());
//! ```

use std::io;
use thiserror::Error;

/// Main error type for glitch operations.
#[derive(Error, Debug)]
pub enum GlitchError {
    // Plan structure errors
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    // Generation errors
    #[error("No units to test in the current model")]
    NoUnits,

    #[error("No actions registered to build a plan from")]
    NoActions,

    // Selection errors
    #[error("No valid objects specified by selectors")]
    EmptySelection,

    #[error("Unknown selector: {0}")]
    UnknownSelector(String),

    #[error("Selector {selector} expected {expected} for {param}, got {got}")]
    ResolutionType {
        selector: String,
        param: String,
        expected: String,
        got: String,
    },

    #[error("Selector {selector}: {reason}")]
    SelectorInput { selector: String, reason: String },

    #[error("Selector {selector} received an empty working set")]
    EmptyWorkingSet { selector: String },

    // Dispatch errors
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Bus refused dispatch: {0}")]
    Dispatch(String),

    #[error("Command failed on {target}: {reason}")]
    CommandFailed { target: String, reason: String },

    #[error("Run cancelled after {submitted} submitted actions")]
    Cancelled { submitted: usize },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl GlitchError {
    /// True for structural defects found before anything was persisted.
    pub fn is_plan_error(&self) -> bool {
        matches!(self, GlitchError::InvalidPlan(_) | GlitchError::InvalidAction(_))
    }

    /// True for failures that surfaced while the plan was being executed.
    ///
    /// Once one of these is returned some actions may already be in flight.
    pub fn is_dispatch_error(&self) -> bool {
        matches!(
            self,
            GlitchError::EmptySelection
                | GlitchError::UnknownSelector(_)
                | GlitchError::ResolutionType { .. }
                | GlitchError::SelectorInput { .. }
                | GlitchError::EmptyWorkingSet { .. }
                | GlitchError::UnknownAction(_)
                | GlitchError::Dispatch(_)
                | GlitchError::Cancelled { .. }
        )
    }
}

impl From<serde_json::Error> for GlitchError {
    fn from(e: serde_json::Error) -> Self {
        GlitchError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for GlitchError {
    fn from(e: serde_yaml::Error) -> Self {
        GlitchError::Serialization(e.to_string())
    }
}

/// Result type alias for glitch operations.
pub type Result<T> = std::result::Result<T, GlitchError>;
