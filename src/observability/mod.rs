//! Logging setup for glitch.
//!
//! Logs go to stderr in both formats; stdout carries command output such as
//! generated plans.

use crate::config::ObservabilityConfig;
use crate::error::{GlitchError, Result};
use ::tracing::info;
use std::io;
use tracing_subscriber::fmt::format::{DefaultFields, Format, Json, JsonFields};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type StderrWriter = fn() -> io::Stderr;

fn plain_layer<S>() -> fmt::Layer<S, DefaultFields, Format, StderrWriter> {
    fmt::layer().with_writer(io::stderr as StderrWriter)
}

fn json_layer<S>() -> fmt::Layer<S, JsonFields, Format<Json>, StderrWriter> {
    fmt::layer().json().with_writer(io::stderr as StderrWriter)
}

/// Initialize logging.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(json_layer())
            .try_init()
            .map_err(|e| GlitchError::Config(format!("Failed to init logging: {}", e)))?;
    } else {
        subscriber
            .with(plain_layer())
            .try_init()
            .map_err(|e| GlitchError::Config(format!("Failed to init logging: {}", e)))?;
    }

    info!("Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::Registry;

    #[test]
    fn test_both_formats_write_to_stderr() {
        let json = json_layer::<Registry>();
        let _: io::Stderr = (json.writer())();

        let plain = plain_layer::<Registry>();
        let _: io::Stderr = (plain.writer())();
    }

    #[test]
    fn test_init_once() {
        let config = ObservabilityConfig::default();
        assert!(init(&config).is_ok());
        // A global subscriber is already installed.
        assert!(matches!(init(&config), Err(GlitchError::Config(_))));
    }
}
