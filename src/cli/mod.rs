//! Command-line interface for glitch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Glitch - plan and dispatch chaos against a modelled deployment.
#[derive(Parser)]
#[command(name = "glitch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GLITCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long, env = "GLITCH_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Execute a plan, generating one when none is given
    Run {
        /// Topology snapshot (YAML or JSON)
        #[arg(short, long, env = "GLITCH_TOPOLOGY")]
        topology: PathBuf,

        /// Plan document to execute instead of generating one
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Number of actions in a generated plan
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Delay between dispatches in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,
    },

    /// Generate a plan and print or save it without executing
    Generate {
        /// Topology snapshot (YAML or JSON)
        #[arg(short, long, env = "GLITCH_TOPOLOGY")]
        topology: PathBuf,

        /// Number of actions
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Write the plan here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the structure of a plan document
    Validate {
        /// Plan document
        plan: PathBuf,
    },

    /// List registered selectors and actions
    List,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "glitch",
            "--log-level",
            "debug",
            "run",
            "--topology",
            "model.yaml",
            "-n",
            "3",
            "--pacing-ms",
            "50",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Run {
                topology,
                plan,
                count,
                pacing_ms,
            } => {
                assert_eq!(topology, PathBuf::from("model.yaml"));
                assert!(plan.is_none());
                assert_eq!(count, Some(3));
                assert_eq!(pacing_ms, Some(50));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_validate_requires_plan() {
        assert!(Cli::try_parse_from(["glitch", "validate"]).is_err());
        let cli = Cli::try_parse_from(["glitch", "validate", "plan.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Validate { .. }));
    }
}
