//! Glitch CLI - Main entry point.

use glitch::bus::LocalBus;
use glitch::chaos::{
    read_plan, validate_plan, write_plan, ActionRegistry, GlitchContext, GlitchExecutor,
    PlanGenerator, SelectorRegistry,
};
use glitch::cli::{Cli, Commands};
use glitch::config::GlitchConfig;
use glitch::shutdown::{ShutdownCoordinator, SignalHandler};
use glitch::topology::InMemoryTopology;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How long `run` waits for dispatched actions before exiting.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let mut config = match &cli.config {
        Some(path) => GlitchConfig::from_file(path)?,
        None => GlitchConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    glitch::observability::init(&config.observability)?;

    let selectors = Arc::new(SelectorRegistry::builtin());
    let actions = Arc::new(ActionRegistry::builtin());

    match cli.command {
        Commands::Run {
            topology,
            plan,
            count,
            pacing_ms,
        } => {
            if let Some(ms) = pacing_ms {
                config.chaos.pacing_interval = Duration::from_millis(ms);
            }

            let model = Arc::new(InMemoryTopology::from_file(&topology)?);
            let plan = plan.as_deref().map(read_plan).transpose()?;

            let shutdown = ShutdownCoordinator::new();
            let signals = SignalHandler::new(shutdown.clone());
            tokio::spawn(async move {
                if let Err(e) = signals.run().await {
                    warn!("Failed to install signal handlers: {}", e);
                }
            });

            let bus = LocalBus::new(1024);
            let ctx = GlitchContext::new(model, bus.clone());
            let executor = GlitchExecutor::new(config.chaos, selectors, actions)
                .with_shutdown(shutdown.clone());

            let report = executor.run(&ctx, plan, count).await?;
            println!(
                "Submitted {} actions (plan: {})",
                report.submitted,
                report.plan_path.display()
            );

            if !bus.wait_settled_or_shutdown(SETTLE_TIMEOUT, &shutdown).await {
                warn!(in_flight = bus.in_flight(), "Exiting with actions still running");
            }
            let stats = bus.stats();
            info!(
                completed = stats.completed,
                failed = stats.failed,
                "Dispatched actions finished"
            );
        }

        Commands::Generate {
            topology,
            count,
            output,
        } => {
            let model = InMemoryTopology::from_file(&topology)?;
            let count = count.unwrap_or(config.chaos.default_count);
            let plan = PlanGenerator::new(actions).generate(&model, count)?;

            match output {
                Some(path) => {
                    write_plan(&path, &plan)?;
                    println!("Wrote {} actions to {}", plan.len(), path.display());
                }
                None => print!("{}", plan.to_yaml()?),
            }
        }

        Commands::Validate { plan } => {
            let plan = validate_plan(read_plan(&plan)?)?;
            println!("Plan is valid ({} actions)", plan.len());
            for entry in &plan.actions {
                let chain: Vec<&str> =
                    entry.selectors.iter().map(|s| s.selector.as_str()).collect();
                let mut unknown = Vec::new();
                if !actions.contains(&entry.action) {
                    unknown.push(entry.action.as_str());
                }
                unknown.extend(chain.iter().copied().filter(|s| !selectors.contains(s)));

                if unknown.is_empty() {
                    println!("  {} <- [{}]", entry.action, chain.join(" -> "));
                } else {
                    println!(
                        "  {} <- [{}]  (not registered: {})",
                        entry.action,
                        chain.join(" -> "),
                        unknown.join(", ")
                    );
                }
            }
        }

        Commands::List => {
            println!("Selectors:");
            for name in selectors.names() {
                println!("  {}", name);
            }
            println!("Actions:");
            for name in actions.names() {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}
