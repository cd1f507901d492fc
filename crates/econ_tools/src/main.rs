//! Strategy Economy - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "econ-tools")]
#[command(about = "Development tools for the strategy economy core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a catalog file, and optionally a config against it
    Validate {
        /// Path to the catalog RON file
        #[arg(default_value = "data/catalog.ron")]
        catalog: PathBuf,
        /// Path to an economy config RON file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run a headless scenario and report the final economy
    Simulate {
        /// Path to the scenario RON file
        scenario: PathBuf,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { catalog, config } => {
            tracing::info!("Validating catalog: {}", catalog.display());
            match econ_tools::validate::validate_files(&catalog, config.as_deref()) {
                Ok(summary) => {
                    tracing::info!(
                        producibles = summary.producibles,
                        config = summary.config_checked,
                        "Validation passed"
                    );
                    for (kind, count) in &summary.by_kind {
                        tracing::info!("  {kind}: {count}");
                    }
                }
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Simulate { scenario } => {
            match econ_tools::scenario::run_scenario_file(&scenario) {
                Ok(report) => {
                    tracing::info!(
                        ticks = report.ticks,
                        completed = report.completed,
                        queued = report.queued,
                        events = report.events,
                        state_hash = report.state_hash,
                        "Scenario '{}' finished",
                        report.name
                    );
                    for refused in &report.refused {
                        tracing::warn!(
                            "  refused {} x{} on {}: {}",
                            refused.order.producible,
                            refused.order.quantity,
                            refused.producer,
                            refused.reason
                        );
                    }
                    for (id, name, quantity) in &report.ledger {
                        tracing::info!("  {name} ({id}): {quantity}");
                    }
                    match report.population_max {
                        Some(max) => tracing::info!("  population: {}/{max}", report.population),
                        None => tracing::info!("  population: {}", report.population),
                    }
                }
                Err(e) => {
                    tracing::error!("Scenario failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
