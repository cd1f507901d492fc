//! Headless economy scenarios.
//!
//! A scenario names a catalog and config, registers producers with a
//! scripted order list, and ticks a single actor for a fixed number of
//! steps. Spawn requests are resolved immediately unless `auto_spawn` is
//! off, so units become available for requirements as they would in game.
//!
//! # Example RON
//!
//! ```ron
//! Scenario(
//!     name: "Opening",
//!     catalog: "catalog.ron",
//!     config: Some("economy.ron"),
//!     producers: [(id: 1, orders: [(producible: 10, quantity: 3.0)])],
//!     ticks: 120,
//!     delta: 1.0,
//! )
//! ```

use std::path::{Path, PathBuf};
use std::result::Result;
use std::sync::Arc;

use econ_core::prelude::*;
use econ_core::math::fixed_serde;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::validate::{load_catalog, load_config};

/// A producer and the orders queued on it at the start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerSetup {
    /// Producer id.
    pub id: u64,
    /// Orders to start, in sequence.
    #[serde(default)]
    pub orders: Vec<ProducibleQuantity>,
}

fn default_auto_spawn() -> bool {
    true
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Catalog file, relative to the scenario file.
    pub catalog: PathBuf,
    /// Config file, relative to the scenario file; defaults apply if absent.
    #[serde(default)]
    pub config: Option<PathBuf>,
    /// Producers to register.
    pub producers: Vec<ProducerSetup>,
    /// Number of ticks to run.
    pub ticks: u64,
    /// Time per tick.
    #[serde(with = "fixed_serde")]
    pub delta: Fixed,
    /// Resolve spawn requests as soon as they appear.
    #[serde(default = "default_auto_spawn")]
    pub auto_spawn: bool,
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ToolError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ToolError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        tracing::info!("Loaded scenario: {}", scenario.name);
        Ok(scenario)
    }

    /// Parse a scenario from a RON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string does not parse.
    pub fn from_ron_str(ron: &str) -> Result<Self, ToolError> {
        Ok(ron::from_str(ron)?)
    }
}

/// A production command the actor refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefusedOrder {
    /// The producer it was aimed at.
    pub producer: ProducerId,
    /// The requested order.
    pub order: ProducibleQuantity,
    /// Why it was refused.
    pub reason: ProductionError,
}

/// Outcome of running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Ticks simulated.
    pub ticks: u64,
    /// Orders completed across all producers.
    pub completed: usize,
    /// Orders refused when the scenario started.
    pub refused: Vec<RefusedOrder>,
    /// Final ledger, in id order, with display names.
    pub ledger: Vec<(ProducibleId, String, Fixed)>,
    /// Final population in use.
    pub population: Fixed,
    /// Final population capacity, `None` if disabled.
    pub population_max: Option<Fixed>,
    /// Units owned at the end.
    pub units: usize,
    /// Orders still queued at the end.
    pub queued: usize,
    /// Events emitted over the run.
    pub events: usize,
    /// Final actor state hash.
    pub state_hash: u64,
}

/// Run a scenario against an already loaded catalog and config.
///
/// # Errors
///
/// Returns an error if the config is invalid or producers collide.
pub fn run_scenario(
    scenario: &Scenario,
    catalog: Arc<Catalog>,
    config: &EconomyConfig,
) -> Result<ScenarioReport, ToolError> {
    let mut actor = EconomicActor::new(catalog, config)?
        .with_span(tracing::info_span!("scenario", name = %scenario.name));

    let mut refused = Vec::new();
    for setup in &scenario.producers {
        let producer = UnitId(setup.id);
        actor.add_producer(producer)?;
        for order in &setup.orders {
            let started = actor.start_production(producer, order.producible, order.quantity);
            if let Err(reason) = started {
                tracing::warn!(
                    %producer,
                    producible = %order.producible,
                    "Order refused: {reason}"
                );
                refused.push(RefusedOrder {
                    producer,
                    order: *order,
                    reason,
                });
            }
        }
    }

    // Spawned units are numbered after the highest producer id
    let mut next_unit = scenario.producers.iter().map(|p| p.id).max().unwrap_or(0) + 1;
    let mut completed = 0;
    let mut events = 0;

    for tick in 0..scenario.ticks {
        completed += actor.tick(scenario.delta);

        if scenario.auto_spawn {
            let tickets: Vec<SpawnTicket> = actor.pending_spawns().map(|(t, _)| t).collect();
            for ticket in tickets {
                actor.complete_spawn(ticket, UnitId(next_unit))?;
                next_unit += 1;
            }
        }

        for event in actor.drain_events() {
            tracing::debug!(tick, ?event, "Economy event");
            events += 1;
        }
    }

    let ledger = actor
        .ledger()
        .iter()
        .map(|(id, quantity)| {
            let name = actor
                .catalog()
                .get(id)
                .map_or_else(|| id.to_string(), |d| d.name.clone());
            (id, name, quantity)
        })
        .collect();

    Ok(ScenarioReport {
        name: scenario.name.clone(),
        ticks: scenario.ticks,
        completed,
        refused,
        ledger,
        population: actor.population().current(),
        population_max: actor.population().max(),
        units: actor.units().count(),
        queued: actor
            .producers()
            .filter_map(|p| actor.producer(p))
            .map(ProductionQueue::len)
            .sum(),
        events,
        state_hash: actor.state_hash(),
    })
}

/// Load a scenario file with its catalog and config and run it.
///
/// # Errors
///
/// Returns an error if any file is missing or invalid.
pub fn run_scenario_file(path: &Path) -> Result<ScenarioReport, ToolError> {
    let scenario = Scenario::load(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let catalog = load_catalog(&base.join(&scenario.catalog))?;
    let config = match &scenario.config {
        Some(config) => load_config(&base.join(config))?,
        None => EconomyConfig::default(),
    };

    run_scenario(&scenario, Arc::new(catalog), &config)
}
