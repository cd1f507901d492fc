//! Test fixtures and helpers.
//!
//! A small but complete sample economy: two resources, a worker, a soldier
//! gated behind barracks, and one research. Ids are exposed in [`ids`] so
//! tests can refer to them by name.

use std::sync::Arc;

use econ_core::prelude::*;
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Identifiers used by [`sample_catalog`].
pub mod ids {
    use econ_core::prelude::{ProducerId, ProducibleId, UnitId};

    /// Stockpiled gold.
    pub const GOLD: ProducibleId = ProducibleId(1);
    /// Stockpiled wood.
    pub const WOOD: ProducibleId = ProducibleId(2);
    /// Worker unit: 50 gold, 1 population, 10 time units.
    pub const WORKER: ProducibleId = ProducibleId(10);
    /// Soldier unit: 100 gold, 2 population, needs barracks.
    pub const SOLDIER: ProducibleId = ProducibleId(11);
    /// Barracks structure: 100 wood, houses 5.
    pub const BARRACKS: ProducibleId = ProducibleId(20);
    /// Research: 200 gold.
    pub const ARCHERY: ProducibleId = ProducibleId(30);

    /// Producer registered by [`super::sample_actor`].
    pub const HQ: ProducerId = UnitId(100);
}

/// Build the sample catalog.
///
/// # Panics
///
/// Panics if the fixture definitions are inconsistent.
#[must_use]
pub fn sample_catalog() -> Arc<Catalog> {
    use ids::{ARCHERY, BARRACKS, GOLD, SOLDIER, WOOD, WORKER};

    let producibles = vec![
        ProducibleDefinition::new(GOLD, "Gold", ProducibleKind::Resource)
            .with_duration(fixed(5)),
        ProducibleDefinition::new(WOOD, "Wood", ProducibleKind::Resource)
            .with_duration(fixed(5)),
        ProducibleDefinition::new(WORKER, "Worker", ProducibleKind::Unit)
            .with_duration(fixed(10))
            .with_cost(GOLD, fixed(50))
            .with_attribute("population", fixed(1)),
        ProducibleDefinition::new(SOLDIER, "Soldier", ProducibleKind::Unit)
            .with_duration(fixed(15))
            .with_cost(GOLD, fixed(100))
            .with_requirement(BARRACKS, fixed(1))
            .with_attribute("population", fixed(2)),
        ProducibleDefinition::new(BARRACKS, "Barracks", ProducibleKind::Structure)
            .with_duration(fixed(20))
            .with_cost(WOOD, fixed(100))
            .with_attribute("housing", fixed(5)),
        ProducibleDefinition::new(ARCHERY, "Archery", ProducibleKind::Research)
            .with_duration(fixed(30))
            .with_cost(GOLD, fixed(200)),
    ];

    Arc::new(
        Catalog::from_data(CatalogData { producibles })
            .expect("sample catalog should be valid"),
    )
}

/// Config with 500 gold, 200 wood and room for 10 population.
#[must_use]
pub fn sample_config() -> EconomyConfig {
    EconomyConfig {
        starting_resources: vec![
            ProducibleQuantity::new(ids::GOLD, fixed(500)),
            ProducibleQuantity::new(ids::WOOD, fixed(200)),
        ],
        ..EconomyConfig::default()
    }
}

/// An actor over the sample catalog and config with [`ids::HQ`] registered
/// and the event log drained.
///
/// # Panics
///
/// Panics if the fixture config is rejected.
#[must_use]
pub fn sample_actor() -> EconomicActor {
    let mut actor = EconomicActor::new(sample_catalog(), &sample_config())
        .expect("sample config should be valid");
    actor
        .add_producer(ids::HQ)
        .expect("fresh actor has no producers");
    actor.drain_events();
    actor
}

/// Resolve every pending spawn, numbering units from `first_unit`.
///
/// Returns the next unused unit number.
///
/// # Panics
///
/// Panics if a pending ticket cannot be completed.
pub fn complete_all_spawns(actor: &mut EconomicActor, first_unit: u64) -> u64 {
    let tickets: Vec<SpawnTicket> = actor.pending_spawns().map(|(t, _)| t).collect();
    let mut next = first_unit;
    for ticket in tickets {
        actor
            .complete_spawn(ticket, UnitId(next))
            .expect("ticket was pending");
        tracing::trace!(%ticket, unit = next, "Fixture spawn completed");
        next += 1;
    }
    next
}
