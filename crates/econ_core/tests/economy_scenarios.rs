//! Scenario tests that drive a whole economy through a build order.
//!
//! These use the shared sample catalog and only the public API, the way a
//! host game would.

use std::sync::Arc;

use econ_core::prelude::*;
use econ_test_utils::determinism::verify_actor_determinism;
use econ_test_utils::fixtures::{complete_all_spawns, fixed, fixed_f, ids, sample_actor};

// =============================================================================
// Build orders
// =============================================================================

#[test]
fn test_barracks_unlocks_soldiers() {
    let mut actor = sample_actor();

    assert!(matches!(
        actor.start_production(ids::HQ, ids::SOLDIER, fixed(1)),
        Err(ProductionError::UnmetRequirement(_))
    ));

    actor
        .start_production(ids::HQ, ids::BARRACKS, fixed(1))
        .unwrap();
    actor.tick(fixed(20));
    assert_eq!(actor.pending_spawns().count(), 0);
    actor.tick(fixed(1));
    let next_unit = complete_all_spawns(&mut actor, 1);

    assert_eq!(actor.ledger().quantity(ids::BARRACKS), fixed(1));
    assert_eq!(actor.population().max(), Some(fixed(15)));

    actor
        .start_production(ids::HQ, ids::SOLDIER, fixed(2))
        .unwrap();
    assert_eq!(actor.tick(fixed(31)), 2);
    complete_all_spawns(&mut actor, next_unit);

    assert_eq!(actor.ledger().quantity(ids::SOLDIER), fixed(2));
    assert_eq!(actor.population().current(), fixed(4));
    assert_eq!(actor.ledger().quantity(ids::GOLD), fixed(300));
}

#[test]
fn test_population_cap_blocks_then_housing_releases() {
    let mut actor = sample_actor();
    actor
        .start_production(ids::HQ, ids::WORKER, fixed(10))
        .unwrap();
    actor.tick(fixed(1000));
    complete_all_spawns(&mut actor, 1);
    assert_eq!(actor.population().current(), fixed(10));

    // No gold left for more workers; grant some and queue an eleventh
    actor.grant(ids::GOLD, fixed(50)).unwrap();
    actor
        .start_production(ids::HQ, ids::WORKER, fixed(1))
        .unwrap();
    assert_eq!(actor.tick(fixed(100)), 0);

    // A structure granted from outside raises the cap once spawned
    actor.grant(ids::BARRACKS, fixed(1)).unwrap();
    complete_all_spawns(&mut actor, 50);
    assert_eq!(actor.tick(fixed(11)), 1);
}

#[test]
fn test_events_drain_in_emission_order() {
    let mut actor = sample_actor();
    actor
        .start_production(ids::HQ, ids::ARCHERY, fixed(1))
        .unwrap();
    actor.tick(fixed(31));

    let events = actor.drain_events();
    let production: Vec<&ProductionEvent> =
        events.iter().filter_map(EconomyEvent::as_production).collect();

    assert!(matches!(
        production[0],
        ProductionEvent::ProductionStarted { .. }
    ));
    assert!(matches!(
        production[1],
        ProductionEvent::ProductionFinished { .. }
    ));
    assert!(matches!(
        production[2],
        ProductionEvent::ResearchCompleted { .. }
    ));
    assert!(actor.drain_events().is_empty());
}

#[test]
fn test_fractional_resource_order() {
    let mut actor = sample_actor();
    actor
        .start_production(ids::HQ, ids::WOOD, fixed_f(2.5))
        .unwrap();
    assert_eq!(actor.producer(ids::HQ).unwrap().len(), 1);

    actor.tick(fixed(6));
    assert_eq!(actor.ledger().quantity(ids::WOOD), fixed_f(202.5));
}

#[test]
fn test_remove_owned_producer_unit() {
    let mut actor = sample_actor();
    actor
        .start_production(ids::HQ, ids::BARRACKS, fixed(1))
        .unwrap();
    actor.tick(fixed(21));
    complete_all_spawns(&mut actor, 7);

    // The barracks becomes a producer in its own right
    let barracks = UnitId(7);
    actor.add_producer(barracks).unwrap();
    actor
        .start_production(barracks, ids::SOLDIER, fixed(1))
        .unwrap();
    let gold = actor.ledger().quantity(ids::GOLD);

    actor.remove_unit(barracks).unwrap();
    assert!(actor.producer(barracks).is_none());
    assert!(!actor.owns_unit(barracks));
    assert_eq!(actor.ledger().quantity(ids::GOLD), gold + fixed(100));
    assert_eq!(actor.ledger().quantity(ids::BARRACKS), Fixed::ZERO);
}

// =============================================================================
// Loading from data
// =============================================================================

const CATALOG_RON: &str = r#"
CatalogData(
    producibles: [
        (id: 1, name: "Ore", kind: Resource, production_duration: 2.0),
        (
            id: 2,
            name: "Drone",
            kind: Unit,
            attributes: [(attribute: "population", value: 1.0)],
            cost: [(producible: 1, quantity: 25.0)],
            production_duration: 4.0,
        ),
    ],
)
"#;

const CONFIG_RON: &str = r#"
EconomyConfig(
    common_max_quantity: 100.0,
    starting_resources: [(producible: 1, quantity: 60.0)],
    producer_queue_limit: Some(3),
    population: PopulationConfig(initial_max: 2.0),
)
"#;

#[test]
fn test_actor_from_ron() {
    let catalog = Catalog::from_ron_str(CATALOG_RON, "catalog.ron").unwrap();
    let config = EconomyConfig::from_ron_str(CONFIG_RON, "config.ron").unwrap();
    let mut actor = EconomicActor::new(Arc::new(catalog), &config).unwrap();
    actor.add_producer(UnitId(1)).unwrap();

    let ore = ProducibleId(1);
    let drone = ProducibleId(2);
    actor.start_production(UnitId(1), drone, fixed(2)).unwrap();
    assert_eq!(actor.ledger().quantity(ore), fixed(10));
    assert_eq!(
        actor.start_production(UnitId(1), ore, fixed(500)),
        Ok(())
    );
    assert_eq!(
        actor.start_production(UnitId(1), ore, fixed(1)),
        Err(ProductionError::QueueFull)
    );

    actor.tick(fixed(11));
    assert_eq!(actor.pending_spawns().count(), 2);
    // Ore fills the store and the rest overflows
    assert_eq!(actor.ledger().quantity(ore), fixed(100));
}

#[test]
fn test_bad_catalog_reference_rejected() {
    let source = r#"
        CatalogData(producibles: [
            (id: 1, name: "Drone", kind: Unit, cost: [(producible: 9, quantity: 1.0)]),
        ])
    "#;
    assert!(matches!(
        Catalog::from_ron_str(source, "bad.ron"),
        Err(EconomyError::InvalidCatalog(_))
    ));
    assert!(matches!(
        Catalog::from_ron_str("not ron", "broken.ron"),
        Err(EconomyError::DataParseError { .. })
    ));
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_build_order_is_deterministic() {
    let setup = || {
        let mut actor = sample_actor();
        actor
            .start_production(ids::HQ, ids::WORKER, fixed(4))
            .unwrap();
        actor
            .start_production(ids::HQ, ids::BARRACKS, fixed(1))
            .unwrap();
        actor
            .start_production(ids::HQ, ids::GOLD, fixed_f(12.5))
            .unwrap();
        actor
    };
    assert!(verify_actor_determinism(setup, 120, fixed_f(0.75)));
}
