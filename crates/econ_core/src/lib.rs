//! # Econ Core
//!
//! Deterministic production and resource economy core for strategy games.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Lockstep multiplayer (identical simulation across clients)
//! - Headless simulation and tooling
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`catalog`] - Producible definitions and the catalog registry
//! - [`ledger`] - Per-actor resource quantities and storage caps
//! - [`population`] - Population accounting and the completion gate
//! - [`production`] - Production queues and their time-overflow cascade
//! - [`actor`] - The economic actor composing all of the above
//! - [`config`] - RON-loadable economy settings
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod actor;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod math;
pub mod population;
pub mod production;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actor::{EconomicActor, PendingSpawn};
    pub use crate::catalog::{
        AttributeId, AttributeValue, Catalog, CatalogData, ProducibleDefinition, ProducibleId,
        ProducibleKind, ProducibleQuantity, ValueKind,
    };
    pub use crate::config::{EconomyConfig, PopulationConfig};
    pub use crate::error::{EconomyError, Result};
    pub use crate::events::EconomyEvent;
    pub use crate::ledger::{CapacityMode, LedgerEvent, ResourceLedger};
    pub use crate::math::Fixed;
    pub use crate::population::{PopulationEvent, PopulationGate};
    pub use crate::production::{
        ProducerId, ProductionError, ProductionEvent, ProductionOrder, ProductionQueue,
        ProductionSink, SpawnTicket, UnitId,
    };
}
