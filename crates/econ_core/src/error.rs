//! Error types for the economy simulation.
//!
//! Routine game-state outcomes (insufficient resources, capacity clamping,
//! gate vetoes) are return values, not errors. The variants here cover
//! caller bugs and bad content data.

use thiserror::Error;

use crate::catalog::ProducibleId;
use crate::production::{ProducerId, SpawnTicket, UnitId};

/// Result type alias using [`EconomyError`].
pub type Result<T> = std::result::Result<T, EconomyError>;

/// Top-level error type for the economy simulation.
#[derive(Debug, Error)]
pub enum EconomyError {
    /// The unit is not owned by this actor.
    #[error("Unit {0} is not owned by this actor")]
    UnitNotOwned(UnitId),

    /// A spawn was resolved into a unit id this actor already owns.
    #[error("Unit {0} is already owned by this actor")]
    UnitAlreadyOwned(UnitId),

    /// The producer is not registered with this actor.
    #[error("Unknown producer: {0}")]
    UnknownProducer(ProducerId),

    /// The producer is already registered with this actor.
    #[error("Producer {0} is already registered")]
    DuplicateProducer(ProducerId),

    /// No definition with this identifier exists in the catalog.
    #[error("Unknown producible: {0}")]
    UnknownProducible(ProducibleId),

    /// A definition with this identifier was already registered.
    #[error("Duplicate producible ID: {0}")]
    DuplicateProducible(ProducibleId),

    /// No spawn is in flight for this ticket.
    #[error("Unknown spawn ticket: {0}")]
    UnknownSpawnTicket(SpawnTicket),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or label) of the document that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Catalog content failed validation.
    #[error("Catalog validation failed: {0:?}")]
    InvalidCatalog(Vec<String>),

    /// Configuration is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
