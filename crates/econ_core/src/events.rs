//! Unified notification stream for an economic actor.
//!
//! Each component keeps its own event buffer; the actor drains them after
//! every mutation and appends them here, so the log reads in emission order.

use crate::ledger::LedgerEvent;
use crate::population::PopulationEvent;
use crate::production::ProductionEvent;

/// Any notification an economic actor can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EconomyEvent {
    /// Ledger quantity or cap change.
    Ledger(LedgerEvent),
    /// Population change.
    Population(PopulationEvent),
    /// Production, spawn or refund notification.
    Production(ProductionEvent),
}

impl From<LedgerEvent> for EconomyEvent {
    fn from(event: LedgerEvent) -> Self {
        Self::Ledger(event)
    }
}

impl From<PopulationEvent> for EconomyEvent {
    fn from(event: PopulationEvent) -> Self {
        Self::Population(event)
    }
}

impl From<ProductionEvent> for EconomyEvent {
    fn from(event: ProductionEvent) -> Self {
        Self::Production(event)
    }
}

impl EconomyEvent {
    /// The production event, if this is one.
    #[must_use]
    pub const fn as_production(&self) -> Option<&ProductionEvent> {
        match self {
            Self::Production(event) => Some(event),
            _ => None,
        }
    }
}
