//! Population accounting and the population completion gate.
//!
//! Population consumption and capacity are not stored on definitions
//! directly; they are read from two configured attributes. A producible
//! carrying the consumption attribute takes up population when granted,
//! one carrying the capacity attribute raises the maximum.

use crate::catalog::{AttributeId, ProducibleDefinition};
use crate::config::PopulationConfig;
use crate::math::{non_negative, Fixed};

/// Notifications generated by population changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationEvent {
    /// Current or maximum population changed.
    PopulationChanged {
        /// Population in use.
        current: Fixed,
        /// Population capacity, `None` when capacity is disabled.
        max: Option<Fixed>,
    },
}

/// Population state for one economic actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationGate {
    consumption_attribute: AttributeId,
    capacity_attribute: AttributeId,
    capacity_enabled: bool,
    current: Fixed,
    max: Fixed,
    events: Vec<PopulationEvent>,
}

impl Default for PopulationGate {
    fn default() -> Self {
        Self::new(&PopulationConfig::default())
    }
}

impl PopulationGate {
    /// Create a gate from configuration.
    #[must_use]
    pub fn new(config: &PopulationConfig) -> Self {
        Self {
            consumption_attribute: config.consumption_attribute.clone(),
            capacity_attribute: config.capacity_attribute.clone(),
            capacity_enabled: config.capacity_enabled,
            current: Fixed::ZERO,
            max: non_negative(config.initial_max),
            events: Vec::new(),
        }
    }

    /// Population in use.
    #[must_use]
    pub const fn current(&self) -> Fixed {
        self.current
    }

    /// Population capacity, or `None` when capacity is disabled.
    #[must_use]
    pub fn max(&self) -> Option<Fixed> {
        self.capacity_enabled.then_some(self.max)
    }

    /// Unused population capacity, or `None` when capacity is disabled.
    #[must_use]
    pub fn free(&self) -> Option<Fixed> {
        self.max()
            .map(|max| non_negative(max.saturating_sub(self.current)))
    }

    /// Whether capacity limits are enforced.
    #[must_use]
    pub const fn capacity_enabled(&self) -> bool {
        self.capacity_enabled
    }

    /// Population used by one unit of `definition`, if it consumes any.
    #[must_use]
    pub fn consumption_delta(&self, definition: &ProducibleDefinition) -> Option<Fixed> {
        definition
            .attribute(&self.consumption_attribute)
            .map(|a| a.value)
    }

    /// Capacity provided by one unit of `definition`, if it provides any.
    #[must_use]
    pub fn capacity_delta(&self, definition: &ProducibleDefinition) -> Option<Fixed> {
        definition
            .attribute(&self.capacity_attribute)
            .map(|a| a.value)
    }

    /// Apply the population effects of gaining `quantity` of `definition`.
    pub fn on_producible_granted(&mut self, definition: &ProducibleDefinition, quantity: Fixed) {
        self.apply(definition, quantity);
    }

    /// Undo the population effects of `quantity` of `definition`.
    pub fn on_producible_revoked(&mut self, definition: &ProducibleDefinition, quantity: Fixed) {
        self.apply(definition, quantity.saturating_neg());
    }

    /// Whether completing `quantity` of `definition` fits in the population cap.
    #[must_use]
    pub fn should_allow_completion(
        &self,
        definition: &ProducibleDefinition,
        quantity: Fixed,
    ) -> bool {
        if !self.capacity_enabled {
            return true;
        }
        let Some(consumption) = self.consumption_delta(definition) else {
            return true;
        };
        self.current
            .saturating_add(consumption.saturating_mul(quantity))
            <= self.max
    }

    /// Take all pending notifications.
    pub fn drain_events(&mut self) -> Vec<PopulationEvent> {
        std::mem::take(&mut self.events)
    }

    fn apply(&mut self, definition: &ProducibleDefinition, quantity: Fixed) {
        let capacity = self.capacity_delta(definition);
        let consumption = self.consumption_delta(definition);
        if capacity.is_none() && consumption.is_none() {
            return;
        }

        if let Some(capacity) = capacity {
            self.max = non_negative(self.max.saturating_add(capacity.saturating_mul(quantity)));
        }
        if let Some(consumption) = consumption {
            self.current = self
                .current
                .saturating_add(consumption.saturating_mul(quantity));
            if self.capacity_enabled {
                self.current = non_negative(self.current);
            }
        }

        tracing::trace!(current = %self.current, max = %self.max, "Population changed");
        self.events.push(PopulationEvent::PopulationChanged {
            current: self.current,
            max: self.max(),
        });
    }
}
