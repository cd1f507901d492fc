//! Economy configuration.
//!
//! Loaded from RON alongside the catalog. Every field has a default, so a
//! config file only needs to name what it changes.
//!
//! # Example RON
//!
//! ```ron
//! EconomyConfig(
//!     capacity_mode: SharedPool,
//!     common_max_quantity: 500.0,
//!     max_quantities: [(producible: 1, quantity: 200.0)],
//!     starting_resources: [(producible: 1, quantity: 100.0)],
//!     population: PopulationConfig(initial_max: 10.0),
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::catalog::{AttributeId, Catalog, ProducibleId, ProducibleQuantity};
use crate::error::{EconomyError, Result};
use crate::ledger::{CapacityMode, ResourceLedger};
use crate::math::{fixed_serde, Fixed};

/// Population gate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Attribute whose value is the population a producible takes up.
    pub consumption_attribute: AttributeId,
    /// Attribute whose value is the population capacity a producible adds.
    pub capacity_attribute: AttributeId,
    /// Whether population capacity is enforced at all.
    pub capacity_enabled: bool,
    /// Capacity before anything providing housing is owned.
    #[serde(with = "fixed_serde")]
    pub initial_max: Fixed,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            consumption_attribute: AttributeId::new("population"),
            capacity_attribute: AttributeId::new("housing"),
            capacity_enabled: true,
            initial_max: Fixed::from_bits(10 << 32),
        }
    }
}

/// Settings for one economic actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// How storage caps are shared.
    pub capacity_mode: CapacityMode,
    /// Default per-type cap, or the shared pool size.
    #[serde(with = "fixed_serde")]
    pub common_max_quantity: Fixed,
    /// Disable storage caps entirely.
    pub unlimited: bool,
    /// Resource types exempt from storage caps.
    pub uncapped: Vec<ProducibleId>,
    /// Per-type cap overrides (ignored in shared-pool mode).
    pub max_quantities: Vec<ProducibleQuantity>,
    /// Producibles granted when the actor is created.
    pub starting_resources: Vec<ProducibleQuantity>,
    /// Maximum orders per producer queue; `None` is unbounded.
    pub producer_queue_limit: Option<usize>,
    /// Population settings.
    pub population: PopulationConfig,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            capacity_mode: CapacityMode::PerType,
            common_max_quantity: ResourceLedger::DEFAULT_COMMON_MAX,
            unlimited: false,
            uncapped: Vec::new(),
            max_quantities: Vec::new(),
            starting_resources: Vec::new(),
            producer_queue_limit: None,
            population: PopulationConfig::default(),
        }
    }
}

impl EconomyConfig {
    /// Parse a RON config document.
    ///
    /// `label` names the document in error messages (usually its path).
    pub fn from_ron_str(source: &str, label: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| EconomyError::DataParseError {
            path: label.to_string(),
            message: e.to_string(),
        })
    }

    /// Validate the config against a catalog.
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self, catalog: &Catalog) -> Vec<String> {
        let mut errors = Vec::new();

        if self.common_max_quantity < Fixed::ZERO {
            errors.push("Common max quantity is negative".to_string());
        }

        for id in &self.uncapped {
            if !catalog.contains(*id) {
                errors.push(format!("Uncapped entry references unknown producible {id}"));
            }
        }

        for (label, entries) in [
            ("Max quantity", &self.max_quantities),
            ("Starting resource", &self.starting_resources),
        ] {
            for entry in entries {
                if !catalog.contains(entry.producible) {
                    errors.push(format!(
                        "{label} entry references unknown producible {}",
                        entry.producible
                    ));
                }
                if entry.quantity < Fixed::ZERO {
                    errors.push(format!(
                        "{label} entry for {} is negative",
                        entry.producible
                    ));
                }
            }
        }

        if self.producer_queue_limit == Some(0) {
            errors.push("Producer queue limit must be at least 1".to_string());
        }

        let population = &self.population;
        if population.consumption_attribute == population.capacity_attribute {
            errors.push(format!(
                "Population consumption and capacity share attribute '{}'",
                population.consumption_attribute
            ));
        }
        if population.initial_max < Fixed::ZERO {
            errors.push("Initial max population is negative".to_string());
        }

        errors
    }

    /// Validate and fail with [`EconomyError::InvalidConfig`] on any error.
    pub fn ensure_valid(&self, catalog: &Catalog) -> Result<()> {
        let errors = self.validate(catalog);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EconomyError::InvalidConfig(errors.join("; ")))
        }
    }

    /// Build a ledger with this config's cap settings.
    ///
    /// Non-resource producibles in `catalog` (units, structures, research)
    /// are always uncapped: they are counted, not stored.
    #[must_use]
    pub fn build_ledger(&self, catalog: &Catalog) -> ResourceLedger {
        let mut ledger = ResourceLedger::new(self.capacity_mode, self.common_max_quantity);
        ledger.set_all_unlimited(self.unlimited);

        let uncounted = catalog
            .iter()
            .filter(|d| !d.kind.is_capped_by_default())
            .map(|d| d.id);
        for id in self.uncapped.iter().copied().chain(uncounted) {
            ledger.set_unlimited(id, true);
        }
        for entry in &self.max_quantities {
            ledger.set_max_quantity(entry.producible, entry.quantity);
        }

        ledger.drain_events();
        ledger
    }
}
