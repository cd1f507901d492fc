//! Producible definitions and the catalog that holds them.
//!
//! Definitions are pure data, loaded once before any simulation runs and
//! never mutated afterwards. Everything else in the crate refers to them
//! by [`ProducibleId`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, Result};
use crate::math::{fixed_serde, Fixed};

/// Unique identifier for producible types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProducibleId(pub u32);

impl ProducibleId {
    /// Create a new producible ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ProducibleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What completing a producible yields.
///
/// Completion routing matches on this exhaustively, so adding a kind forces
/// every consumer to decide how to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProducibleKind {
    /// A stockpiled resource held in the ledger, subject to storage caps.
    Resource,
    /// A mobile unit spawned into the world.
    Unit,
    /// A building spawned into the world.
    Structure,
    /// A technology; once held it satisfies requirements.
    Research,
}

impl ProducibleKind {
    /// Whether completing this kind yields a spawned entity.
    #[must_use]
    pub const fn is_spawned(self) -> bool {
        matches!(self, Self::Unit | Self::Structure)
    }

    /// Whether orders of this kind are queued one unit at a time.
    #[must_use]
    pub const fn splits_into_unit_orders(self) -> bool {
        self.is_spawned()
    }

    /// Whether this kind is subject to ledger storage caps.
    #[must_use]
    pub const fn is_capped_by_default(self) -> bool {
        matches!(self, Self::Resource)
    }
}

/// Identifier of an attribute carried by a definition (e.g. `"population"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeId(pub String);

impl AttributeId {
    /// Create a new attribute ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for AttributeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an attribute value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueKind {
    /// Added to the existing value.
    #[default]
    Relative,
    /// Replaces the existing value.
    Absolute,
    /// Scales the existing value by a percentage.
    Percentage,
}

/// A single attribute entry on a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    /// Which attribute this is.
    pub attribute: AttributeId,
    /// The attribute's value.
    #[serde(with = "fixed_serde")]
    pub value: Fixed,
    /// How the value is applied.
    #[serde(default)]
    pub value_kind: ValueKind,
}

impl AttributeValue {
    /// Create a new attribute entry.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: Fixed, value_kind: ValueKind) -> Self {
        Self {
            attribute: AttributeId::new(attribute),
            value,
            value_kind,
        }
    }
}

/// An amount of a producible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProducibleQuantity {
    /// The producible type.
    pub producible: ProducibleId,
    /// The amount (may be fractional).
    #[serde(with = "fixed_serde")]
    pub quantity: Fixed,
}

impl ProducibleQuantity {
    /// Create a new producible quantity.
    #[must_use]
    pub const fn new(producible: ProducibleId, quantity: Fixed) -> Self {
        Self {
            producible,
            quantity,
        }
    }

    /// Return a copy with the quantity multiplied by `factor`.
    #[must_use]
    pub fn scaled(self, factor: Fixed) -> Self {
        Self {
            producible: self.producible,
            quantity: self.quantity.saturating_mul(factor),
        }
    }
}

/// Immutable definition of something that can be produced.
///
/// # Example RON
///
/// ```ron
/// (
///     id: 10,
///     name: "Worker",
///     kind: Unit,
///     attributes: [(attribute: "population", value: 1.0)],
///     cost: [(producible: 1, quantity: 50.0)],
///     requirements: [(producible: 20, quantity: 1.0)],
///     production_duration: 12.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducibleDefinition {
    /// Unique identifier for this producible.
    pub id: ProducibleId,
    /// Display name.
    pub name: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// What completing this producible yields.
    pub kind: ProducibleKind,
    /// Ordered attribute list.
    #[serde(default)]
    pub attributes: Vec<AttributeValue>,
    /// Producibles that must be held (not consumed) to produce this.
    #[serde(default)]
    pub requirements: Vec<ProducibleQuantity>,
    /// Producibles consumed to start producing one unit of this.
    #[serde(default)]
    pub cost: Vec<ProducibleQuantity>,
    /// Time units needed for one order.
    #[serde(default, with = "fixed_serde")]
    pub production_duration: Fixed,
}

impl ProducibleDefinition {
    /// Create a definition with no cost, requirements or attributes.
    #[must_use]
    pub fn new(id: ProducibleId, name: impl Into<String>, kind: ProducibleKind) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            kind,
            attributes: Vec::new(),
            requirements: Vec::new(),
            cost: Vec::new(),
            production_duration: Fixed::ZERO,
        }
    }

    /// Set the production duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Fixed) -> Self {
        self.production_duration = duration;
        self
    }

    /// Add a cost entry.
    #[must_use]
    pub fn with_cost(mut self, producible: ProducibleId, quantity: Fixed) -> Self {
        self.cost.push(ProducibleQuantity::new(producible, quantity));
        self
    }

    /// Add a requirement entry.
    #[must_use]
    pub fn with_requirement(mut self, producible: ProducibleId, quantity: Fixed) -> Self {
        self.requirements
            .push(ProducibleQuantity::new(producible, quantity));
        self
    }

    /// Add a relative attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>, value: Fixed) -> Self {
        self.attributes
            .push(AttributeValue::new(attribute, value, ValueKind::Relative));
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// First attribute entry matching `attribute`.
    #[must_use]
    pub fn attribute(&self, attribute: &AttributeId) -> Option<&AttributeValue> {
        self.attributes.iter().find(|a| &a.attribute == attribute)
    }

    /// Cost of `quantity` units.
    #[must_use]
    pub fn cost_for(&self, quantity: Fixed) -> Vec<ProducibleQuantity> {
        self.cost.iter().map(|c| c.scaled(quantity)).collect()
    }

    /// Requirements for `quantity` units.
    #[must_use]
    pub fn requirements_for(&self, quantity: Fixed) -> Vec<ProducibleQuantity> {
        self.requirements
            .iter()
            .map(|r| r.scaled(quantity))
            .collect()
    }
}

/// Serialized form of a catalog.
///
/// ```ron
/// CatalogData(
///     producibles: [ ... ],
/// )
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogData {
    /// All definitions.
    pub producibles: Vec<ProducibleDefinition>,
}

/// Registry containing all producible definitions.
///
/// Iteration is always in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    producibles: BTreeMap<ProducibleId, ProducibleDefinition>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from loaded data, validating cross references.
    pub fn from_data(data: CatalogData) -> Result<Self> {
        let mut catalog = Self::new();
        for definition in data.producibles {
            catalog.register(definition)?;
        }

        let errors = catalog.validate();
        if !errors.is_empty() {
            return Err(EconomyError::InvalidCatalog(errors));
        }
        Ok(catalog)
    }

    /// Parse and validate a RON catalog document.
    ///
    /// `label` names the document in error messages (usually its path).
    pub fn from_ron_str(source: &str, label: &str) -> Result<Self> {
        let data: CatalogData =
            ron::from_str(source).map_err(|e| EconomyError::DataParseError {
                path: label.to_string(),
                message: e.to_string(),
            })?;
        Self::from_data(data)
    }

    /// Register a definition.
    pub fn register(&mut self, definition: ProducibleDefinition) -> Result<()> {
        if self.producibles.contains_key(&definition.id) {
            return Err(EconomyError::DuplicateProducible(definition.id));
        }
        self.producibles.insert(definition.id, definition);
        Ok(())
    }

    /// Get a definition by ID.
    #[must_use]
    pub fn get(&self, id: ProducibleId) -> Option<&ProducibleDefinition> {
        self.producibles.get(&id)
    }

    /// Get a definition by ID or fail with [`EconomyError::UnknownProducible`].
    pub fn require(&self, id: ProducibleId) -> Result<&ProducibleDefinition> {
        self.get(id).ok_or(EconomyError::UnknownProducible(id))
    }

    /// Check whether a definition exists.
    #[must_use]
    pub fn contains(&self, id: ProducibleId) -> bool {
        self.producibles.contains_key(&id)
    }

    /// All definitions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ProducibleDefinition> {
        self.producibles.values()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.producibles.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.producibles.is_empty()
    }

    /// Validate internal consistency.
    ///
    /// Checks that cost and requirement entries reference known producibles
    /// with positive quantities, that durations are non-negative, and that
    /// nothing requires or costs itself.
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for definition in self.iter() {
            if definition.production_duration < Fixed::ZERO {
                errors.push(format!(
                    "Producible '{}' has negative production duration",
                    definition.name
                ));
            }

            for (label, entries) in [
                ("cost", &definition.cost),
                ("requirement", &definition.requirements),
            ] {
                for entry in entries {
                    if !self.contains(entry.producible) {
                        errors.push(format!(
                            "Producible '{}' has {} on unknown producible {}",
                            definition.name, label, entry.producible
                        ));
                    }
                    if entry.producible == definition.id {
                        errors.push(format!(
                            "Producible '{}' lists itself as a {}",
                            definition.name, label
                        ));
                    }
                    if entry.quantity <= Fixed::ZERO {
                        errors.push(format!(
                            "Producible '{}' has non-positive {} quantity for {}",
                            definition.name, label, entry.producible
                        ));
                    }
                }
            }
        }

        errors
    }
}
