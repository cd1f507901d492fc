//! Per-actor resource ledger.
//!
//! Tracks current and maximum quantities for every producible an actor
//! holds. Storage caps are enforced whenever a quantity is added; anything
//! that does not fit is handed back to the caller as a remainder.
//!
//! All calculations use fixed-point math for deterministic simulation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{ProducibleId, ProducibleQuantity};
use crate::math::{non_negative, Fixed};

/// How storage caps are shared between producible types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CapacityMode {
    /// Each type has its own cap (the common cap unless overridden).
    #[default]
    PerType,
    /// All capped types draw from one aggregate cap; overrides are ignored.
    SharedPool,
}

/// Notifications generated by ledger mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A quantity changed.
    ResourceUpdated {
        /// The producible whose quantity changed.
        producible: ProducibleId,
        /// The new quantity.
        quantity: Fixed,
    },
    /// A quantity reached its cap.
    ResourceFull {
        /// The producible that is full.
        producible: ProducibleId,
    },
    /// A cap changed.
    MaxResourceUpdated {
        /// The affected producible, or `None` when the common cap changed.
        producible: Option<ProducibleId>,
    },
}

/// Current and maximum quantities for one economic actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLedger {
    quantities: BTreeMap<ProducibleId, Fixed>,
    mode: CapacityMode,
    common_max: Fixed,
    max_overrides: BTreeMap<ProducibleId, Fixed>,
    uncapped: BTreeSet<ProducibleId>,
    unlimited: bool,
    events: Vec<LedgerEvent>,
}

impl Default for ResourceLedger {
    fn default() -> Self {
        Self::new(CapacityMode::PerType, Self::DEFAULT_COMMON_MAX)
    }
}

impl ResourceLedger {
    /// Default common storage cap.
    pub const DEFAULT_COMMON_MAX: Fixed = Fixed::from_bits(1000 << 32);

    /// Create an empty ledger.
    #[must_use]
    pub fn new(mode: CapacityMode, common_max: Fixed) -> Self {
        Self {
            quantities: BTreeMap::new(),
            mode,
            common_max: non_negative(common_max),
            max_overrides: BTreeMap::new(),
            uncapped: BTreeSet::new(),
            unlimited: false,
            events: Vec::new(),
        }
    }

    /// Create a ledger in which nothing is capped.
    #[must_use]
    pub fn unlimited() -> Self {
        let mut ledger = Self::default();
        ledger.unlimited = true;
        ledger
    }

    /// The capacity mode.
    #[must_use]
    pub const fn mode(&self) -> CapacityMode {
        self.mode
    }

    /// The common cap (per-type default, or the shared pool size).
    #[must_use]
    pub const fn common_max_quantity(&self) -> Fixed {
        self.common_max
    }

    /// Whether every type is uncapped.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    /// Current quantity; zero for types never seen.
    #[must_use]
    pub fn quantity(&self, producible: ProducibleId) -> Fixed {
        self.quantities
            .get(&producible)
            .copied()
            .unwrap_or(Fixed::ZERO)
    }

    /// Whether storage caps apply to this type.
    #[must_use]
    pub fn is_capped(&self, producible: ProducibleId) -> bool {
        !self.unlimited && !self.uncapped.contains(&producible)
    }

    /// Effective cap for a type, or `None` when it is unlimited.
    ///
    /// Resolution order: global unlimited flag, per-type unlimited flag,
    /// then the shared pool (common cap minus everything else capped) or the
    /// per-type override falling back to the common cap.
    #[must_use]
    pub fn max_quantity(&self, producible: ProducibleId) -> Option<Fixed> {
        if !self.is_capped(producible) {
            return None;
        }

        match self.mode {
            CapacityMode::SharedPool => {
                let others = self
                    .quantities
                    .iter()
                    .filter(|(id, _)| **id != producible && self.is_capped(**id))
                    .fold(Fixed::ZERO, |sum, (_, q)| sum.saturating_add(non_negative(*q)));
                Some(non_negative(self.common_max.saturating_sub(others)))
            }
            CapacityMode::PerType => Some(
                self.max_overrides
                    .get(&producible)
                    .copied()
                    .unwrap_or(self.common_max),
            ),
        }
    }

    /// Remaining storage for a type, or `None` when it is unlimited.
    #[must_use]
    pub fn free_capacity(&self, producible: ProducibleId) -> Option<Fixed> {
        self.max_quantity(producible)
            .map(|cap| non_negative(cap.saturating_sub(non_negative(self.quantity(producible)))))
    }

    /// Whether a capped type has reached its cap.
    #[must_use]
    pub fn is_maxed_out(&self, producible: ProducibleId) -> bool {
        self.max_quantity(producible)
            .is_some_and(|cap| non_negative(self.quantity(producible)) >= cap)
    }

    /// Check if at least `amount` is held. Negative holdings count as zero.
    #[must_use]
    pub fn has_enough(&self, producible: ProducibleId, amount: Fixed) -> bool {
        non_negative(self.quantity(producible)) >= amount
    }

    /// Check a whole list; repeated types are summed before checking.
    #[must_use]
    pub fn has_enough_many(&self, quantities: &[ProducibleQuantity]) -> bool {
        self.shortfalls(quantities).is_empty()
    }

    /// Entries of `quantities` that are not covered, with the missing amount.
    ///
    /// Repeated types are summed first; results are in id order.
    #[must_use]
    pub fn shortfalls(&self, quantities: &[ProducibleQuantity]) -> Vec<ProducibleQuantity> {
        let mut totals: BTreeMap<ProducibleId, Fixed> = BTreeMap::new();
        for entry in quantities {
            let total = totals.entry(entry.producible).or_insert(Fixed::ZERO);
            *total = total.saturating_add(entry.quantity);
        }

        totals
            .into_iter()
            .filter_map(|(producible, needed)| {
                let held = non_negative(self.quantity(producible));
                (held < needed).then(|| ProducibleQuantity::new(producible, needed - held))
            })
            .collect()
    }

    /// Add up to the effective cap.
    ///
    /// Returns the amount that did not fit (zero if fully absorbed).
    /// Non-positive amounts are ignored.
    pub fn add_quantity(&mut self, producible: ProducibleId, amount: Fixed) -> Fixed {
        if amount <= Fixed::ZERO {
            return Fixed::ZERO;
        }

        let current = self.quantity(producible);
        let cap = self.max_quantity(producible);
        let accepted = match cap {
            Some(cap) => amount.min(non_negative(cap.saturating_sub(non_negative(current)))),
            None => amount,
        };

        let entry = self.quantities.entry(producible).or_insert(Fixed::ZERO);
        if accepted > Fixed::ZERO {
            *entry = current.saturating_add(accepted);
            self.events.push(LedgerEvent::ResourceUpdated {
                producible,
                quantity: *entry,
            });
        }

        if let Some(cap) = cap {
            if non_negative(*entry) >= cap {
                tracing::debug!(%producible, cap = %cap, "Storage full");
                self.events.push(LedgerEvent::ResourceFull { producible });
            }
        }

        amount - accepted
    }

    /// Apply [`add_quantity`](Self::add_quantity) to every entry.
    ///
    /// Returns only the entries that did not fully fit, paired with their
    /// index in `quantities`, with the quantity replaced by the remainder.
    pub fn add_many_quantities(
        &mut self,
        quantities: &[ProducibleQuantity],
    ) -> Vec<(usize, ProducibleQuantity)> {
        quantities
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let remainder = self.add_quantity(entry.producible, entry.quantity);
                (remainder > Fixed::ZERO)
                    .then(|| (index, ProducibleQuantity::new(entry.producible, remainder)))
            })
            .collect()
    }

    /// Remove `amount` if it is held.
    ///
    /// Returns `false` without mutating anything when there is not enough.
    pub fn consume_quantity(&mut self, producible: ProducibleId, amount: Fixed) -> bool {
        if amount < Fixed::ZERO || !self.has_enough(producible, amount) {
            return false;
        }
        if amount == Fixed::ZERO {
            return true;
        }

        let entry = self.quantities.entry(producible).or_insert(Fixed::ZERO);
        *entry -= amount;
        self.events.push(LedgerEvent::ResourceUpdated {
            producible,
            quantity: *entry,
        });
        true
    }

    /// Consume every entry, or none of them.
    pub fn consume_many(&mut self, quantities: &[ProducibleQuantity]) -> bool {
        if quantities.iter().any(|q| q.quantity < Fixed::ZERO) || !self.has_enough_many(quantities)
        {
            return false;
        }
        for entry in quantities {
            self.consume_quantity(entry.producible, entry.quantity);
        }
        true
    }

    /// Overwrite a quantity, bypassing caps.
    ///
    /// May be negative; negative holdings behave as zero in every comparison.
    pub fn set_quantity(&mut self, producible: ProducibleId, quantity: Fixed) {
        self.quantities.insert(producible, quantity);
        self.events.push(LedgerEvent::ResourceUpdated {
            producible,
            quantity,
        });
    }

    /// Set the per-type cap override (ignored in shared-pool mode).
    pub fn set_max_quantity(&mut self, producible: ProducibleId, max: Fixed) {
        self.max_overrides.insert(producible, non_negative(max));
        self.events.push(LedgerEvent::MaxResourceUpdated {
            producible: Some(producible),
        });
    }

    /// Shift the per-type cap by `delta`, flooring at zero.
    pub fn modify_max_quantity(&mut self, producible: ProducibleId, delta: Fixed) {
        let base = self
            .max_overrides
            .get(&producible)
            .copied()
            .unwrap_or(self.common_max);
        self.set_max_quantity(producible, base.saturating_add(delta));
    }

    /// Set the common cap.
    pub fn set_common_max_quantity(&mut self, max: Fixed) {
        self.common_max = non_negative(max);
        self.events
            .push(LedgerEvent::MaxResourceUpdated { producible: None });
    }

    /// Shift the common cap by `delta`, flooring at zero.
    pub fn modify_common_max_quantity(&mut self, delta: Fixed) {
        self.set_common_max_quantity(self.common_max.saturating_add(delta));
    }

    /// Mark a type as uncapped (or capped again).
    pub fn set_unlimited(&mut self, producible: ProducibleId, unlimited: bool) {
        let changed = if unlimited {
            self.uncapped.insert(producible)
        } else {
            self.uncapped.remove(&producible)
        };
        if changed {
            self.events.push(LedgerEvent::MaxResourceUpdated {
                producible: Some(producible),
            });
        }
    }

    /// Toggle the global unlimited flag.
    pub fn set_all_unlimited(&mut self, unlimited: bool) {
        if self.unlimited != unlimited {
            self.unlimited = unlimited;
            self.events
                .push(LedgerEvent::MaxResourceUpdated { producible: None });
        }
    }

    /// All tracked quantities in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ProducibleId, Fixed)> + '_ {
        self.quantities.iter().map(|(id, q)| (*id, *q))
    }

    /// Take all pending notifications.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }
}
