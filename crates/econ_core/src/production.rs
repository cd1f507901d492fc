//! Production queues.
//!
//! A queue holds the pending orders of one producer. The first order is in
//! progress and accrues time; when a time delta would take it past zero
//! remaining, the completion gate is consulted. An accepted completion pops
//! the order and the leftover time carries into the next one, so a single
//! large delta can finish several orders in FIFO order.
//!
//! All calculations use fixed-point math for deterministic simulation.

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use thiserror::Error;

use crate::catalog::{ProducibleId, ProducibleQuantity};
use crate::math::{non_negative, Fixed};

/// Unique identifier for an owned unit or structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub u64);

impl UnitId {
    /// Create a new unit ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit:{}", self.0)
    }
}

/// Producers are owned units that carry a production queue.
pub type ProducerId = UnitId;

/// Handle for a spawn requested from the host and not yet resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpawnTicket(pub u64);

impl std::fmt::Display for SpawnTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spawn:{}", self.0)
    }
}

/// A pending order in a production queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductionOrder {
    /// What is being produced.
    pub producible: ProducibleId,
    /// How much one completion yields.
    pub quantity: Fixed,
    /// Time needed to complete this order.
    pub duration: Fixed,
}

impl ProductionOrder {
    /// Create a new order.
    #[must_use]
    pub const fn new(producible: ProducibleId, quantity: Fixed, duration: Fixed) -> Self {
        Self {
            producible,
            quantity,
            duration,
        }
    }

    /// The order's yield as a producible quantity.
    #[must_use]
    pub const fn as_quantity(&self) -> ProducibleQuantity {
        ProducibleQuantity::new(self.producible, self.quantity)
    }
}

/// Receiver for the outcome of [`ProductionQueue::produce`].
///
/// `should_finish` is the completion gate: it is asked once per would-be
/// completion and may veto it. `production_finished` runs synchronously for
/// each accepted completion before the next one is considered, so state it
/// changes is visible to the following gate check.
pub trait ProductionSink {
    /// Whether the head order may complete now. Defaults to always.
    fn should_finish(&mut self, _order: &ProductionOrder) -> bool {
        true
    }

    /// Called for each completed order, in queue order.
    fn production_finished(&mut self, order: ProductionOrder);
}

/// Collects completions with no gate.
impl ProductionSink for Vec<ProductionOrder> {
    fn production_finished(&mut self, order: ProductionOrder) {
        self.push(order);
    }
}

/// Errors that can occur during production operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductionError {
    /// The production queue is full.
    #[error("Production queue is full")]
    QueueFull,
    /// Cannot afford the cost.
    #[error("Insufficient resources: missing {0:?}")]
    InsufficientResources(Vec<ProducibleQuantity>),
    /// Required producibles are not held.
    #[error("Requirements not met: missing {0:?}")]
    UnmetRequirement(Vec<ProducibleQuantity>),
    /// The producer is not registered.
    #[error("Unknown producer: {0}")]
    UnknownProducer(ProducerId),
    /// The producible is not in the catalog.
    #[error("Unknown producible: {0}")]
    UnknownProducible(ProducibleId),
    /// The requested quantity is not positive.
    #[error("Quantity must be positive")]
    InvalidQuantity,
}

/// Events generated by production and its consequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductionEvent {
    /// Cost was paid and orders were queued.
    ProductionStarted {
        /// The producer that queued the orders.
        producer: ProducerId,
        /// What was queued.
        producible: ProducibleId,
        /// Total quantity queued.
        quantity: Fixed,
    },
    /// An order completed.
    ProductionFinished {
        /// The producer that completed it.
        producer: ProducerId,
        /// The completed order.
        order: ProductionOrder,
    },
    /// An order was cancelled and its cost refunded.
    ProductionCancelled {
        /// The producer whose order was cancelled.
        producer: ProducerId,
        /// The cancelled order.
        order: ProductionOrder,
        /// Refund that did not fit in storage.
        refund_overflow: Vec<ProducibleQuantity>,
    },
    /// A completed unit or structure needs to be spawned by the host.
    SpawnRequested {
        /// Ticket to resolve with `complete_spawn` or `fail_spawn`.
        ticket: SpawnTicket,
        /// The producer that completed it, `None` for direct grants.
        producer: Option<ProducerId>,
        /// What to spawn.
        producible: ProducibleId,
    },
    /// The host spawned a requested entity and it is now owned.
    SpawnCompleted {
        /// The resolved ticket.
        ticket: SpawnTicket,
        /// The new unit.
        unit: UnitId,
        /// What was spawned.
        producible: ProducibleId,
    },
    /// A requested spawn was abandoned and its cost refunded.
    SpawnFailed {
        /// The abandoned ticket.
        ticket: SpawnTicket,
        /// What was not spawned.
        producible: ProducibleId,
        /// Refund that did not fit in storage.
        refund_overflow: Vec<ProducibleQuantity>,
    },
    /// A research order completed.
    ResearchCompleted {
        /// The producer that researched it, `None` for direct grants.
        producer: Option<ProducerId>,
        /// The research.
        producible: ProducibleId,
    },
    /// A completed resource order did not fully fit in storage.
    ResourceOverflow {
        /// The producer that completed it, `None` for direct grants.
        producer: Option<ProducerId>,
        /// The part that did not fit.
        remainder: ProducibleQuantity,
    },
}

/// Ordered queue of pending orders for one producer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductionQueue {
    orders: VecDeque<ProductionOrder>,
    remaining: Option<Fixed>,
    progress: Option<Fixed>,
    max_len: Option<usize>,
}

impl ProductionQueue {
    /// Create a new empty, unbounded production queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a production queue holding at most `max_len` orders.
    #[must_use]
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            max_len: Some(max_len),
            ..Self::default()
        }
    }

    /// Check if the queue is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.max_len.is_some_and(|max| self.orders.len() >= max)
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Get the number of orders in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// The order currently in progress.
    #[must_use]
    pub fn head(&self) -> Option<&ProductionOrder> {
        self.orders.front()
    }

    /// All orders, head first.
    pub fn orders(&self) -> impl Iterator<Item = &ProductionOrder> {
        self.orders.iter()
    }

    /// Progress of the head in `[0, 1]`, or `None` when the queue is empty.
    #[must_use]
    pub const fn progress(&self) -> Option<Fixed> {
        self.progress
    }

    /// Time left on the head, or `None` when the queue is empty.
    #[must_use]
    pub const fn remaining(&self) -> Option<Fixed> {
        self.remaining
    }

    /// Check if any queued order (not just the head) is for `producible`.
    #[must_use]
    pub fn is_in_progress(&self, producible: ProducibleId) -> bool {
        self.orders.iter().any(|o| o.producible == producible)
    }

    /// Queue `quantity` of `producible`.
    ///
    /// With `split_into_unit_orders` the quantity becomes one order per whole
    /// unit plus one for any fractional tail (2.5 → 1, 1, 0.5). Non-positive
    /// quantities are ignored.
    ///
    /// Returns `Err` if the new orders would not fit in a bounded queue; in
    /// that case nothing is queued.
    pub fn add_order(
        &mut self,
        producible: ProducibleId,
        duration: Fixed,
        quantity: Fixed,
        split_into_unit_orders: bool,
    ) -> Result<(), ProductionError> {
        if quantity <= Fixed::ZERO {
            return Ok(());
        }

        let duration = non_negative(duration);
        let mut new_orders = Vec::new();
        if split_into_unit_orders {
            let whole = quantity.int().to_num::<usize>();
            new_orders.extend(
                std::iter::repeat(ProductionOrder::new(producible, Fixed::ONE, duration))
                    .take(whole),
            );
            let fraction = quantity.frac();
            if fraction > Fixed::ZERO {
                new_orders.push(ProductionOrder::new(producible, fraction, duration));
            }
        } else {
            new_orders.push(ProductionOrder::new(producible, quantity, duration));
        }

        if let Some(max) = self.max_len {
            if self.orders.len() + new_orders.len() > max {
                return Err(ProductionError::QueueFull);
            }
        }

        let was_empty = self.orders.is_empty();
        self.orders.extend(new_orders);
        if was_empty {
            self.start_head();
        }
        Ok(())
    }

    /// Cancel the first order for `producible`.
    ///
    /// Returns the cancelled order if found.
    pub fn cancel_order(&mut self, producible: ProducibleId) -> Option<ProductionOrder> {
        let index = self
            .orders
            .iter()
            .position(|o| o.producible == producible)?;
        self.cancel_order_at(index)
    }

    /// Cancel the order at `index` (0 is the head).
    ///
    /// Returns the cancelled order if the index was in range.
    pub fn cancel_order_at(&mut self, index: usize) -> Option<ProductionOrder> {
        let order = self.orders.remove(index)?;
        if index == 0 {
            self.start_head();
        }
        Some(order)
    }

    /// Remove every order, returning them head first.
    ///
    /// Costs are not refunded here; the queue knows nothing about them.
    pub fn cancel_all(&mut self) -> Vec<ProductionOrder> {
        self.remaining = None;
        self.progress = None;
        self.orders.drain(..).collect()
    }

    /// Advance production by `delta` time units.
    ///
    /// Each time the head would complete, `sink.should_finish` is consulted.
    /// A veto puts the remaining time back to what it was before this step
    /// and stops; an acceptance pops the head, reports it through
    /// `sink.production_finished`, starts the next order and applies the
    /// leftover time to it. Negative deltas count as zero.
    ///
    /// Returns the number of orders completed.
    pub fn produce<S: ProductionSink + ?Sized>(&mut self, delta: Fixed, sink: &mut S) -> usize {
        let mut delta = non_negative(delta);
        let mut completed = 0;

        loop {
            let Some(head) = self.orders.front().copied() else {
                self.remaining = None;
                self.progress = None;
                return completed;
            };

            let before = self.remaining.unwrap_or(head.duration);
            let after = before.saturating_sub(delta);
            if after >= Fixed::ZERO {
                self.remaining = Some(after);
                self.progress = Some(progress_of(after, head.duration));
                return completed;
            }

            if !sink.should_finish(&head) {
                tracing::trace!(producible = %head.producible, "Completion held by gate");
                self.remaining = Some(before);
                return completed;
            }

            self.orders.pop_front();
            sink.production_finished(head);
            completed += 1;
            self.start_head();
            delta = after.saturating_neg();
        }
    }

    /// Feed the queue's state into a hasher.
    pub fn hash_state<H: Hasher>(&self, state: &mut H) {
        self.orders.len().hash(state);
        for order in &self.orders {
            order.hash(state);
        }
        self.remaining.hash(state);
        self.progress.hash(state);
    }

    fn start_head(&mut self) {
        match self.orders.front() {
            Some(head) => {
                self.remaining = Some(head.duration);
                self.progress = Some(Fixed::ZERO);
            }
            None => {
                self.remaining = None;
                self.progress = None;
            }
        }
    }
}

/// Fraction of `duration` already spent when `remaining` is left.
fn progress_of(remaining: Fixed, duration: Fixed) -> Fixed {
    if duration <= Fixed::ZERO {
        return Fixed::ONE;
    }
    (Fixed::ONE - remaining / duration).clamp(Fixed::ZERO, Fixed::ONE)
}
