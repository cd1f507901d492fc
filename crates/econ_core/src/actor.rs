//! Economic actor: the economy of one player or AI.
//!
//! Owns a resource ledger, a population gate, the production queues of its
//! producers and the units it has spawned. Driving the actor with
//! [`EconomicActor::tick`] advances every queue; completed orders are gated
//! by population, requirements and storage, then routed by kind:
//!
//! - resources and research go straight into the ledger,
//! - units and structures become spawn requests that the host resolves with
//!   [`EconomicActor::complete_spawn`] or [`EconomicActor::fail_spawn`].
//!
//! Every change is reported through a single ordered event log.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::Span;

use crate::catalog::{
    Catalog, ProducibleDefinition, ProducibleId, ProducibleKind, ProducibleQuantity,
};
use crate::config::EconomyConfig;
use crate::error::{EconomyError, Result};
use crate::events::EconomyEvent;
use crate::ledger::ResourceLedger;
use crate::math::{non_negative, Fixed};
use crate::population::PopulationGate;
use crate::production::{
    ProducerId, ProductionError, ProductionEvent, ProductionOrder, ProductionQueue,
    ProductionSink, SpawnTicket, UnitId,
};

/// A completed unit or structure waiting for the host to spawn it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingSpawn {
    /// The producer that completed it, `None` for direct grants.
    pub producer: Option<ProducerId>,
    /// The completed order.
    pub order: ProductionOrder,
}

/// Ledger, population and spawn bookkeeping, split from the producer map so
/// a queue can be driven while its completions mutate everything else.
#[derive(Debug)]
struct Holdings {
    ledger: ResourceLedger,
    population: PopulationGate,
    pending_spawns: BTreeMap<SpawnTicket, PendingSpawn>,
    next_ticket: u64,
    events: Vec<EconomyEvent>,
}

impl Holdings {
    /// Move component events into the unified log.
    fn flush(&mut self) {
        self.events
            .extend(self.ledger.drain_events().into_iter().map(EconomyEvent::from));
        self.events.extend(
            self.population
                .drain_events()
                .into_iter()
                .map(EconomyEvent::from),
        );
    }

    fn emit(&mut self, event: ProductionEvent) {
        self.flush();
        self.events.push(event.into());
    }

    /// Hand over a completed order according to its kind.
    ///
    /// Returns the part of a resource that did not fit in storage.
    fn deliver(
        &mut self,
        definition: &ProducibleDefinition,
        order: ProductionOrder,
        producer: Option<ProducerId>,
    ) -> Fixed {
        let producible = definition.id;
        match definition.kind {
            ProducibleKind::Resource => {
                let remainder = self.ledger.add_quantity(producible, order.quantity);
                self.flush();
                self.population
                    .on_producible_granted(definition, order.quantity - remainder);
                if remainder > Fixed::ZERO {
                    tracing::warn!(%producible, %remainder, "Storage full, output lost");
                    self.emit(ProductionEvent::ResourceOverflow {
                        producer,
                        remainder: ProducibleQuantity::new(producible, remainder),
                    });
                }
                remainder
            }
            ProducibleKind::Unit | ProducibleKind::Structure => {
                // Population is reserved now so queued orders see it
                self.population
                    .on_producible_granted(definition, order.quantity);
                let ticket = SpawnTicket(self.next_ticket);
                self.next_ticket += 1;
                self.pending_spawns
                    .insert(ticket, PendingSpawn { producer, order });
                tracing::debug!(%ticket, %producible, "Spawn requested");
                self.emit(ProductionEvent::SpawnRequested {
                    ticket,
                    producer,
                    producible,
                });
                Fixed::ZERO
            }
            ProducibleKind::Research => {
                let remainder = self.ledger.add_quantity(producible, order.quantity);
                self.flush();
                self.population
                    .on_producible_granted(definition, order.quantity - remainder);
                tracing::info!(%producible, "Research completed");
                self.emit(ProductionEvent::ResearchCompleted {
                    producer,
                    producible,
                });
                remainder
            }
        }
    }

    /// Return the cost of `order` to the ledger.
    ///
    /// Returns whatever did not fit.
    fn refund(&mut self, catalog: &Catalog, order: &ProductionOrder) -> Vec<ProducibleQuantity> {
        let Some(definition) = catalog.get(order.producible) else {
            return Vec::new();
        };
        let overflow: Vec<ProducibleQuantity> = self
            .ledger
            .add_many_quantities(&definition.cost_for(order.quantity))
            .into_iter()
            .map(|(_, lost)| lost)
            .collect();
        if !overflow.is_empty() {
            tracing::warn!(
                producible = %order.producible,
                lost = ?overflow,
                "Refund exceeded storage"
            );
        }
        overflow
    }

    fn cancel_order(&mut self, catalog: &Catalog, producer: ProducerId, order: ProductionOrder) {
        let refund_overflow = self.refund(catalog, &order);
        tracing::debug!(%producer, producible = %order.producible, "Production cancelled");
        self.emit(ProductionEvent::ProductionCancelled {
            producer,
            order,
            refund_overflow,
        });
    }

    /// Undo a spawn that will never happen: release its population and,
    /// if it was paid for, refund the cost.
    fn abandon_spawn(
        &mut self,
        catalog: &Catalog,
        ticket: SpawnTicket,
        pending: PendingSpawn,
    ) -> Vec<ProducibleQuantity> {
        let order = pending.order;
        if let Some(definition) = catalog.get(order.producible) {
            self.population
                .on_producible_revoked(definition, order.quantity);
        }
        let refund_overflow = if pending.producer.is_some() {
            self.refund(catalog, &order)
        } else {
            Vec::new()
        };
        tracing::debug!(%ticket, producible = %order.producible, "Spawn failed");
        self.emit(ProductionEvent::SpawnFailed {
            ticket,
            producible: order.producible,
            refund_overflow: refund_overflow.clone(),
        });
        refund_overflow
    }
}

/// Gate and completion listener for one producer's queue.
struct CompletionSink<'a> {
    producer: ProducerId,
    catalog: &'a Catalog,
    holdings: &'a mut Holdings,
}

impl ProductionSink for CompletionSink<'_> {
    fn should_finish(&mut self, order: &ProductionOrder) -> bool {
        let Some(definition) = self.catalog.get(order.producible) else {
            return true;
        };
        let producer = self.producer;
        let producible = order.producible;

        if !self
            .holdings
            .population
            .should_allow_completion(definition, order.quantity)
        {
            tracing::debug!(%producer, %producible, "Completion held: population cap");
            return false;
        }
        if !self
            .holdings
            .ledger
            .has_enough_many(&definition.requirements_for(order.quantity))
        {
            tracing::debug!(%producer, %producible, "Completion held: requirements");
            return false;
        }
        if self.holdings.ledger.is_maxed_out(producible) {
            tracing::debug!(%producer, %producible, "Completion held: storage full");
            return false;
        }
        true
    }

    fn production_finished(&mut self, order: ProductionOrder) {
        tracing::info!(
            producer = %self.producer,
            producible = %order.producible,
            quantity = %order.quantity,
            "Production finished"
        );
        self.holdings.emit(ProductionEvent::ProductionFinished {
            producer: self.producer,
            order,
        });
        if let Some(definition) = self.catalog.get(order.producible) {
            self.holdings.deliver(definition, order, Some(self.producer));
        }
    }
}

/// The complete economy of one player or AI.
#[derive(Debug)]
pub struct EconomicActor {
    catalog: Arc<Catalog>,
    holdings: Holdings,
    producers: BTreeMap<ProducerId, ProductionQueue>,
    units: BTreeMap<UnitId, ProducibleQuantity>,
    queue_limit: Option<usize>,
    span: Span,
}

impl EconomicActor {
    /// Create an actor from a catalog and config.
    ///
    /// The config's starting resources are granted immediately; their
    /// events are left in the log.
    pub fn new(catalog: Arc<Catalog>, config: &EconomyConfig) -> Result<Self> {
        config.ensure_valid(&catalog)?;

        let mut actor = Self {
            holdings: Holdings {
                ledger: config.build_ledger(&catalog),
                population: PopulationGate::new(&config.population),
                pending_spawns: BTreeMap::new(),
                next_ticket: 0,
                events: Vec::new(),
            },
            catalog,
            producers: BTreeMap::new(),
            units: BTreeMap::new(),
            queue_limit: config.producer_queue_limit,
            span: tracing::info_span!("economic_actor"),
        };

        for entry in &config.starting_resources {
            actor.grant(entry.producible, entry.quantity)?;
        }
        Ok(actor)
    }

    /// Replace the span all of this actor's logging is recorded under.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The catalog this actor produces from.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The resource ledger.
    #[must_use]
    pub const fn ledger(&self) -> &ResourceLedger {
        &self.holdings.ledger
    }

    /// Mutable access to the ledger, for cap changes made by the host.
    ///
    /// Events produced through it appear in the next [`drain_events`](Self::drain_events).
    pub fn ledger_mut(&mut self) -> &mut ResourceLedger {
        &mut self.holdings.ledger
    }

    /// The population gate.
    #[must_use]
    pub const fn population(&self) -> &PopulationGate {
        &self.holdings.population
    }

    /// A producer's queue.
    #[must_use]
    pub fn producer(&self, producer: ProducerId) -> Option<&ProductionQueue> {
        self.producers.get(&producer)
    }

    /// All registered producers in id order.
    pub fn producers(&self) -> impl Iterator<Item = ProducerId> + '_ {
        self.producers.keys().copied()
    }

    /// Whether this actor owns `unit`.
    #[must_use]
    pub fn owns_unit(&self, unit: UnitId) -> bool {
        self.units.contains_key(&unit)
    }

    /// All owned units with what they are, in id order.
    pub fn units(&self) -> impl Iterator<Item = (UnitId, ProducibleId)> + '_ {
        self.units.iter().map(|(id, held)| (*id, held.producible))
    }

    /// A spawn waiting for the host.
    #[must_use]
    pub fn pending_spawn(&self, ticket: SpawnTicket) -> Option<&PendingSpawn> {
        self.holdings.pending_spawns.get(&ticket)
    }

    /// All spawns waiting for the host, in ticket order.
    pub fn pending_spawns(&self) -> impl Iterator<Item = (SpawnTicket, &PendingSpawn)> {
        self.holdings.pending_spawns.iter().map(|(t, p)| (*t, p))
    }

    /// Register a producer with an empty queue.
    pub fn add_producer(&mut self, producer: ProducerId) -> Result<()> {
        if self.producers.contains_key(&producer) {
            return Err(EconomyError::DuplicateProducer(producer));
        }
        let queue = self
            .queue_limit
            .map_or_else(ProductionQueue::new, ProductionQueue::with_max_len);
        self.producers.insert(producer, queue);
        Ok(())
    }

    /// Unregister a producer, refunding its queued orders and abandoning
    /// the spawns it requested.
    ///
    /// Returns the cancelled orders.
    pub fn remove_producer(&mut self, producer: ProducerId) -> Result<Vec<ProductionOrder>> {
        let span = self.span.clone();
        let _enter = span.enter();

        let mut queue = self
            .producers
            .remove(&producer)
            .ok_or(EconomyError::UnknownProducer(producer))?;

        let cancelled = queue.cancel_all();
        for order in &cancelled {
            self.holdings.cancel_order(&self.catalog, producer, *order);
        }

        let tickets: Vec<SpawnTicket> = self
            .holdings
            .pending_spawns
            .iter()
            .filter(|(_, pending)| pending.producer == Some(producer))
            .map(|(ticket, _)| *ticket)
            .collect();
        for ticket in tickets {
            if let Some(pending) = self.holdings.pending_spawns.remove(&ticket) {
                self.holdings.abandon_spawn(&self.catalog, ticket, pending);
            }
        }

        tracing::debug!(%producer, cancelled = cancelled.len(), "Producer removed");
        Ok(cancelled)
    }

    /// Give up ownership of a unit.
    ///
    /// Cancels its production if it is a producer, lowers its ledger count
    /// and releases its population.
    pub fn remove_unit(&mut self, unit: UnitId) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        let Some(held) = self.units.remove(&unit) else {
            tracing::error!(%unit, "Attempted to remove a unit this actor does not own");
            return Err(EconomyError::UnitNotOwned(unit));
        };

        if self.producers.contains_key(&unit) {
            self.remove_producer(unit)?;
        }

        let ledger = &mut self.holdings.ledger;
        let remaining = ledger.quantity(held.producible).saturating_sub(held.quantity);
        ledger.set_quantity(held.producible, non_negative(remaining));
        if let Some(definition) = self.catalog.get(held.producible) {
            self.holdings
                .population
                .on_producible_revoked(definition, held.quantity);
        }
        self.holdings.flush();
        Ok(())
    }

    /// Give the actor `quantity` of a producible without paying for it.
    ///
    /// Routed exactly like a completion. Units and structures become spawn
    /// requests with no producer. Returns the part that did not fit in
    /// storage.
    pub fn grant(&mut self, producible: ProducibleId, quantity: Fixed) -> Result<Fixed> {
        let span = self.span.clone();
        let _enter = span.enter();

        let definition = self.catalog.require(producible)?;
        if quantity <= Fixed::ZERO {
            return Ok(Fixed::ZERO);
        }
        let order = ProductionOrder::new(producible, quantity, definition.production_duration);
        Ok(self.holdings.deliver(definition, order, None))
    }

    /// Pay for and queue `quantity` of a producible on a producer.
    ///
    /// Units and structures are queued one per order. Nothing is changed
    /// when an error is returned.
    pub fn start_production(
        &mut self,
        producer: ProducerId,
        producible: ProducibleId,
        quantity: Fixed,
    ) -> std::result::Result<(), ProductionError> {
        let span = self.span.clone();
        let _enter = span.enter();

        if quantity <= Fixed::ZERO {
            return Err(ProductionError::InvalidQuantity);
        }
        let definition = self
            .catalog
            .get(producible)
            .ok_or(ProductionError::UnknownProducible(producible))?;
        let queue = self
            .producers
            .get_mut(&producer)
            .ok_or(ProductionError::UnknownProducer(producer))?;

        let split = definition.kind.splits_into_unit_orders();
        let per_order = if split {
            quantity.min(Fixed::ONE)
        } else {
            quantity
        };
        let unmet = self
            .holdings
            .ledger
            .shortfalls(&definition.requirements_for(per_order));
        if !unmet.is_empty() {
            tracing::debug!(%producer, %producible, ?unmet, "Production refused: requirements");
            return Err(ProductionError::UnmetRequirement(unmet));
        }

        let cost = definition.cost_for(quantity);
        let missing = self.holdings.ledger.shortfalls(&cost);
        if !missing.is_empty() {
            tracing::debug!(%producer, %producible, ?missing, "Production refused: cost");
            return Err(ProductionError::InsufficientResources(missing));
        }

        queue.add_order(producible, definition.production_duration, quantity, split)?;
        let paid = self.holdings.ledger.consume_many(&cost);
        debug_assert!(paid, "shortfalls were checked before paying");

        tracing::debug!(%producer, %producible, quantity = %quantity, "Production started");
        self.holdings.emit(ProductionEvent::ProductionStarted {
            producer,
            producible,
            quantity,
        });
        Ok(())
    }

    /// Cancel every order on a producer, refunding their full cost.
    ///
    /// Returns the cancelled orders.
    pub fn cancel_producer_orders(&mut self, producer: ProducerId) -> Result<Vec<ProductionOrder>> {
        let span = self.span.clone();
        let _enter = span.enter();

        let queue = self
            .producers
            .get_mut(&producer)
            .ok_or(EconomyError::UnknownProducer(producer))?;
        let cancelled = queue.cancel_all();
        for order in &cancelled {
            self.holdings.cancel_order(&self.catalog, producer, *order);
        }
        Ok(cancelled)
    }

    /// Cancel the order at `index` on a producer, refunding its cost.
    ///
    /// Returns `None` if the index is out of range.
    pub fn cancel_producer_order(
        &mut self,
        producer: ProducerId,
        index: usize,
    ) -> Result<Option<ProductionOrder>> {
        let span = self.span.clone();
        let _enter = span.enter();

        let queue = self
            .producers
            .get_mut(&producer)
            .ok_or(EconomyError::UnknownProducer(producer))?;
        let cancelled = queue.cancel_order_at(index);
        if let Some(order) = cancelled {
            self.holdings.cancel_order(&self.catalog, producer, order);
        }
        Ok(cancelled)
    }

    /// Resolve a spawn request: the host created `unit`.
    ///
    /// The unit becomes owned and counts toward the ledger, so it can
    /// satisfy requirements. A `unit` id that is already owned is rejected
    /// and the ticket stays pending.
    pub fn complete_spawn(&mut self, ticket: SpawnTicket, unit: UnitId) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        if !self.holdings.pending_spawns.contains_key(&ticket) {
            return Err(EconomyError::UnknownSpawnTicket(ticket));
        }
        if self.units.contains_key(&unit) {
            tracing::error!(%ticket, %unit, "Attempted to spawn into a unit id already owned");
            return Err(EconomyError::UnitAlreadyOwned(unit));
        }
        let Some(pending) = self.holdings.pending_spawns.remove(&ticket) else {
            return Err(EconomyError::UnknownSpawnTicket(ticket));
        };
        let order = pending.order;

        self.units.insert(unit, order.as_quantity());
        let remainder = self
            .holdings
            .ledger
            .add_quantity(order.producible, order.quantity);

        tracing::debug!(%ticket, %unit, producible = %order.producible, "Spawn completed");
        self.holdings.emit(ProductionEvent::SpawnCompleted {
            ticket,
            unit,
            producible: order.producible,
        });
        // Only reachable when the host has capped a unit type again
        if remainder > Fixed::ZERO {
            tracing::warn!(
                %unit,
                producible = %order.producible,
                %remainder,
                "Unit count over cap"
            );
            self.holdings.emit(ProductionEvent::ResourceOverflow {
                producer: pending.producer,
                remainder: ProducibleQuantity::new(order.producible, remainder),
            });
        }
        Ok(())
    }

    /// Resolve a spawn request: the host could not create it.
    ///
    /// Releases the reserved population and refunds the cost. Returns the
    /// part of the refund that did not fit in storage.
    pub fn fail_spawn(&mut self, ticket: SpawnTicket) -> Result<Vec<ProducibleQuantity>> {
        let span = self.span.clone();
        let _enter = span.enter();

        let pending = self
            .holdings
            .pending_spawns
            .remove(&ticket)
            .ok_or(EconomyError::UnknownSpawnTicket(ticket))?;
        Ok(self.holdings.abandon_spawn(&self.catalog, ticket, pending))
    }

    /// Advance every producer by `delta`, in producer id order.
    ///
    /// Returns the number of orders completed.
    pub fn tick(&mut self, delta: Fixed) -> usize {
        let span = self.span.clone();
        let _enter = span.enter();

        let mut completed = 0;
        for (&producer, queue) in &mut self.producers {
            let mut sink = CompletionSink {
                producer,
                catalog: &self.catalog,
                holdings: &mut self.holdings,
            };
            completed += queue.produce(delta, &mut sink);
        }
        completed
    }

    /// Advance a single producer by `delta`.
    ///
    /// Returns the number of orders completed.
    pub fn produce(&mut self, producer: ProducerId, delta: Fixed) -> Result<usize> {
        let span = self.span.clone();
        let _enter = span.enter();

        let queue = self
            .producers
            .get_mut(&producer)
            .ok_or(EconomyError::UnknownProducer(producer))?;
        let mut sink = CompletionSink {
            producer,
            catalog: &self.catalog,
            holdings: &mut self.holdings,
        };
        Ok(queue.produce(delta, &mut sink))
    }

    /// Take all pending notifications, in emission order.
    pub fn drain_events(&mut self) -> Vec<EconomyEvent> {
        self.holdings.flush();
        std::mem::take(&mut self.holdings.events)
    }

    /// Compute a hash of the actor's state for determinism checks.
    ///
    /// Covers ledger quantities, population, queues, owned units and
    /// pending spawns, all in id order.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        for (producible, quantity) in self.holdings.ledger.iter() {
            producible.hash(&mut hasher);
            quantity.to_bits().hash(&mut hasher);
        }

        let population = &self.holdings.population;
        population.current().to_bits().hash(&mut hasher);
        population.max().map(Fixed::to_bits).hash(&mut hasher);

        for (producer, queue) in &self.producers {
            producer.hash(&mut hasher);
            queue.hash_state(&mut hasher);
        }

        for (unit, held) in &self.units {
            unit.hash(&mut hasher);
            held.hash(&mut hasher);
        }

        for (ticket, pending) in &self.holdings.pending_spawns {
            ticket.hash(&mut hasher);
            pending.hash(&mut hasher);
        }
        self.holdings.next_ticket.hash(&mut hasher);

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogData;
    use crate::config::PopulationConfig;
    use crate::ledger::LedgerEvent;
    use crate::population::PopulationEvent;

    const GOLD: ProducibleId = ProducibleId(1);
    const WOOD: ProducibleId = ProducibleId(2);
    const WORKER: ProducibleId = ProducibleId(10);
    const SOLDIER: ProducibleId = ProducibleId(11);
    const BARRACKS: ProducibleId = ProducibleId(20);
    const ARCHERY: ProducibleId = ProducibleId(30);

    const HQ: ProducerId = UnitId(100);
    const YARD: ProducerId = UnitId(101);

    fn fx(n: f64) -> Fixed {
        Fixed::from_num(n)
    }

    fn catalog() -> Arc<Catalog> {
        let producibles = vec![
            ProducibleDefinition::new(GOLD, "Gold", ProducibleKind::Resource)
                .with_duration(fx(5.0)),
            ProducibleDefinition::new(WOOD, "Wood", ProducibleKind::Resource)
                .with_duration(fx(5.0)),
            ProducibleDefinition::new(WORKER, "Worker", ProducibleKind::Unit)
                .with_duration(fx(10.0))
                .with_cost(GOLD, fx(50.0))
                .with_attribute("population", fx(1.0)),
            ProducibleDefinition::new(SOLDIER, "Soldier", ProducibleKind::Unit)
                .with_duration(fx(15.0))
                .with_cost(GOLD, fx(100.0))
                .with_requirement(BARRACKS, fx(1.0))
                .with_attribute("population", fx(2.0)),
            ProducibleDefinition::new(BARRACKS, "Barracks", ProducibleKind::Structure)
                .with_duration(fx(20.0))
                .with_cost(WOOD, fx(100.0))
                .with_attribute("housing", fx(5.0)),
            ProducibleDefinition::new(ARCHERY, "Archery", ProducibleKind::Research)
                .with_duration(fx(30.0))
                .with_cost(GOLD, fx(200.0)),
        ];
        Arc::new(Catalog::from_data(CatalogData { producibles }).unwrap())
    }

    fn config() -> EconomyConfig {
        EconomyConfig {
            starting_resources: vec![
                ProducibleQuantity::new(GOLD, fx(500.0)),
                ProducibleQuantity::new(WOOD, fx(200.0)),
            ],
            population: PopulationConfig {
                initial_max: fx(4.0),
                ..PopulationConfig::default()
            },
            ..EconomyConfig::default()
        }
    }

    fn actor() -> EconomicActor {
        let mut actor = EconomicActor::new(catalog(), &config()).unwrap();
        actor.add_producer(HQ).unwrap();
        actor.drain_events();
        actor
    }

    fn production_events(actor: &mut EconomicActor) -> Vec<ProductionEvent> {
        actor
            .drain_events()
            .into_iter()
            .filter_map(|e| e.as_production().cloned())
            .collect()
    }

    fn spawn_tickets(actor: &EconomicActor) -> Vec<SpawnTicket> {
        actor.pending_spawns().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_starting_resources() {
        let actor = actor();
        assert_eq!(actor.ledger().quantity(GOLD), fx(500.0));
        assert_eq!(actor.ledger().quantity(WOOD), fx(200.0));
        assert_eq!(actor.population().max(), Some(fx(4.0)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EconomyConfig {
            starting_resources: vec![ProducibleQuantity::new(ProducibleId(99), fx(1.0))],
            ..EconomyConfig::default()
        };
        assert!(matches!(
            EconomicActor::new(catalog(), &config),
            Err(EconomyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_start_production_pays_and_queues() {
        let mut actor = actor();
        actor.start_production(HQ, WORKER, fx(2.0)).unwrap();

        assert_eq!(actor.ledger().quantity(GOLD), fx(400.0));
        assert_eq!(actor.producer(HQ).unwrap().len(), 2);
        assert_eq!(
            production_events(&mut actor),
            vec![ProductionEvent::ProductionStarted {
                producer: HQ,
                producible: WORKER,
                quantity: fx(2.0)
            }]
        );
    }

    #[test]
    fn test_start_production_insufficient_resources() {
        let mut actor = actor();
        let result = actor.start_production(HQ, WORKER, fx(11.0));
        assert_eq!(
            result,
            Err(ProductionError::InsufficientResources(vec![
                ProducibleQuantity::new(GOLD, fx(50.0))
            ]))
        );
        assert_eq!(actor.ledger().quantity(GOLD), fx(500.0));
        assert!(actor.producer(HQ).unwrap().is_empty());
        assert!(actor.drain_events().is_empty());
    }

    #[test]
    fn test_start_production_unmet_requirement() {
        let mut actor = actor();
        let result = actor.start_production(HQ, SOLDIER, fx(1.0));
        assert_eq!(
            result,
            Err(ProductionError::UnmetRequirement(vec![ProducibleQuantity::new(
                BARRACKS,
                fx(1.0)
            )]))
        );
        assert_eq!(actor.ledger().quantity(GOLD), fx(500.0));
    }

    #[test]
    fn test_start_production_rejects_bad_arguments() {
        let mut actor = actor();
        assert_eq!(
            actor.start_production(HQ, WORKER, Fixed::ZERO),
            Err(ProductionError::InvalidQuantity)
        );
        assert_eq!(
            actor.start_production(YARD, WORKER, fx(1.0)),
            Err(ProductionError::UnknownProducer(YARD))
        );
        assert_eq!(
            actor.start_production(HQ, ProducibleId(99), fx(1.0)),
            Err(ProductionError::UnknownProducible(ProducibleId(99)))
        );
    }

    #[test]
    fn test_full_queue_charges_nothing() {
        let config = EconomyConfig {
            producer_queue_limit: Some(2),
            ..config()
        };
        let mut actor = EconomicActor::new(catalog(), &config).unwrap();
        actor.add_producer(HQ).unwrap();

        assert_eq!(
            actor.start_production(HQ, WORKER, fx(3.0)),
            Err(ProductionError::QueueFull)
        );
        assert_eq!(actor.ledger().quantity(GOLD), fx(500.0));
    }

    #[test]
    fn test_unit_completion_requests_spawn() {
        let mut actor = actor();
        actor.start_production(HQ, WORKER, fx(1.0)).unwrap();
        actor.drain_events();

        assert_eq!(actor.tick(fx(10.5)), 1);
        let events = actor.drain_events();
        let order = ProductionOrder::new(WORKER, fx(1.0), fx(10.0));
        assert_eq!(
            events,
            vec![
                EconomyEvent::Production(ProductionEvent::ProductionFinished {
                    producer: HQ,
                    order
                }),
                EconomyEvent::Population(PopulationEvent::PopulationChanged {
                    current: fx(1.0),
                    max: Some(fx(4.0))
                }),
                EconomyEvent::Production(ProductionEvent::SpawnRequested {
                    ticket: SpawnTicket(0),
                    producer: Some(HQ),
                    producible: WORKER
                }),
            ]
        );

        actor.complete_spawn(SpawnTicket(0), UnitId(1)).unwrap();
        assert!(actor.owns_unit(UnitId(1)));
        assert_eq!(actor.ledger().quantity(WORKER), fx(1.0));
        assert_eq!(actor.pending_spawns().count(), 0);

        assert!(matches!(
            actor.complete_spawn(SpawnTicket(0), UnitId(2)),
            Err(EconomyError::UnknownSpawnTicket(_))
        ));
    }

    #[test]
    fn test_complete_spawn_rejects_owned_unit() {
        let mut actor = actor();
        actor.start_production(HQ, WORKER, fx(2.0)).unwrap();
        assert_eq!(actor.tick(fx(25.0)), 2);

        actor.complete_spawn(SpawnTicket(0), UnitId(5)).unwrap();
        assert!(matches!(
            actor.complete_spawn(SpawnTicket(1), UnitId(5)),
            Err(EconomyError::UnitAlreadyOwned(UnitId(5)))
        ));

        // Nothing moved and the ticket can still be resolved
        assert_eq!(actor.units().count(), 1);
        assert_eq!(actor.ledger().quantity(WORKER), fx(1.0));
        assert!(actor.pending_spawn(SpawnTicket(1)).is_some());
        actor.complete_spawn(SpawnTicket(1), UnitId(6)).unwrap();
        assert_eq!(actor.ledger().quantity(WORKER), fx(2.0));
        assert_eq!(actor.population().current(), fx(2.0));

        actor.remove_unit(UnitId(5)).unwrap();
        actor.remove_unit(UnitId(6)).unwrap();
        assert_eq!(actor.ledger().quantity(WORKER), Fixed::ZERO);
        assert_eq!(actor.population().current(), Fixed::ZERO);
    }

    #[test]
    fn test_complete_spawn_reports_capped_unit_overflow() {
        let mut actor = actor();
        actor.start_production(HQ, WORKER, fx(1.0)).unwrap();
        actor.tick(fx(10.5));
        actor.ledger_mut().set_unlimited(WORKER, false);
        actor.ledger_mut().set_max_quantity(WORKER, Fixed::ZERO);
        actor.drain_events();

        actor.complete_spawn(SpawnTicket(0), UnitId(1)).unwrap();
        let events = actor.drain_events();
        assert!(events.contains(&EconomyEvent::Production(
            ProductionEvent::ResourceOverflow {
                producer: Some(HQ),
                remainder: ProducibleQuantity::new(WORKER, fx(1.0)),
            }
        )));
        assert!(actor.owns_unit(UnitId(1)));
    }

    #[test]
    fn test_population_cap_holds_queue() {
        let mut actor = actor();
        actor.start_production(HQ, WORKER, fx(6.0)).unwrap();

        assert_eq!(actor.tick(fx(1000.0)), 4);
        assert_eq!(actor.population().current(), fx(4.0));
        assert_eq!(actor.producer(HQ).unwrap().len(), 2);
        assert_eq!(actor.producer(HQ).unwrap().remaining(), Some(fx(10.0)));

        // Releasing population lets the queue continue
        let first = spawn_tickets(&actor)[0];
        actor.fail_spawn(first).unwrap();
        assert_eq!(actor.tick(fx(10.5)), 1);
        assert_eq!(actor.producer(HQ).unwrap().len(), 1);
    }

    #[test]
    fn test_spawn_failure_refunds() {
        let mut actor = actor();
        actor.start_production(HQ, WORKER, fx(1.0)).unwrap();
        actor.tick(fx(20.0));
        assert_eq!(actor.ledger().quantity(GOLD), fx(450.0));

        let ticket = spawn_tickets(&actor)[0];
        let overflow = actor.fail_spawn(ticket).unwrap();
        assert!(overflow.is_empty());
        assert_eq!(actor.ledger().quantity(GOLD), fx(500.0));
        assert_eq!(actor.population().current(), Fixed::ZERO);
        assert_eq!(actor.ledger().quantity(WORKER), Fixed::ZERO);
    }

    #[test]
    fn test_cancel_refunds_full_cost() {
        let mut actor = actor();
        let before = actor.ledger().quantity(GOLD);

        actor.start_production(HQ, WORKER, fx(2.5)).unwrap();
        actor.tick(fx(3.0));
        let cancelled = actor.cancel_producer_orders(HQ).unwrap();

        assert_eq!(cancelled.len(), 3);
        assert_eq!(actor.ledger().quantity(GOLD), before);
        assert!(actor.producer(HQ).unwrap().is_empty());
    }

    #[test]
    fn test_cancel_reports_refund_overflow() {
        let config = EconomyConfig {
            common_max_quantity: fx(600.0),
            ..config()
        };
        let mut actor = EconomicActor::new(catalog(), &config).unwrap();
        actor.add_producer(HQ).unwrap();
        actor.start_production(HQ, WORKER, fx(2.0)).unwrap();
        actor.grant(GOLD, fx(130.0)).unwrap();
        actor.drain_events();

        actor.cancel_producer_order(HQ, 0).unwrap().unwrap();
        actor.cancel_producer_order(HQ, 0).unwrap().unwrap();
        assert_eq!(actor.ledger().quantity(GOLD), fx(600.0));

        let events = production_events(&mut actor);
        let ProductionEvent::ProductionCancelled {
            refund_overflow, ..
        } = &events[1]
        else {
            panic!("expected a cancellation, got {events:?}");
        };
        assert_eq!(
            refund_overflow,
            &vec![ProducibleQuantity::new(GOLD, fx(30.0))]
        );
        assert!(actor.cancel_producer_order(HQ, 0).unwrap().is_none());
    }

    #[test]
    fn test_requirement_satisfied_by_spawned_structure() {
        let mut actor = actor();
        actor.start_production(HQ, BARRACKS, fx(1.0)).unwrap();
        actor.tick(fx(25.0));
        let ticket = spawn_tickets(&actor)[0];
        actor.complete_spawn(ticket, UnitId(7)).unwrap();
        assert_eq!(actor.population().max(), Some(fx(9.0)));

        actor.start_production(HQ, SOLDIER, fx(1.0)).unwrap();

        // Losing the barracks mid-production holds the soldier
        actor.remove_unit(UnitId(7)).unwrap();
        assert_eq!(actor.ledger().quantity(BARRACKS), Fixed::ZERO);
        assert_eq!(actor.population().max(), Some(fx(4.0)));
        assert_eq!(actor.tick(fx(100.0)), 0);
        assert_eq!(actor.producer(HQ).unwrap().len(), 1);
    }

    #[test]
    fn test_resource_production_overflow() {
        let config = EconomyConfig {
            common_max_quantity: fx(510.0),
            ..config()
        };
        let mut actor = EconomicActor::new(catalog(), &config).unwrap();
        actor.add_producer(HQ).unwrap();
        actor.start_production(HQ, GOLD, fx(25.0)).unwrap();
        actor.start_production(HQ, GOLD, fx(25.0)).unwrap();
        actor.drain_events();

        // First order overflows, second is held by full storage
        assert_eq!(actor.tick(fx(50.0)), 1);
        assert_eq!(actor.ledger().quantity(GOLD), fx(510.0));
        assert_eq!(actor.producer(HQ).unwrap().len(), 1);

        let events = actor.drain_events();
        assert!(events.contains(&EconomyEvent::Ledger(LedgerEvent::ResourceFull {
            producible: GOLD
        })));
        assert!(events.contains(&EconomyEvent::Production(
            ProductionEvent::ResourceOverflow {
                producer: Some(HQ),
                remainder: ProducibleQuantity::new(GOLD, fx(15.0))
            }
        )));
    }

    #[test]
    fn test_research_completion() {
        let mut actor = actor();
        actor.start_production(HQ, ARCHERY, fx(1.0)).unwrap();
        actor.tick(fx(30.5));

        assert_eq!(actor.ledger().quantity(ARCHERY), fx(1.0));
        assert!(production_events(&mut actor).contains(&ProductionEvent::ResearchCompleted {
            producer: Some(HQ),
            producible: ARCHERY
        }));
    }

    #[test]
    fn test_grant_unit_requests_spawn_without_refund() {
        let mut actor = actor();
        assert_eq!(actor.grant(WORKER, fx(1.0)).unwrap(), Fixed::ZERO);
        let ticket = spawn_tickets(&actor)[0];
        assert_eq!(actor.pending_spawn(ticket).unwrap().producer, None);

        actor.fail_spawn(ticket).unwrap();
        assert_eq!(actor.ledger().quantity(GOLD), fx(500.0));
        assert!(matches!(
            actor.grant(ProducibleId(99), fx(1.0)),
            Err(EconomyError::UnknownProducible(_))
        ));
    }

    #[test]
    fn test_remove_unit_not_owned() {
        let mut actor = actor();
        assert!(matches!(
            actor.remove_unit(UnitId(42)),
            Err(EconomyError::UnitNotOwned(UnitId(42)))
        ));
    }

    #[test]
    fn test_remove_producer_cancels_everything() {
        let mut actor = actor();
        actor.add_producer(YARD).unwrap();
        actor.start_production(YARD, WORKER, fx(3.0)).unwrap();
        actor.tick(fx(15.0));
        assert_eq!(actor.pending_spawns().count(), 1);

        let cancelled = actor.remove_producer(YARD).unwrap();
        assert_eq!(cancelled.len(), 2);
        assert_eq!(actor.pending_spawns().count(), 0);
        assert_eq!(actor.ledger().quantity(GOLD), fx(500.0));
        assert_eq!(actor.population().current(), Fixed::ZERO);
        assert!(actor.producer(YARD).is_none());
        assert!(matches!(
            actor.remove_producer(YARD),
            Err(EconomyError::UnknownProducer(_))
        ));
    }

    #[test]
    fn test_duplicate_producer() {
        let mut actor = actor();
        assert!(matches!(
            actor.add_producer(HQ),
            Err(EconomyError::DuplicateProducer(_))
        ));
    }

    #[test]
    fn test_tick_visits_producers_in_id_order() {
        let mut actor = actor();
        actor.add_producer(YARD).unwrap();
        actor.start_production(YARD, WORKER, fx(1.0)).unwrap();
        actor.start_production(HQ, WORKER, fx(1.0)).unwrap();
        actor.drain_events();

        actor.tick(fx(10.5));
        let finished: Vec<ProducerId> = production_events(&mut actor)
            .into_iter()
            .filter_map(|e| match e {
                ProductionEvent::ProductionFinished { producer, .. } => Some(producer),
                _ => None,
            })
            .collect();
        assert_eq!(finished, vec![HQ, YARD]);
    }

    #[test]
    fn test_state_hash_tracks_state() {
        let mut a = actor();
        let mut b = actor();
        assert_eq!(a.state_hash(), b.state_hash());

        for actor in [&mut a, &mut b] {
            actor.start_production(HQ, WORKER, fx(2.0)).unwrap();
            actor.tick(fx(12.0));
        }
        assert_eq!(a.state_hash(), b.state_hash());

        a.tick(fx(1.0));
        assert_ne!(a.state_hash(), b.state_hash());
    }
}
