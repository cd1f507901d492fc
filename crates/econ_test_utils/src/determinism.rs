//! Determinism testing utilities.
//!
//! Provides a harness for verifying that an economy produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Economies run inside lockstep simulations, so they must be 100%
//! deterministic. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`econ_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Producers, units and ledger entries always iterate in id order.
//!
//! - **Thread scheduling**: Actors are single-threaded; running many in
//!   parallel must still give the same answer.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use econ_core::actor::EconomicActor;
use econ_core::math::Fixed;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic economy).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Economy is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use econ_test_utils::determinism::verify_determinism;
/// use econ_test_utils::fixtures::{fixed, sample_actor};
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 ticks each
///     sample_actor,
///     |actor| { actor.tick(fixed(1)); },
///     |actor| actor.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run an actor twice with identical setup, ticking by `delta`, and check
/// the final state hashes match exactly.
pub fn verify_actor_determinism<F>(setup_fn: F, num_ticks: u64, delta: Fixed) -> bool
where
    F: Fn() -> EconomicActor,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |actor| {
            actor.tick(delta);
        },
        EconomicActor::state_hash,
    )
    .is_deterministic
}

/// Run N actors on scoped threads and collect their final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_actors<F>(
    setup_fn: F,
    num_actors: usize,
    num_ticks: u64,
    delta: Fixed,
) -> DeterminismResult
where
    F: Fn() -> EconomicActor + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_actors)
            .map(|_| {
                s.spawn(|| {
                    let mut actor = setup_fn();
                    for _ in 0..num_ticks {
                        actor.tick(delta);
                    }
                    actor.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("actor thread panicked"))
            .collect()
    });

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two actor runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(tick)` if they diverge at
/// that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, delta: Fixed) -> Option<u64>
where
    F: Fn() -> EconomicActor,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.tick(delta);
        second.tick(delta);

        if first.state_hash() != second.state_hash() {
            tracing::debug!(tick, "Actors diverged");
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for economy inputs.
pub mod strategies {
    use econ_core::catalog::{ProducibleId, ProducibleQuantity};
    use econ_core::math::Fixed;
    use proptest::prelude::*;

    /// Generate a quantity with up to two decimal places in `0..=max`.
    pub fn arb_quantity(max: i64) -> impl Strategy<Value = Fixed> {
        (0..=max * 100).prop_map(|hundredths| Fixed::from_num(hundredths) / Fixed::from_num(100))
    }

    /// Generate a time delta in `0..=10` with quarter-unit resolution.
    pub fn arb_delta() -> impl Strategy<Value = Fixed> {
        (0i64..=40).prop_map(|quarters| Fixed::from_num(quarters) / Fixed::from_num(4))
    }

    /// Generate a producible id from a small range so collisions happen.
    pub fn arb_producible_id() -> impl Strategy<Value = ProducibleId> {
        (1u32..=4).prop_map(ProducibleId)
    }

    /// Generate a list of quantities over a few producible types.
    pub fn arb_quantity_list(max_len: usize) -> impl Strategy<Value = Vec<ProducibleQuantity>> {
        proptest::collection::vec(
            (arb_producible_id(), arb_quantity(200))
                .prop_map(|(id, quantity)| ProducibleQuantity::new(id, quantity)),
            0..max_len,
        )
    }
}
