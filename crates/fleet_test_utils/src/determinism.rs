//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A battle must replay bit-for-bit from its seed. Sources of
//! non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Systems iterate ship and bullet lists in order, never the id index.
//!
//! - **System randomness**: No calls to an unseeded source.
//!   Every random choice draws from the simulation's own generator.
//!
//! - **Shared state**: Two simulations never share pools or generators, so
//!   running them on separate threads must not change either result.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (movement, combat, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N simulations in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use fleet_core::simulation::Simulation;
use fleet_core::state::GameState;

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
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
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
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
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

/// Advance one fixed tick, panicking on a core error.
///
/// # Panics
///
/// Panics if the tick fails, which a harness treats as a test failure.
pub fn tick(sim: &mut Simulation) {
    if let Err(e) = sim.tick() {
        panic!("tick {} failed: {e}", sim.state().tick);
    }
}

/// Runs a [`Simulation`] twice with identical setup and compares final
/// state hashes.
///
/// # Example
///
/// ```
/// use fleet_test_utils::determinism::verify_simulation_determinism;
/// use fleet_test_utils::fixtures::duel;
///
/// assert!(verify_simulation_determinism(|| duel(1), 60));
/// ```
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(2, num_ticks, &setup_fn, tick, Simulation::state_hash).is_deterministic
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Catches shared state that only shows up when simulations run
/// concurrently.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        tick(&mut sim);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for n in 1..=num_ticks {
        tick(&mut sim1);
        tick(&mut sim2);

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick = n, "Simulations diverged");
            return Some(n);
        }
    }

    None
}

/// Verify that a binary snapshot restores a battle that keeps evolving
/// identically.
///
/// Runs `num_ticks`, snapshots, then runs `num_ticks` more on both the
/// original and a simulation rebuilt from the snapshot.
pub fn verify_snapshot_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut original = setup_fn();
    for _ in 0..num_ticks {
        tick(&mut original);
    }

    let Ok(bytes) = original.state().to_bytes() else {
        return false;
    };
    let Ok(state) = GameState::from_bytes(&bytes) else {
        return false;
    };

    let mut restored = setup_fn();
    restored.set_state(state);
    restored.resume_generator(original.rng_state());

    if restored.state_hash() != original.state_hash() {
        return false;
    }
    for _ in 0..num_ticks {
        tick(&mut original);
        tick(&mut restored);
    }
    restored.state_hash() == original.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use proptest::prelude::*;

    use fleet_core::components::{ShipType, Team};
    use fleet_core::simulation::ShipSpawn;

    /// A position inside the default 1920x1080 field.
    pub fn arb_position() -> impl Strategy<Value = (f64, f64)> {
        (0.0f64..1920.0, 0.0f64..1080.0)
    }

    /// Either team.
    pub fn arb_team() -> impl Strategy<Value = Team> {
        prop_oneof![Just(Team::Red), Just(Team::Blue)]
    }

    /// Any hull type.
    pub fn arb_ship_type() -> impl Strategy<Value = ShipType> {
        proptest::sample::select(ShipType::ALL.to_vec())
    }

    /// Hull values (1-1000).
    pub fn arb_health() -> impl Strategy<Value = f64> {
        1.0f64..1000.0
    }

    /// Shield values (0-200).
    pub fn arb_shield() -> impl Strategy<Value = f64> {
        0.0f64..200.0
    }

    /// Bullet damage (0.1-100).
    pub fn arb_damage() -> impl Strategy<Value = f64> {
        0.1f64..100.0
    }

    /// Armor points, including values large enough to zero damage.
    pub fn arb_armor() -> impl Strategy<Value = f64> {
        0.0f64..15.0
    }

    /// A template spawn anywhere on the field.
    pub fn arb_spawn() -> impl Strategy<Value = ShipSpawn> {
        (arb_ship_type(), arb_team(), arb_position())
            .prop_map(|(ship_type, team, (x, y))| ShipSpawn::new(ship_type, team, x, y))
    }

    /// A list of spawns.
    pub fn arb_spawn_list(max_ships: usize) -> impl Strategy<Value = Vec<ShipSpawn>> {
        proptest::collection::vec(arb_spawn(), 1..max_ships)
    }
}
