//! # Fleet Core
//!
//! Deterministic simulation core for a 2D fleet battle.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No threads
//! - No system randomness (every random choice goes through [`rng::Generator`])
//!
//! This separation enables:
//! - Reproducible battles from a seed
//! - Headless hosts and worker threads
//! - Determinism testing by state hash
//!
//! ## Crate Structure
//!
//! - [`rng`] - Seeded generator
//! - [`components`] - Ship, bullet and effect records
//! - [`state`] - The battle container
//! - [`pool`] - Object pools for bullets and effects
//! - [`spatial`] - Broad-phase grid
//! - [`ai`] - Per-ship behavior state machine
//! - [`combat`] - Damage and progression math
//! - [`systems`] - Per-tick systems
//! - [`simulation`] - Core simulation loop
//! - [`fleet`] - Initial layout and reinforcement planning
//! - [`engine`] - Command-driven orchestration and fixed timestep
//! - [`protocol`] - Command and event messages
//! - [`host`] - Host boundary and the in-process host

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod combat;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod fleet;
pub mod host;
pub mod math;
pub mod pool;
pub mod protocol;
pub mod rng;
pub mod simulation;
pub mod spatial;
pub mod state;
pub mod systems;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiState, Behavior};
    pub use crate::components::*;
    pub use crate::config::{BoundaryMode, Bounds, SimConfig};
    pub use crate::engine::{BattleEngine, FixedTimestep};
    pub use crate::error::{Result, SimError};
    pub use crate::fleet::{FleetConfig, ReinforcementConfig, SpawnOrder};
    pub use crate::host::{InProcessHost, SimulationHost};
    pub use crate::pool::{EntityKind, OverflowStrategy, PoolConfig};
    pub use crate::protocol::{Command, Event, ShipCommand};
    pub use crate::rng::Generator;
    pub use crate::simulation::{BulletRequest, ShipSpawn, Simulation, TickEvents};
    pub use crate::state::GameState;
}
