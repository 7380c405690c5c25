//! Error types for the battle simulation.

use thiserror::Error;

use crate::pool::EntityKind;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for all simulation errors.
///
/// Configuration problems are reported once, when a simulation or engine is
/// built. Problems inside a running tick are handled defensively and only
/// surface here when a caller asked for something impossible.
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// A ship type was referenced that has no configuration entry.
    #[error("Unknown ship type: {0}")]
    UnknownShipType(String),

    /// Ship lookup failed.
    #[error("Ship not found: {0}")]
    ShipNotFound(u64),

    /// A pool configured with the `error` overflow strategy is exhausted.
    #[error("Pool exhausted for {0:?}")]
    PoolExhausted(EntityKind),

    /// A bullet injected from outside has non-finite or out-of-range fields.
    #[error("Invalid bullet: {0}")]
    InvalidBullet(String),

    /// Step called with a negative or non-finite timestep.
    #[error("Invalid timestep: {0}")]
    InvalidDt(f64),

    /// Spatial grid constructed with a non-positive cell size.
    #[error("Invalid grid cell size: {0}")]
    InvalidCellSize(f64),

    /// A command needs a simulation but `init` has not been received.
    #[error("Simulation not initialized")]
    NotInitialized,

    /// Snapshot encoding or decoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The host running the simulation has shut down.
    #[error("Simulation host disconnected")]
    HostDisconnected,
}
