//! Command and event messages exchanged with the simulation host.
//!
//! Messages are serde enums tagged by `type`, so they travel as one JSON
//! object each over any line-oriented transport:
//!
//! **Inbound:** [`Command`], from the presentation layer or a controller
//! **Outbound:** [`Event`], snapshots and notifications
//!
//! # Example Session
//!
//! ```text
//! -> {"type":"init","seed":1,"bounds":{"width":1920,"height":1080},"tickDurationMs":16}
//! <- {"type":"ready","tick":0,"ships":36}
//! -> {"type":"start"}
//! -> {"type":"command","action":{"kind":"spawnShip","shipType":"frigate","team":"red","x":300,"y":500}}
//! -> {"type":"snapshotRequest"}
//! <- {"type":"snapshot","state":{...}}
//! <- {"type":"reinforcements","team":"red","spawned":[41,42]}
//! ```

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, ShipId, Team};
use crate::config::Bounds;
use crate::simulation::{BulletRequest, ShipSpawn};
use crate::state::GameState;

// ============================================================================
// Inbound commands
// ============================================================================

/// Control messages accepted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    /// Build a fresh battle. Without `initial_state` the configured initial
    /// fleets are laid out from `seed`.
    Init {
        /// Generator seed.
        seed: u32,
        /// World bounds; keeps the configured bounds when absent.
        #[serde(default)]
        bounds: Option<Bounds>,
        /// Fixed tick length; keeps the configured value when absent.
        #[serde(default)]
        tick_duration_ms: Option<u32>,
        /// State to start from instead of a generated layout.
        #[serde(default)]
        initial_state: Option<Box<GameState>>,
    },

    /// Begin advancing on elapsed time.
    Start,

    /// Stop advancing. Commands and snapshot requests still work.
    Stop,

    /// Reset the generator.
    SetSeed {
        /// New seed.
        seed: u32,
    },

    /// Change the reinforcement check interval.
    SetReinforcementInterval {
        /// Seconds between checks.
        seconds: f64,
    },

    /// Enable or disable continuous reinforcement.
    SetContinuous {
        /// Whether reinforcements are generated.
        enabled: bool,
    },

    /// Adjust reinforcement tuning; absent fields keep their value.
    SetContinuousOptions(ContinuousOptions),

    /// Mutate the battle between ticks.
    Command {
        /// What to do.
        action: ShipCommand,
    },

    /// Ask for a snapshot now.
    SnapshotRequest,

    /// Advance exactly `count` fixed ticks, whether or not running.
    Step {
        /// Tick count.
        #[serde(default = "default_step_count")]
        count: u32,
    },

    /// Ask for the current state hash.
    Hash,
}

fn default_step_count() -> u32 {
    1
}

/// Partial update of the reinforcement tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuousOptions {
    /// Enable or disable reinforcement.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Seconds between checks.
    #[serde(default)]
    pub interval: Option<f64>,
    /// Strength share margin below one half.
    #[serde(default)]
    pub score_margin: Option<f64>,
    /// Most ships per check.
    #[serde(default)]
    pub per_tick: Option<u32>,
}

/// Between-tick mutations carried by [`Command::Command`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ShipCommand {
    /// Create a ship from its type template.
    SpawnShip(ShipSpawn),
    /// Inject a bullet.
    SpawnBullet(BulletRequest),
    /// Replace the whole battle.
    SetState {
        /// New state.
        state: Box<GameState>,
    },
    /// Remove a ship without an explosion.
    DespawnShip {
        /// Ship to remove.
        id: ShipId,
    },
}

// ============================================================================
// Outbound events
// ============================================================================

/// Messages emitted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Event {
    /// Battle initialized.
    Ready {
        /// Current tick.
        tick: u64,
        /// Ships in the battle.
        ships: usize,
    },

    /// Full state after a tick or on request.
    Snapshot {
        /// The battle.
        state: Box<GameState>,
    },

    /// A reinforcement cycle created ships.
    Reinforcements {
        /// Team reinforced.
        team: Team,
        /// Ids of the new ships.
        spawned: Vec<ShipId>,
    },

    /// A command created an entity.
    Spawned {
        /// New entity id.
        id: EntityId,
    },

    /// One team remains with continuous mode off.
    BattleOver {
        /// Surviving team.
        winner: Team,
        /// Tick the battle ended on.
        tick: u64,
    },

    /// Reply to [`Command::Hash`].
    StateHash {
        /// Current tick.
        tick: u64,
        /// Hash of the state and generator.
        hash: u64,
    },

    /// A command or tick failed. The engine keeps running.
    Error {
        /// Description.
        message: String,
        /// Backtrace, when the failure was a caught panic.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
}

// ============================================================================
// Helpers
// ============================================================================

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Command name, as it appears in the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::SetSeed { .. } => "setSeed",
            Self::SetReinforcementInterval { .. } => "setReinforcementInterval",
            Self::SetContinuous { .. } => "setContinuous",
            Self::SetContinuousOptions(_) => "setContinuousOptions",
            Self::Command { .. } => "command",
            Self::SnapshotRequest => "snapshotRequest",
            Self::Step { .. } => "step",
            Self::Hash => "hash",
        }
    }
}

impl Event {
    /// Build an error event.
    pub fn error(message: impl Into<String>) -> Self {
        Event::Error {
            message: message.into(),
            stack: None,
        }
    }

    /// Build an error event carrying a backtrace.
    pub fn error_with_stack(message: impl Into<String>, stack: Option<String>) -> Self {
        Event::Error {
            message: message.into(),
            stack,
        }
    }

    /// Serialize to a JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}
