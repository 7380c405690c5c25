//! Battle orchestration: turns protocol commands and elapsed wall time into
//! simulation ticks and outbound events.
//!
//! [`BattleEngine`] is what a host drives. It owns the optional
//! [`Simulation`] (absent until `init`), the fixed-timestep accumulator, the
//! running flag and the continuous-reinforcement settings. Reinforcement
//! orders planned by the fleet generator become ships here, after the tick
//! that triggered them.

use tracing::{debug, info, warn};

use crate::config::{Bounds, SimConfig};
use crate::error::{Result, SimError};
use crate::fleet::{ReinforcementConfig, Reinforcer};
use crate::protocol::{Command, ContinuousOptions, Event, ShipCommand};
use crate::simulation::Simulation;
use crate::state::GameState;

// ============================================================================
// Fixed timestep
// ============================================================================

/// Converts elapsed wall time into whole fixed ticks.
///
/// The backlog is capped so a long stall costs at most `max_backlog_ms` of
/// catch-up work instead of a burst of hundreds of ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTimestep {
    tick_ms: f64,
    max_backlog_ms: f64,
    accumulator: f64,
}

impl FixedTimestep {
    /// Create an accumulator for `tick_ms` ticks.
    #[must_use]
    pub fn new(tick_ms: u32, max_backlog_ms: u32) -> Self {
        Self {
            tick_ms: f64::from(tick_ms.max(1)),
            max_backlog_ms: f64::from(max_backlog_ms),
            accumulator: 0.0,
        }
    }

    /// Add `elapsed_ms` and return how many ticks are now due.
    ///
    /// Negative or non-finite elapsed time is ignored.
    pub fn advance(&mut self, elapsed_ms: f64) -> u32 {
        if !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            return 0;
        }
        self.accumulator += elapsed_ms;
        if self.accumulator > self.max_backlog_ms {
            debug!(
                backlog_ms = self.accumulator,
                cap_ms = self.max_backlog_ms,
                "Dropping simulation backlog"
            );
            self.accumulator = self.max_backlog_ms;
        }
        let due = (self.accumulator / self.tick_ms).floor();
        self.accumulator -= due * self.tick_ms;
        // Bounded by max_backlog_ms / tick_ms
        due as u32
    }

    /// Milliseconds carried toward the next tick.
    #[must_use]
    pub fn pending_ms(&self) -> f64 {
        self.accumulator
    }

    /// Drop any carried time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Command-driven battle host logic, independent of transport.
///
/// # Example
///
/// ```
/// use fleet_core::config::SimConfig;
/// use fleet_core::engine::BattleEngine;
/// use fleet_core::protocol::{Command, Event};
///
/// let mut engine = BattleEngine::new(SimConfig::default()).unwrap();
/// let events = engine.handle(Command::Init {
///     seed: 1,
///     bounds: None,
///     tick_duration_ms: None,
///     initial_state: None,
/// });
/// assert!(matches!(events[0], Event::Ready { .. }));
///
/// engine.handle(Command::Start);
/// let events = engine.advance(100.0);
/// assert!(events.iter().any(|e| matches!(e, Event::Snapshot { .. })));
/// ```
#[derive(Debug)]
pub struct BattleEngine {
    config: SimConfig,
    sim: Option<Simulation>,
    running: bool,
    continuous: bool,
    reinforcement: ReinforcementConfig,
    reinforcer: Reinforcer,
    timestep: FixedTimestep,
    battle_over: bool,
    auto_snapshot: bool,
}

impl BattleEngine {
    /// Create an engine with no battle loaded.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let timestep = FixedTimestep::new(config.tick_duration_ms, config.max_backlog_ms);
        let reinforcement = config.reinforcement.clone();
        Ok(Self {
            config,
            sim: None,
            running: false,
            continuous: false,
            reinforcement,
            reinforcer: Reinforcer::new(),
            timestep,
            battle_over: false,
            auto_snapshot: true,
        })
    }

    /// Emit a snapshot after every `advance` or `step` that ran ticks.
    /// On by default.
    pub fn set_auto_snapshot(&mut self, enabled: bool) {
        self.auto_snapshot = enabled;
    }

    /// Loaded battle, if `init` has been handled.
    #[must_use]
    pub fn simulation(&self) -> Option<&Simulation> {
        self.sim.as_ref()
    }

    /// Whether elapsed time advances the battle.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether reinforcements are generated.
    #[must_use]
    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    /// Active reinforcement tuning.
    #[must_use]
    pub fn reinforcement(&self) -> &ReinforcementConfig {
        &self.reinforcement
    }

    /// Base configuration used by `init`.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Apply one command. Failures come back as [`Event::Error`].
    pub fn handle(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        if let Err(e) = self.apply(command, &mut events) {
            warn!(error = %e, "Command failed");
            events.push(Event::error(e.to_string()));
        }
        events
    }

    fn apply(&mut self, command: Command, events: &mut Vec<Event>) -> Result<()> {
        match command {
            Command::Init {
                seed,
                bounds,
                tick_duration_ms,
                initial_state,
            } => self.init(seed, bounds, tick_duration_ms, initial_state.map(|s| *s), events)?,
            Command::Start => {
                self.sim_mut()?;
                self.running = true;
            }
            Command::Stop => {
                self.running = false;
                self.timestep.reset();
            }
            Command::SetSeed { seed } => self.sim_mut()?.reseed(seed),
            Command::SetReinforcementInterval { seconds } => {
                self.update_reinforcement(ContinuousOptions {
                    interval: Some(seconds),
                    ..ContinuousOptions::default()
                })?;
            }
            Command::SetContinuous { enabled } => {
                self.update_reinforcement(ContinuousOptions {
                    enabled: Some(enabled),
                    ..ContinuousOptions::default()
                })?;
            }
            Command::SetContinuousOptions(options) => self.update_reinforcement(options)?,
            Command::Command { action } => self.apply_action(action, events)?,
            Command::SnapshotRequest => events.push(self.snapshot_event()?),
            Command::Step { count } => {
                self.sim_mut()?;
                for _ in 0..count {
                    self.run_tick(events);
                }
                if self.auto_snapshot && count > 0 {
                    events.push(self.snapshot_event()?);
                }
            }
            Command::Hash => {
                let sim = self.sim_ref()?;
                events.push(Event::StateHash {
                    tick: sim.state().tick,
                    hash: sim.state_hash(),
                });
            }
        }
        Ok(())
    }

    fn init(
        &mut self,
        seed: u32,
        bounds: Option<Bounds>,
        tick_duration_ms: Option<u32>,
        initial_state: Option<GameState>,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let mut config = self.config.clone();
        if let Some(bounds) = bounds {
            config.bounds = bounds;
        }
        if let Some(ms) = tick_duration_ms {
            config.tick_duration_ms = ms;
        }

        let sim = match initial_state {
            Some(state) => {
                let mut sim = Simulation::new(config.clone(), seed)?;
                sim.set_state(state);
                sim
            }
            None => Simulation::with_initial_fleet(config.clone(), seed)?,
        };

        info!(
            seed,
            ships = sim.state().ships.len(),
            width = config.bounds.width,
            height = config.bounds.height,
            "Battle initialized"
        );
        events.push(Event::Ready {
            tick: sim.state().tick,
            ships: sim.state().ships.len(),
        });

        self.timestep = FixedTimestep::new(config.tick_duration_ms, config.max_backlog_ms);
        self.sim = Some(sim);
        self.running = false;
        self.battle_over = false;
        self.reinforcer.reset();
        Ok(())
    }

    fn update_reinforcement(&mut self, options: ContinuousOptions) -> Result<()> {
        let mut next = self.reinforcement.clone();
        if let Some(interval) = options.interval {
            next.interval = interval;
        }
        if let Some(margin) = options.score_margin {
            next.score_margin = margin;
        }
        if let Some(per_tick) = options.per_tick {
            next.per_tick = per_tick;
        }
        next.validate()?;
        self.reinforcement = next;

        if let Some(enabled) = options.enabled {
            if enabled != self.continuous {
                self.reinforcer.reset();
            }
            self.continuous = enabled;
        }
        debug!(
            continuous = self.continuous,
            interval = self.reinforcement.interval,
            score_margin = self.reinforcement.score_margin,
            "Reinforcement settings updated"
        );
        Ok(())
    }

    fn apply_action(&mut self, action: ShipCommand, events: &mut Vec<Event>) -> Result<()> {
        let sim = self.sim_mut()?;
        match action {
            ShipCommand::SpawnShip(spawn) => {
                let id = sim.spawn_ship(spawn)?;
                events.push(Event::Spawned { id });
            }
            ShipCommand::SpawnBullet(request) => {
                let id = sim.spawn_bullet(request)?;
                events.push(Event::Spawned { id });
            }
            ShipCommand::SetState { state } => {
                sim.set_state(*state);
                self.battle_over = false;
            }
            ShipCommand::DespawnShip { id } => {
                if let Err(e) = sim.despawn_ship(id) {
                    warn!(id, "Despawn requested for unknown ship");
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Time
    // ========================================================================

    /// Feed elapsed wall time. Runs every tick that became due while
    /// running and returns the resulting events.
    pub fn advance(&mut self, elapsed_ms: f64) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.running || self.sim.is_none() {
            return events;
        }
        let due = self.timestep.advance(elapsed_ms);
        for _ in 0..due {
            self.run_tick(&mut events);
        }
        if self.auto_snapshot && due > 0 {
            if let Ok(snapshot) = self.snapshot_event() {
                events.push(snapshot);
            }
        }
        events
    }

    fn run_tick(&mut self, events: &mut Vec<Event>) {
        let Some(sim) = self.sim.as_mut() else {
            return;
        };
        if let Err(e) = sim.tick() {
            warn!(tick = sim.state().tick, error = %e, "Tick failed");
            events.push(Event::error(e.to_string()));
            return;
        }

        if self.continuous {
            let dt = sim.config().tick_seconds();
            if self.reinforcer.tick(dt, self.reinforcement.interval) {
                let orders = sim.plan_reinforcements(&self.reinforcement);
                if let Some(team) = orders.first().map(|o| o.team) {
                    let mut spawned = Vec::with_capacity(orders.len());
                    for order in &orders {
                        match sim.spawn_order(order) {
                            Ok(id) => spawned.push(id),
                            Err(e) => events.push(Event::error(e.to_string())),
                        }
                    }
                    info!(team = team.name(), count = spawned.len(), "Reinforcements launched");
                    events.push(Event::Reinforcements { team, spawned });
                }
            }
        } else if !self.battle_over {
            if let Some(winner) = sim.state().winner() {
                self.battle_over = true;
                info!(winner = winner.name(), tick = sim.state().tick, "Battle over");
                events.push(Event::BattleOver {
                    winner,
                    tick: sim.state().tick,
                });
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn sim_ref(&self) -> Result<&Simulation> {
        self.sim.as_ref().ok_or(SimError::NotInitialized)
    }

    fn sim_mut(&mut self) -> Result<&mut Simulation> {
        self.sim.as_mut().ok_or(SimError::NotInitialized)
    }

    fn snapshot_event(&self) -> Result<Event> {
        Ok(Event::Snapshot {
            state: Box::new(self.sim_ref()?.snapshot()),
        })
    }
}
