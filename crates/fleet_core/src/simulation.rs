//! Core simulation loop.
//!
//! [`Simulation`] owns one battle: its validated configuration, resolved
//! ship templates, generator, pools, grids and [`GameState`]. Every piece of
//! mutable context lives in the struct, so independent simulations can run
//! side by side without sharing anything.
//!
//! # Determinism
//!
//! - Every random choice draws from the simulation's own [`Generator`]
//! - Systems iterate ships and bullets in list order
//! - No wall-clock reads, no system entropy
//! - Same seed, same commands, same `dt` sequence: bit-identical states
//!
//! # Example
//!
//! ```
//! use fleet_core::components::{ShipType, Team};
//! use fleet_core::config::SimConfig;
//! use fleet_core::simulation::{ShipSpawn, Simulation};
//!
//! let mut sim = Simulation::new(SimConfig::default(), 1).unwrap();
//! let id = sim
//!     .spawn_ship(ShipSpawn::new(ShipType::Frigate, Team::Red, 400.0, 300.0))
//!     .unwrap();
//!
//! sim.tick().unwrap();
//! assert_eq!(sim.state().tick, 1);
//! assert!(sim.state().ship(id).is_some());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{BulletSpawn, EntityId, Ship, ShipId, ShipType, Team};
use crate::config::{ShipTemplate, SimConfig};
use crate::error::{Result, SimError};
use crate::fleet::{self, generate_initial_fleet, ReinforcementConfig, SpawnOrder};
use crate::pool::{EntityKind, Pools};
use crate::rng::Generator;
use crate::spatial::GridPool;
use crate::state::GameState;
use crate::systems::{self, Scratch, SystemContext};

// ============================================================================
// Tick events
// ============================================================================

/// One bullet's damage to one ship.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Ship credited with the hit, if the bullet had an owner.
    pub attacker: Option<ShipId>,
    /// Ship hit.
    pub target: ShipId,
    /// Damage absorbed by the shield.
    pub shield: f64,
    /// Damage dealt to the hull.
    pub hull: f64,
}

/// A ship destroyed by weapons fire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KillEvent {
    /// Destroyed ship.
    pub victim: ShipId,
    /// Its team.
    pub victim_team: Team,
    /// Living ship credited with the kill.
    pub killer: Option<ShipId>,
}

/// A ship reaching a new level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelUpEvent {
    /// Ship that leveled.
    pub ship: ShipId,
    /// Level reached. Multi-level gains report only the final level.
    pub level: u32,
}

/// Everything observable that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Bullet hits.
    pub damage: Vec<DamageEvent>,
    /// Ships destroyed.
    pub kills: Vec<KillEvent>,
    /// Level-ups.
    pub level_ups: Vec<LevelUpEvent>,
    /// Ships created during the tick (carrier launches).
    pub spawned: Vec<ShipId>,
    /// Ships deleted by the `remove` boundary policy.
    pub departed: Vec<ShipId>,
    /// Bullets created.
    pub shots_fired: u32,
}

impl TickEvents {
    /// Fold another tick's events into this one.
    pub fn merge(&mut self, mut other: TickEvents) {
        self.damage.append(&mut other.damage);
        self.kills.append(&mut other.kills);
        self.level_ups.append(&mut other.level_ups);
        self.spawned.append(&mut other.spawned);
        self.departed.append(&mut other.departed);
        self.shots_fired += other.shots_fired;
    }
}

// ============================================================================
// Spawn parameters
// ============================================================================

/// Parameters for creating a ship from its type's template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipSpawn {
    /// Hull type.
    pub ship_type: ShipType,
    /// Owning team.
    pub team: Team,
    /// Position.
    pub x: f64,
    /// Position.
    pub y: f64,
    /// Heading; defaults to facing the enemy side.
    #[serde(default)]
    pub angle: Option<f64>,
    /// Initial velocity.
    #[serde(default)]
    pub vx: f64,
    /// Initial velocity.
    #[serde(default)]
    pub vy: f64,
}

impl ShipSpawn {
    /// Spawn at rest, facing the enemy side.
    #[must_use]
    pub const fn new(ship_type: ShipType, team: Team, x: f64, y: f64) -> Self {
        Self {
            ship_type,
            team,
            x,
            y,
            angle: None,
            vx: 0.0,
            vy: 0.0,
        }
    }
}

impl From<&SpawnOrder> for ShipSpawn {
    fn from(order: &SpawnOrder) -> Self {
        Self {
            angle: Some(order.angle),
            ..Self::new(order.ship_type, order.team, order.x, order.y)
        }
    }
}

/// Parameters for injecting a bullet directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletRequest {
    /// Team the bullet fights for.
    pub team: Team,
    /// Ship credited with hits.
    #[serde(default)]
    pub owner: Option<ShipId>,
    /// Position.
    pub x: f64,
    /// Position.
    pub y: f64,
    /// Velocity.
    pub vx: f64,
    /// Velocity.
    pub vy: f64,
    /// Damage on impact.
    pub damage: f64,
    /// Lifetime, seconds.
    pub ttl: f64,
    /// Collision radius.
    #[serde(default = "default_bullet_radius")]
    pub radius: f64,
}

fn default_bullet_radius() -> f64 {
    2.0
}

impl BulletRequest {
    /// Check that every field is finite and the speed is at most
    /// `max_speed`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBullet`] naming the offending field.
    pub fn validate(&self, max_speed: f64) -> Result<()> {
        let fields = [
            ("x", self.x),
            ("y", self.y),
            ("vx", self.vx),
            ("vy", self.vy),
            ("damage", self.damage),
            ("ttl", self.ttl),
            ("radius", self.radius),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SimError::InvalidBullet(format!("{name} is {value}")));
        }
        if self.damage < 0.0 || self.ttl < 0.0 || self.radius < 0.0 {
            return Err(SimError::InvalidBullet(
                "damage, ttl and radius must be non-negative".into(),
            ));
        }
        let speed = self.vx.hypot(self.vy);
        if speed > max_speed {
            return Err(SimError::InvalidBullet(format!(
                "speed {speed} exceeds {max_speed}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// One deterministic battle.
///
/// # System Execution Order
///
/// Each [`Simulation::step`] runs:
/// 1. **Prune** - expire bullets and effects
/// 2. **AI + Movement** - decisions, cannons, integration, boundaries
/// 3. **Turrets + Fire** - aim tracking, queued shots become bullets
/// 4. **Carriers** - fighter launches
/// 5. **Collisions** - broad phase, damage, XP, deaths
/// 6. **Regeneration** - shields and cached percentages
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    templates: BTreeMap<ShipType, ShipTemplate>,
    seed: u32,
    rng: Generator,
    pools: Pools,
    grids: GridPool,
    scratch: Scratch,
    state: GameState,
}

impl Simulation {
    /// Create an empty battle.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found by
    /// [`SimConfig::validate`].
    pub fn new(config: SimConfig, seed: u32) -> Result<Self> {
        config.validate()?;
        let templates = config.resolve_templates()?;
        let pools = Pools::new(&config.pools);
        Ok(Self {
            config,
            templates,
            seed,
            rng: Generator::new(seed),
            pools,
            grids: GridPool::new(),
            scratch: Scratch::default(),
            state: GameState::new(),
        })
    }

    /// Create a battle populated with the configured initial fleets.
    ///
    /// # Errors
    ///
    /// Returns configuration errors, as [`Simulation::new`].
    pub fn with_initial_fleet(config: SimConfig, seed: u32) -> Result<Self> {
        let mut sim = Self::new(config, seed)?;
        let orders = generate_initial_fleet(seed, &sim.config.bounds, &sim.config.fleet);
        for order in &orders {
            sim.spawn_order(order)?;
        }
        tracing::debug!(ships = orders.len(), seed, "Initial fleets deployed");
        Ok(sim)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Resolved template for a ship type.
    #[must_use]
    pub fn template(&self, ship_type: ShipType) -> Option<&ShipTemplate> {
        self.templates.get(&ship_type)
    }

    /// Seed the generator was last reset to.
    #[must_use]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Current generator position.
    #[must_use]
    pub fn rng_state(&self) -> u32 {
        self.rng.state()
    }

    /// Read-only view of the battle.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Pool counters and free lists.
    #[must_use]
    pub fn pools(&self) -> &Pools {
        &self.pools
    }

    /// Owned copy of the battle for consumers outside the tick.
    #[must_use]
    pub fn snapshot(&self) -> GameState {
        self.state.clone()
    }

    /// Hash of the battle plus the generator position.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.state.state_hash().hash(&mut hasher);
        self.rng.state().hash(&mut hasher);
        hasher.finish()
    }

    // ========================================================================
    // Mutation between ticks
    // ========================================================================

    /// Reset the generator to `seed`.
    pub fn reseed(&mut self, seed: u32) {
        self.seed = seed;
        self.rng.seed(seed);
    }

    /// Put the generator at a position previously read from
    /// [`Simulation::rng_state`], leaving the recorded seed alone.
    pub fn resume_generator(&mut self, state: u32) {
        self.rng = Generator::new(state);
    }

    /// Replace the battle with `state`, returning the current bullets and
    /// effects to their pools.
    ///
    /// The pools then adopt the incoming bullets and effects, so no live id
    /// is left sitting in a free list.
    pub fn set_state(&mut self, mut state: GameState) {
        let mut old = std::mem::take(&mut self.state);
        for bullet in old.bullets.drain(..) {
            self.pools.bullets.release(bullet);
        }
        for kind in EntityKind::EFFECTS {
            for effect in old.effects_mut(kind).drain(..) {
                self.pools.effects_mut(kind).release(effect);
            }
        }

        state.reindex();
        self.pools.bullets.adopt(&state.bullets);
        for kind in EntityKind::EFFECTS {
            self.pools.effects_mut(kind).adopt(state.effects(kind));
        }
        self.state = state;
    }

    /// Create a ship from its type's template.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownShipType`] if the type has no template.
    pub fn spawn_ship(&mut self, spawn: ShipSpawn) -> Result<ShipId> {
        let template = self
            .templates
            .get(&spawn.ship_type)
            .ok_or_else(|| SimError::UnknownShipType(spawn.ship_type.name().to_string()))?;
        let id = self.state.allocate_id();
        let angle = spawn.angle.unwrap_or_else(|| spawn.team.facing());
        let mut ship = template.instantiate(id, spawn.team, spawn.x, spawn.y, angle);
        ship.vx = spawn.vx;
        ship.vy = spawn.vy;
        Ok(self.state.add_ship(ship))
    }

    /// Create the ship a spawn order describes.
    ///
    /// # Errors
    ///
    /// See [`Simulation::spawn_ship`].
    pub fn spawn_order(&mut self, order: &SpawnOrder) -> Result<ShipId> {
        self.spawn_ship(ShipSpawn::from(order))
    }

    /// Plan a reinforcement wave from current team strengths.
    ///
    /// Draws from the simulation's generator but does not create ships; the
    /// caller decides what to do with the orders.
    pub fn plan_reinforcements(&mut self, config: &ReinforcementConfig) -> Vec<SpawnOrder> {
        let strengths = self.state.team_strengths();
        fleet::plan_reinforcements(&strengths, &self.config.bounds, config, &mut self.rng)
    }

    /// Insert a fully specified ship, keeping its id.
    ///
    /// Used by tests and state surgery; normal spawning goes through
    /// [`Simulation::spawn_ship`].
    pub fn insert_ship(&mut self, ship: Ship) -> ShipId {
        self.state.add_ship(ship)
    }

    /// Mutable access to one ship between ticks.
    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.state.ship_mut(id)
    }

    /// Remove a ship without an explosion.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ShipNotFound`] for an unknown id.
    pub fn despawn_ship(&mut self, id: ShipId) -> Result<Ship> {
        self.state.remove_ship(id).ok_or(SimError::ShipNotFound(id))
    }

    /// Inject a bullet drawn from the bullet pool.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBullet`] for non-finite fields or a speed
    /// above `max_bullet_speed`, and [`SimError::PoolExhausted`] when the
    /// pool refuses.
    pub fn spawn_bullet(&mut self, request: BulletRequest) -> Result<EntityId> {
        request.validate(self.config.max_bullet_speed)?;
        let id = self.state.allocate_id();
        let bullet = self.pools.bullets.acquire(BulletSpawn {
            id,
            team: request.team,
            owner: request.owner,
            x: request.x,
            y: request.y,
            vx: request.vx,
            vy: request.vy,
            damage: request.damage,
            ttl: request.ttl,
            radius: request.radius,
        })?;
        self.state.bullets.push(bullet);
        Ok(id)
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Advance one fixed tick of `tick_duration_ms`.
    ///
    /// # Errors
    ///
    /// See [`Simulation::step`].
    pub fn tick(&mut self) -> Result<TickEvents> {
        let dt = self.config.tick_seconds();
        self.step(dt)
    }

    /// Advance the battle by `dt` seconds.
    ///
    /// `dt = 0` is a no-op. Values above `max_dt` are clamped so a frame
    /// hitch cannot destabilize integration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidDt`] for a negative or non-finite `dt`.
    pub fn step(&mut self, dt: f64) -> Result<TickEvents> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(SimError::InvalidDt(dt));
        }
        if dt == 0.0 {
            return Ok(TickEvents::default());
        }
        let dt = if dt > self.config.max_dt {
            tracing::warn!(dt, max_dt = self.config.max_dt, "Clamping oversized timestep");
            self.config.max_dt
        } else {
            dt
        };

        let mut events = TickEvents::default();
        let mut ctx = SystemContext {
            config: &self.config,
            templates: &self.templates,
            rng: &mut self.rng,
            pools: &mut self.pools,
            grids: &mut self.grids,
            scratch: &mut self.scratch,
            events: &mut events,
        };
        let state = &mut self.state;

        // 1. Prune expired bullets and effects
        systems::prune_system(state, &mut ctx, dt);

        // 2. AI decisions, cannon triggers, integration
        systems::ai_system(state, &mut ctx, dt);
        systems::movement_system(state, &mut ctx, dt);

        // 3. Turret tracking, then every queued shot becomes a bullet
        systems::turret_system(state, &mut ctx, dt);
        systems::fire_system(state, &mut ctx);

        // 4. Carrier launches
        systems::carrier_system(state, &mut ctx, dt);

        // 5. Collisions, damage, deaths
        systems::collision_system(state, &mut ctx)?;

        // 6. Shield regeneration
        systems::regen_system(state, dt);

        state.tick += 1;
        state.time += dt;

        #[cfg(debug_assertions)]
        {
            let hash = self.state.state_hash();
            tracing::debug!(tick = self.state.tick, state_hash = hash, "Simulation state hash");
        }

        #[cfg(feature = "debug-validation")]
        if let Err(problem) = self.state.check_invariants() {
            tracing::error!(tick = self.state.tick, %problem, "State invariant violated");
            debug_assert!(false, "state invariant violated: {problem}");
        }

        Ok(events)
    }

    /// Run `count` fixed ticks, merging their events.
    ///
    /// # Errors
    ///
    /// Stops at the first failing tick.
    pub fn run_ticks(&mut self, count: u32) -> Result<TickEvents> {
        let mut merged = TickEvents::default();
        for _ in 0..count {
            merged.merge(self.tick()?);
        }
        Ok(merged)
    }
}
