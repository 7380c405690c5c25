//! Simulation configuration.
//!
//! [`SimConfig`] gathers every tunable the core reads: world bounds, timing,
//! boundary policies, AI and progression curves, pool sizes, and the ship
//! catalog. It is plain serde data; RON is the on-disk format.
//!
//! Configuration is validated once, when a simulation or engine is built.
//! Ship types are resolved into fully populated [`ShipTemplate`]s at the same
//! point, so the tick never has to fill in missing stats.
//!
//! # Example
//!
//! ```
//! use fleet_core::config::SimConfig;
//!
//! let config = SimConfig::default();
//! config.validate().unwrap();
//! let text = config.to_ron_string().unwrap();
//! let parsed = SimConfig::from_ron_str(&text).unwrap();
//! assert_eq!(parsed.bounds, config.bounds);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ai::AiConfig;
use crate::combat::ProgressionConfig;
use crate::components::{
    Cannon, CarrierState, Ship, ShipId, ShipType, SizeClass, Team, Turret, TurretKind,
    TurretTargeting, Weapon, WeaponStats,
};
use crate::error::{Result, SimError};
use crate::fleet::{FleetConfig, ReinforcementConfig};
use crate::pool::{EntityKind, PoolsConfig};

/// Range used by a weapon with none configured and no cannon to borrow from.
pub const DEFAULT_WEAPON_RANGE: f64 = 300.0;

/// Cannon fire arc used when a cannon leaves it unset.
pub const DEFAULT_FIRE_ARC: f64 = 0.6;

// ============================================================================
// World and timing
// ============================================================================

/// World rectangle `[0, width] × [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Field width.
    pub width: f64,
    /// Field height.
    pub height: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

impl Bounds {
    /// Create bounds.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether a point lies inside the rectangle (edges included).
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && x <= self.width && y >= 0.0 && y <= self.height
    }

    /// Field center.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.width * 0.5, self.height * 0.5)
    }
}

/// What happens to an entity that reaches the world edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Reappear on the opposite edge with unchanged velocity.
    Wrap,
    /// Delete the entity.
    Remove,
    /// Negate the crossing velocity component and clamp position.
    Bounce,
}

/// Boundary policy for ships and bullets, configured independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Policy for ships.
    pub ships: BoundaryMode,
    /// Policy for bullets.
    pub bullets: BoundaryMode,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            ships: BoundaryMode::Bounce,
            bullets: BoundaryMode::Remove,
        }
    }
}

/// Carrier fighter launches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarrierConfig {
    /// Seconds between launch cycles.
    pub spawn_interval: f64,
    /// Fighters launched per cycle at most.
    pub fighters_per_cycle: u32,
    /// Live fighters per carrier at most.
    pub max_fighters: u32,
    /// Extra distance beyond the carrier radius where fighters appear.
    pub spawn_offset: f64,
    /// Hull type launched.
    pub fighter_type: ShipType,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            spawn_interval: 4.0,
            fighters_per_cycle: 2,
            max_fighters: 6,
            spawn_offset: 10.0,
            fighter_type: ShipType::Fighter,
        }
    }
}

/// Lifetimes and sizes of observational effects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    /// Explosion lifetime, seconds.
    pub explosion_ttl: f64,
    /// Shield hit lifetime, seconds.
    pub shield_hit_ttl: f64,
    /// Hull hit lifetime, seconds.
    pub health_hit_ttl: f64,
    /// Particle lifetime, seconds.
    pub particle_ttl: f64,
    /// Maximum particle drift speed.
    pub particle_speed: f64,
    /// Particles emitted by a dying small/medium/large hull.
    pub particles_per_size: [u32; 3],
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            explosion_ttl: 0.6,
            shield_hit_ttl: 0.25,
            health_hit_ttl: 0.3,
            particle_ttl: 0.8,
            particle_speed: 120.0,
            particles_per_size: [4, 8, 14],
        }
    }
}

impl EffectConfig {
    /// Lifetime of an effect kind.
    #[must_use]
    pub fn ttl(&self, kind: EntityKind) -> f64 {
        match kind {
            EntityKind::Explosion => self.explosion_ttl,
            EntityKind::ShieldHit => self.shield_hit_ttl,
            EntityKind::HealthHit => self.health_hit_ttl,
            EntityKind::Particle | EntityKind::Bullet => self.particle_ttl,
        }
    }

    /// Particle count for a dying hull.
    #[must_use]
    pub fn particle_count(&self, size: SizeClass) -> u32 {
        match size {
            SizeClass::Small => self.particles_per_size[0],
            SizeClass::Medium => self.particles_per_size[1],
            SizeClass::Large => self.particles_per_size[2],
        }
    }
}

/// Team identity. Color is carried for presentation only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    /// Team.
    pub team: Team,
    /// Display color, e.g. `#ff4d4d`.
    pub color: String,
}

// ============================================================================
// Ship catalog
// ============================================================================

/// Stats every hull of a size class starts from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeClassDefaults {
    /// Hull points.
    pub hp: f64,
    /// Shield points.
    pub shield: f64,
    /// Shield regeneration per second.
    pub shield_regen: f64,
    /// Armor rating.
    pub armor: f64,
    /// Forward acceleration.
    pub accel: f64,
    /// Rotation rate, radians per second.
    pub turn_rate: f64,
    /// Speed cap.
    pub max_speed: f64,
    /// Collision radius.
    pub radius: f64,
}

/// Ballistics of one mount. `range` may be left unset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponConfig {
    /// Damage per bullet.
    pub damage: f64,
    /// Shots per second.
    pub rate: f64,
    /// Bullet speed relative to the ship.
    pub muzzle_speed: f64,
    /// Bullet lifetime.
    pub bullet_ttl: f64,
    /// Bullet radius.
    pub bullet_radius: f64,
    /// Half-width of angular spread.
    #[serde(default)]
    pub spread: f64,
    /// Effective range.
    #[serde(default)]
    pub range: Option<f64>,
}

impl WeaponConfig {
    fn stats(&self, fallback_range: f64) -> WeaponStats {
        WeaponStats {
            damage: self.damage,
            rate: self.rate,
            muzzle_speed: self.muzzle_speed,
            bullet_ttl: self.bullet_ttl,
            bullet_radius: self.bullet_radius,
            spread: self.spread,
            range: self.range.unwrap_or(fallback_range),
        }
    }
}

/// A forward cannon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CannonConfig {
    /// Ballistics.
    pub weapon: WeaponConfig,
    /// Fire arc, radians.
    #[serde(default)]
    pub fire_arc: Option<f64>,
}

/// A turret mount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurretConfig {
    /// Ballistics. An unset range borrows the ship's cannon range.
    pub weapon: WeaponConfig,
    /// Mount offset, ship-local radius units (forward).
    pub offset_x: f64,
    /// Mount offset, ship-local radius units (left).
    pub offset_y: f64,
    /// Hardware class.
    #[serde(default)]
    pub kind: TurretKind,
    /// Target selection mode.
    #[serde(default)]
    pub targeting: TurretTargeting,
    /// Aim rotation rate, radians per second.
    pub turn_rate: f64,
}

/// One hull type. Unset stats fall back to the size class defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipTypeConfig {
    /// Size class supplying defaults.
    pub size_class: SizeClass,
    /// Hull points.
    #[serde(default)]
    pub hp: Option<f64>,
    /// Shield points.
    #[serde(default)]
    pub shield: Option<f64>,
    /// Shield regeneration per second.
    #[serde(default)]
    pub shield_regen: Option<f64>,
    /// Armor rating.
    #[serde(default)]
    pub armor: Option<f64>,
    /// Acceleration.
    #[serde(default)]
    pub accel: Option<f64>,
    /// Rotation rate.
    #[serde(default)]
    pub turn_rate: Option<f64>,
    /// Speed cap.
    #[serde(default)]
    pub max_speed: Option<f64>,
    /// Collision radius.
    #[serde(default)]
    pub radius: Option<f64>,
    /// Forward cannons.
    #[serde(default)]
    pub cannons: Vec<CannonConfig>,
    /// Turrets.
    #[serde(default)]
    pub turrets: Vec<TurretConfig>,
    /// Whether this hull launches fighters.
    #[serde(default)]
    pub carrier: bool,
}

impl ShipTypeConfig {
    /// Resolve into a fully populated template.
    ///
    /// A turret without a range uses the first cannon's range, or
    /// [`DEFAULT_WEAPON_RANGE`] on a hull without cannons.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] when the size class has no
    /// defaults or a resolved stat is unusable.
    pub fn resolve(
        &self,
        ship_type: ShipType,
        size_classes: &BTreeMap<SizeClass, SizeClassDefaults>,
    ) -> Result<ShipTemplate> {
        let d = size_classes.get(&self.size_class).ok_or_else(|| {
            SimError::InvalidConfig(format!(
                "ship type {} uses size class {:?} with no defaults",
                ship_type.name(),
                self.size_class
            ))
        })?;

        let cannons: Vec<Cannon> = self
            .cannons
            .iter()
            .map(|c| Cannon {
                stats: c.weapon.stats(DEFAULT_WEAPON_RANGE),
                cooldown: 0.0,
                fire_arc: c.fire_arc.unwrap_or(DEFAULT_FIRE_ARC),
            })
            .collect();
        let turret_fallback = cannons
            .first()
            .map_or(DEFAULT_WEAPON_RANGE, |c| c.stats.range);

        let mut weapons: Vec<Weapon> = cannons.into_iter().map(Weapon::Cannon).collect();
        weapons.extend(self.turrets.iter().map(|t| {
            Weapon::Turret(Turret {
                stats: t.weapon.stats(turret_fallback),
                cooldown: 0.0,
                offset_x: t.offset_x,
                offset_y: t.offset_y,
                kind: t.kind,
                targeting: t.targeting,
                angle: 0.0,
                target_angle: 0.0,
                turn_rate: t.turn_rate,
                target: None,
            })
        }));

        let template = ShipTemplate {
            ship_type,
            size_class: self.size_class,
            hp: self.hp.unwrap_or(d.hp),
            shield: self.shield.unwrap_or(d.shield),
            shield_regen: self.shield_regen.unwrap_or(d.shield_regen),
            armor: self.armor.unwrap_or(d.armor),
            accel: self.accel.unwrap_or(d.accel),
            turn_rate: self.turn_rate.unwrap_or(d.turn_rate),
            max_speed: self.max_speed.unwrap_or(d.max_speed),
            radius: self.radius.unwrap_or(d.radius),
            weapons,
            carrier: self.carrier,
        };
        template.validate()?;
        Ok(template)
    }
}

/// A ship type with every stat filled in, ready to stamp out ships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipTemplate {
    /// Hull type.
    pub ship_type: ShipType,
    /// Size class.
    pub size_class: SizeClass,
    /// Hull points.
    pub hp: f64,
    /// Shield points.
    pub shield: f64,
    /// Shield regeneration.
    pub shield_regen: f64,
    /// Armor.
    pub armor: f64,
    /// Acceleration.
    pub accel: f64,
    /// Rotation rate.
    pub turn_rate: f64,
    /// Speed cap.
    pub max_speed: f64,
    /// Collision radius.
    pub radius: f64,
    /// Normalized weapon mounts.
    pub weapons: Vec<Weapon>,
    /// Whether this hull launches fighters.
    pub carrier: bool,
}

impl ShipTemplate {
    fn validate(&self) -> Result<()> {
        let name = self.ship_type.name();
        if !(self.hp.is_finite() && self.hp > 0.0) {
            return Err(SimError::InvalidConfig(format!("{name}: hp must be positive")));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(SimError::InvalidConfig(format!("{name}: radius must be positive")));
        }
        let non_negative = [
            ("shield", self.shield),
            ("shield_regen", self.shield_regen),
            ("armor", self.armor),
            ("accel", self.accel),
            ("turn_rate", self.turn_rate),
            ("max_speed", self.max_speed),
        ];
        for (stat, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "{name}: {stat} must be finite and non-negative"
                )));
            }
        }
        for weapon in &self.weapons {
            let s = weapon.stats();
            if !(s.rate >= 0.0 && s.bullet_ttl > 0.0 && s.range > 0.0 && s.bullet_radius >= 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "{name}: weapon needs rate >= 0, bullet_ttl > 0, range > 0"
                )));
            }
        }
        Ok(())
    }

    /// Build a ship at full health facing `angle`.
    #[must_use]
    pub fn instantiate(&self, id: ShipId, team: Team, x: f64, y: f64, angle: f64) -> Ship {
        let weapons = self
            .weapons
            .iter()
            .map(|w| match *w {
                Weapon::Turret(mut t) => {
                    t.angle = angle;
                    t.target_angle = angle;
                    Weapon::Turret(t)
                }
                cannon => cannon,
            })
            .collect();

        Ship {
            id,
            team,
            ship_type: self.ship_type,
            size_class: self.size_class,
            x,
            y,
            angle,
            vx: 0.0,
            vy: 0.0,
            throttle: 0.0,
            steering: 0.0,
            hp: self.hp,
            max_hp: self.hp,
            shield: self.shield,
            max_shield: self.shield,
            shield_regen: self.shield_regen,
            armor: self.armor,
            accel: self.accel,
            turn_rate: self.turn_rate,
            max_speed: self.max_speed,
            radius: self.radius,
            weapons,
            xp: 0.0,
            level: 1,
            kills: 0,
            hp_percent: 1.0,
            shield_percent: if self.shield > 0.0 { 1.0 } else { 0.0 },
            carrier: self.carrier.then_some(CarrierState { spawn_timer: 0.0 }),
            parent_id: None,
            ai: None,
        }
    }
}

// ============================================================================
// Top-level configuration
// ============================================================================

/// Everything the simulation core reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// World rectangle.
    pub bounds: Bounds,
    /// Fixed tick duration, milliseconds.
    pub tick_duration_ms: u32,
    /// Largest accumulated backlog the fixed-timestep driver will replay.
    pub max_backlog_ms: u32,
    /// Largest `dt` a single step integrates; larger values are clamped.
    pub max_dt: f64,
    /// Velocity retained per 1/60 s. Damping per step is
    /// `friction^(dt × 60)`.
    pub friction: f64,
    /// Edge behavior.
    pub boundary: BoundaryConfig,
    /// Broad-phase cell edge length.
    pub grid_cell_size: f64,
    /// Lower bound on the extra query radius around each bullet.
    pub collision_margin: f64,
    /// Fastest bullet accepted through `spawnBullet`, units per second.
    pub max_bullet_speed: f64,
    /// Decision tuning.
    pub ai: AiConfig,
    /// XP and level curve.
    pub progression: ProgressionConfig,
    /// Fighter launches.
    pub carrier: CarrierConfig,
    /// Pool sizes and overflow policies.
    pub pools: PoolsConfig,
    /// Effect lifetimes.
    pub effects: EffectConfig,
    /// Hull catalog.
    pub ship_types: BTreeMap<ShipType, ShipTypeConfig>,
    /// Per-size-class stat defaults.
    pub size_classes: BTreeMap<SizeClass, SizeClassDefaults>,
    /// Team identities.
    pub teams: Vec<TeamConfig>,
    /// Continuous reinforcement.
    pub reinforcement: ReinforcementConfig,
    /// Initial fleet layout.
    pub fleet: FleetConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            tick_duration_ms: 16,
            max_backlog_ms: 250,
            max_dt: 0.05,
            friction: 0.98,
            boundary: BoundaryConfig::default(),
            grid_cell_size: 64.0,
            collision_margin: 24.0,
            max_bullet_speed: 4000.0,
            ai: AiConfig::default(),
            progression: ProgressionConfig::default(),
            carrier: CarrierConfig::default(),
            pools: PoolsConfig::default(),
            effects: EffectConfig::default(),
            ship_types: default_ship_types(),
            size_classes: default_size_classes(),
            teams: vec![
                TeamConfig {
                    team: Team::Red,
                    color: "#ff4d4d".into(),
                },
                TeamConfig {
                    team: Team::Blue,
                    color: "#4d8dff".into(),
                },
            ],
            reinforcement: ReinforcementConfig::default(),
            fleet: FleetConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse a RON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ConfigParse`] on malformed input. The result is
    /// not validated; call [`SimConfig::validate`].
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| SimError::ConfigParse(e.to_string()))
    }

    /// Render as pretty RON.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Serialization`] if rendering fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SimError::Serialization(e.to_string()))
    }

    /// Fixed tick duration in seconds.
    #[must_use]
    pub fn tick_seconds(&self) -> f64 {
        f64::from(self.tick_duration_ms) / 1000.0
    }

    /// Reject configurations the simulation cannot run.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(SimError::InvalidConfig(msg)) };

        let b = self.bounds;
        if !(b.width.is_finite() && b.width > 0.0 && b.height.is_finite() && b.height > 0.0) {
            return invalid(format!("bounds must be positive, got {}x{}", b.width, b.height));
        }
        if self.tick_duration_ms == 0 {
            return invalid("tick_duration_ms must be positive".into());
        }
        if self.max_backlog_ms < self.tick_duration_ms {
            return invalid("max_backlog_ms must cover at least one tick".into());
        }
        if !(self.max_dt.is_finite() && self.max_dt > 0.0) {
            return invalid(format!("max_dt must be positive, got {}", self.max_dt));
        }
        if !(self.friction > 0.0 && self.friction <= 1.0) {
            return invalid(format!("friction must be in (0, 1], got {}", self.friction));
        }
        if !(self.grid_cell_size.is_finite() && self.grid_cell_size > 0.0) {
            return invalid(format!("grid_cell_size must be positive, got {}", self.grid_cell_size));
        }
        if !(self.collision_margin.is_finite() && self.collision_margin >= 0.0) {
            return invalid("collision_margin must be non-negative".into());
        }
        if !(self.max_bullet_speed.is_finite() && self.max_bullet_speed > 0.0) {
            return invalid(format!(
                "max_bullet_speed must be positive, got {}",
                self.max_bullet_speed
            ));
        }

        self.ai.validate()?;

        let p = &self.progression;
        if !(p.xp_base.is_finite() && p.xp_base > 0.0) {
            return invalid("progression.xp_base must be positive".into());
        }
        if !(p.xp_growth.is_finite() && p.xp_growth >= 1.0) {
            return invalid("progression.xp_growth must be at least 1".into());
        }
        if !(p.percent_decay > 0.0 && p.percent_decay <= 1.0) {
            return invalid("progression.percent_decay must be in (0, 1]".into());
        }

        for kind in EntityKind::ALL {
            if self.pools.get(kind).capacity == 0 {
                return invalid(format!("pool capacity for {kind:?} must be positive"));
            }
        }

        if self.carrier.spawn_interval.is_nan() || self.carrier.spawn_interval <= 0.0 {
            return invalid("carrier.spawn_interval must be positive".into());
        }

        if self.ship_types.is_empty() {
            return invalid("ship_types must not be empty".into());
        }
        let templates = self.resolve_templates()?;
        if templates.values().any(|t| t.carrier)
            && !templates.contains_key(&self.carrier.fighter_type)
        {
            return Err(SimError::UnknownShipType(
                self.carrier.fighter_type.name().to_string(),
            ));
        }
        let referenced = self
            .fleet
            .counts
            .keys()
            .chain(self.reinforcement.mix.keys());
        for ship_type in referenced {
            if !templates.contains_key(ship_type) {
                return Err(SimError::UnknownShipType(ship_type.name().to_string()));
            }
        }

        self.fleet.validate()?;
        self.reinforcement.validate()?;

        let mut seen = Vec::with_capacity(self.teams.len());
        for t in &self.teams {
            if seen.contains(&t.team) {
                return invalid(format!("team {} listed twice", t.team.name()));
            }
            seen.push(t.team);
        }
        Ok(())
    }

    /// Resolve every ship type into a template.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error.
    pub fn resolve_templates(&self) -> Result<BTreeMap<ShipType, ShipTemplate>> {
        self.ship_types
            .iter()
            .map(|(&ty, cfg)| cfg.resolve(ty, &self.size_classes).map(|t| (ty, t)))
            .collect()
    }

    /// Display color of a team, if configured.
    #[must_use]
    pub fn team_color(&self, team: Team) -> Option<&str> {
        self.teams
            .iter()
            .find(|t| t.team == team)
            .map(|t| t.color.as_str())
    }
}

// ============================================================================
// Default catalog
// ============================================================================

fn default_size_classes() -> BTreeMap<SizeClass, SizeClassDefaults> {
    BTreeMap::from([
        (
            SizeClass::Small,
            SizeClassDefaults {
                hp: 40.0,
                shield: 10.0,
                shield_regen: 2.0,
                armor: 0.0,
                accel: 220.0,
                turn_rate: 4.0,
                max_speed: 260.0,
                radius: 8.0,
            },
        ),
        (
            SizeClass::Medium,
            SizeClassDefaults {
                hp: 120.0,
                shield: 40.0,
                shield_regen: 4.0,
                armor: 1.0,
                accel: 120.0,
                turn_rate: 2.2,
                max_speed: 170.0,
                radius: 14.0,
            },
        ),
        (
            SizeClass::Large,
            SizeClassDefaults {
                hp: 400.0,
                shield: 120.0,
                shield_regen: 8.0,
                armor: 3.0,
                accel: 60.0,
                turn_rate: 1.0,
                max_speed: 100.0,
                radius: 24.0,
            },
        ),
    ])
}

const fn weapon(
    damage: f64,
    rate: f64,
    muzzle_speed: f64,
    bullet_ttl: f64,
    bullet_radius: f64,
    spread: f64,
    range: Option<f64>,
) -> WeaponConfig {
    WeaponConfig {
        damage,
        rate,
        muzzle_speed,
        bullet_ttl,
        bullet_radius,
        spread,
        range,
    }
}

fn cannon(weapon: WeaponConfig) -> CannonConfig {
    CannonConfig {
        weapon,
        fire_arc: None,
    }
}

fn bare_type(size_class: SizeClass) -> ShipTypeConfig {
    ShipTypeConfig {
        size_class,
        hp: None,
        shield: None,
        shield_regen: None,
        armor: None,
        accel: None,
        turn_rate: None,
        max_speed: None,
        radius: None,
        cannons: Vec::new(),
        turrets: Vec::new(),
        carrier: false,
    }
}

fn default_ship_types() -> BTreeMap<ShipType, ShipTypeConfig> {
    let fighter = ShipTypeConfig {
        cannons: vec![cannon(weapon(4.0, 4.0, 520.0, 0.9, 2.0, 0.05, Some(260.0)))],
        ..bare_type(SizeClass::Small)
    };

    let corvette = ShipTypeConfig {
        hp: Some(90.0),
        accel: Some(150.0),
        turn_rate: Some(2.8),
        max_speed: Some(200.0),
        radius: Some(12.0),
        cannons: vec![cannon(weapon(6.0, 3.0, 480.0, 1.0, 2.0, 0.04, Some(300.0)))],
        ..bare_type(SizeClass::Medium)
    };

    let frigate = ShipTypeConfig {
        cannons: vec![cannon(weapon(10.0, 1.5, 450.0, 1.2, 3.0, 0.03, Some(340.0)))],
        turrets: vec![TurretConfig {
            weapon: weapon(4.0, 3.0, 500.0, 0.9, 2.0, 0.05, None),
            offset_x: -0.3,
            offset_y: 0.0,
            kind: TurretKind::Light,
            targeting: TurretTargeting::Nearest,
            turn_rate: 3.0,
        }],
        ..bare_type(SizeClass::Medium)
    };

    let destroyer = ShipTypeConfig {
        hp: Some(300.0),
        accel: Some(80.0),
        turn_rate: Some(1.4),
        max_speed: Some(120.0),
        radius: Some(20.0),
        cannons: vec![cannon(weapon(18.0, 1.0, 420.0, 1.4, 4.0, 0.02, Some(380.0)))],
        turrets: vec![
            TurretConfig {
                weapon: weapon(12.0, 1.0, 420.0, 1.2, 3.0, 0.02, Some(360.0)),
                offset_x: 0.3,
                offset_y: 0.5,
                kind: TurretKind::Heavy,
                targeting: TurretTargeting::Focus,
                turn_rate: 1.5,
            },
            TurretConfig {
                weapon: weapon(3.0, 6.0, 600.0, 0.5, 2.0, 0.12, Some(220.0)),
                offset_x: 0.3,
                offset_y: -0.5,
                kind: TurretKind::Flak,
                targeting: TurretTargeting::Nearest,
                turn_rate: 4.0,
            },
        ],
        ..bare_type(SizeClass::Large)
    };

    let carrier = ShipTypeConfig {
        turrets: vec![
            TurretConfig {
                weapon: weapon(3.0, 6.0, 600.0, 0.5, 2.0, 0.12, Some(220.0)),
                offset_x: -0.2,
                offset_y: 0.6,
                kind: TurretKind::Flak,
                targeting: TurretTargeting::Nearest,
                turn_rate: 4.0,
            },
            TurretConfig {
                weapon: weapon(4.0, 3.0, 500.0, 0.9, 2.0, 0.05, None),
                offset_x: -0.2,
                offset_y: -0.6,
                kind: TurretKind::Light,
                targeting: TurretTargeting::Random,
                turn_rate: 3.0,
            },
        ],
        carrier: true,
        ..bare_type(SizeClass::Large)
    };

    BTreeMap::from([
        (ShipType::Fighter, fighter),
        (ShipType::Corvette, corvette),
        (ShipType::Frigate, frigate),
        (ShipType::Destroyer, destroyer),
        (ShipType::Carrier, carrier),
    ])
}
