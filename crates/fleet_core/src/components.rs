//! Entity records: ships, weapon mounts, bullets and transient effects.
//!
//! Entities are plain data with no behavior attached. Systems in
//! [`crate::systems`] and the free functions in [`crate::combat`] and
//! [`crate::ai`] operate on them, keyed by type tags rather than per-instance
//! closures, so every record stays serializable and pool-friendly.

use serde::{Deserialize, Serialize};

use crate::ai::AiState;
use crate::pool::Resettable;

/// Unique identifier for ships, bullets and effects.
///
/// All entity kinds draw from one counter in [`crate::state::GameState`], so
/// an id never refers to two live entities at once.
pub type EntityId = u64;

/// Identifier of a ship.
pub type ShipId = EntityId;

// ============================================================================
// Tags
// ============================================================================

/// Side a ship fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    /// Left-hand fleet.
    Red,
    /// Right-hand fleet.
    Blue,
}

impl Team {
    /// Every team, in a stable order.
    pub const ALL: [Team; 2] = [Team::Red, Team::Blue];

    /// Stable lowercase name, also used to derive the team's layout seed.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Team::Red => "red",
            Team::Blue => "blue",
        }
    }

    /// Fraction of field width where this team's base sits.
    #[must_use]
    pub const fn base_fraction(self) -> f64 {
        match self {
            Team::Red => 0.2,
            Team::Blue => 0.8,
        }
    }

    /// Heading a freshly spawned ship faces (toward the opposing base).
    #[must_use]
    pub const fn facing(self) -> f64 {
        match self {
            Team::Red => 0.0,
            Team::Blue => std::f64::consts::PI,
        }
    }
}

/// Ship hull type. Each type has a configuration entry with stats and mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipType {
    /// Small, fast, short-lived. Carriers launch these.
    Fighter,
    /// Light escort.
    Corvette,
    /// Line ship with a cannon and a turret.
    Frigate,
    /// Heavy gunship.
    Destroyer,
    /// Slow capital ship that launches fighters.
    Carrier,
}

impl ShipType {
    /// Every ship type, in a stable order.
    pub const ALL: [ShipType; 5] = [
        ShipType::Fighter,
        ShipType::Corvette,
        ShipType::Frigate,
        ShipType::Destroyer,
        ShipType::Carrier,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ShipType::Fighter => "fighter",
            ShipType::Corvette => "corvette",
            ShipType::Frigate => "frigate",
            ShipType::Destroyer => "destroyer",
            ShipType::Carrier => "carrier",
        }
    }
}

/// Hull size class. Supplies stat defaults a ship type may leave unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    /// Fighters.
    Small,
    /// Escorts and line ships.
    Medium,
    /// Capital ships.
    Large,
}

// ============================================================================
// Weapons
// ============================================================================

/// Ballistic parameters shared by every weapon mount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    /// Damage carried by each bullet.
    pub damage: f64,
    /// Shots per second. Cooldown after a shot is `1 / rate`.
    pub rate: f64,
    /// Bullet speed relative to the firing ship.
    pub muzzle_speed: f64,
    /// Bullet lifetime in seconds.
    pub bullet_ttl: f64,
    /// Bullet collision radius.
    pub bullet_radius: f64,
    /// Half-width of the random angular spread, radians.
    pub spread: f64,
    /// Effective range; the mount holds fire beyond it.
    pub range: f64,
}

impl WeaponStats {
    /// Seconds between shots.
    #[must_use]
    pub fn cooldown_period(&self) -> f64 {
        if self.rate > 0.0 {
            1.0 / self.rate
        } else {
            f64::INFINITY
        }
    }
}

/// How a turret picks what to shoot at, independently of the ship's AI target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurretTargeting {
    /// Closest enemy ship.
    #[default]
    Nearest,
    /// A random enemy, kept until it dies or leaves range.
    Random,
    /// The ship's own AI target, falling back to nearest.
    Focus,
}

/// Turret hardware class. Cosmetic for the core, carried for attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurretKind {
    /// Small rapid-fire mount.
    #[default]
    Light,
    /// Slow, heavy mount.
    Heavy,
    /// Short-range flak.
    Flak,
}

/// Fixed forward gun. Fires along the hull heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cannon {
    /// Ballistics.
    pub stats: WeaponStats,
    /// Seconds until the cannon may fire again.
    pub cooldown: f64,
    /// Maximum angle between heading and target for the cannon to fire.
    pub fire_arc: f64,
}

/// Independently aimed mount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Turret {
    /// Ballistics.
    pub stats: WeaponStats,
    /// Seconds until the turret may fire again.
    pub cooldown: f64,
    /// Mount offset in ship-local radius units (x forward, y left).
    pub offset_x: f64,
    /// See [`Turret::offset_x`].
    pub offset_y: f64,
    /// Hardware class.
    pub kind: TurretKind,
    /// Target selection mode.
    pub targeting: TurretTargeting,
    /// Current world-space aim angle.
    pub angle: f64,
    /// Desired world-space aim angle.
    pub target_angle: f64,
    /// Maximum aim rotation, radians per second.
    pub turn_rate: f64,
    /// Ship currently tracked, if any.
    pub target: Option<ShipId>,
}

/// A weapon mount on a ship.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weapon {
    /// Forward gun.
    Cannon(Cannon),
    /// Aimed mount.
    Turret(Turret),
}

impl Weapon {
    /// Ballistic stats of the mount.
    #[must_use]
    pub fn stats(&self) -> &WeaponStats {
        match self {
            Weapon::Cannon(c) => &c.stats,
            Weapon::Turret(t) => &t.stats,
        }
    }
}

// ============================================================================
// Ships
// ============================================================================

/// Carrier launch state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarrierState {
    /// Seconds until the next launch cycle.
    pub spawn_timer: f64,
}

/// A ship and everything the simulation knows about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    /// Unique id.
    pub id: ShipId,
    /// Owning team.
    pub team: Team,
    /// Hull type.
    pub ship_type: ShipType,
    /// Hull size class.
    pub size_class: SizeClass,

    /// World position.
    pub x: f64,
    /// World position.
    pub y: f64,
    /// Heading in radians, kept in `[-π, π]`.
    pub angle: f64,
    /// Velocity, units per second.
    pub vx: f64,
    /// Velocity, units per second.
    pub vy: f64,

    /// Throttle in `[0, 1]`.
    pub throttle: f64,
    /// Steering in `[-1, 1]`.
    pub steering: f64,

    /// Hull points, `0 <= hp <= max_hp`.
    pub hp: f64,
    /// Maximum hull points.
    pub max_hp: f64,
    /// Shield points, `0 <= shield <= max_shield`.
    pub shield: f64,
    /// Maximum shield points.
    pub max_shield: f64,
    /// Shield regeneration, points per second.
    pub shield_regen: f64,
    /// Armor rating. Each point removes 10% of post-shield damage.
    pub armor: f64,
    /// Forward acceleration at full throttle.
    pub accel: f64,
    /// Hull rotation rate at full steering, radians per second.
    pub turn_rate: f64,
    /// Speed cap.
    pub max_speed: f64,
    /// Collision radius.
    pub radius: f64,

    /// Weapon mounts.
    pub weapons: Vec<Weapon>,

    /// Experience toward the next level.
    pub xp: f64,
    /// Current level, starting at 1.
    pub level: u32,
    /// Ships destroyed by this ship.
    pub kills: u32,

    /// Cached `hp / max_hp`, refreshed at the end of each tick.
    pub hp_percent: f64,
    /// Cached `shield / max_shield`, refreshed at the end of each tick.
    pub shield_percent: f64,

    /// Launch state for carriers.
    pub carrier: Option<CarrierState>,
    /// Carrier that launched this ship.
    pub parent_id: Option<ShipId>,

    /// Decision state, created on first AI evaluation.
    pub ai: Option<AiState>,
}

impl Ship {
    /// Whether the ship is still in the fight.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Current speed.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    /// Refresh the cached hp/shield fractions.
    pub fn refresh_percentages(&mut self) {
        self.hp_percent = if self.max_hp > 0.0 {
            self.hp / self.max_hp
        } else {
            0.0
        };
        self.shield_percent = if self.max_shield > 0.0 {
            self.shield / self.max_shield
        } else {
            0.0
        };
    }

    /// World position of a turret mount.
    #[must_use]
    pub fn mount_position(&self, turret: &Turret) -> (f64, f64) {
        let (sin, cos) = self.angle.sin_cos();
        let lx = turret.offset_x * self.radius;
        let ly = turret.offset_y * self.radius;
        (self.x + lx * cos - ly * sin, self.y + lx * sin + ly * cos)
    }

    /// Longest weapon range on the ship, or `0` when unarmed.
    #[must_use]
    pub fn max_weapon_range(&self) -> f64 {
        self.weapons
            .iter()
            .map(|w| w.stats().range)
            .fold(0.0, f64::max)
    }
}

// ============================================================================
// Bullets
// ============================================================================

/// A projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    /// Unique id.
    pub id: EntityId,
    /// Team of the firing ship.
    pub team: Team,
    /// Firing ship, used for XP attribution.
    pub owner: Option<ShipId>,
    /// World position.
    pub x: f64,
    /// World position.
    pub y: f64,
    /// Velocity.
    pub vx: f64,
    /// Velocity.
    pub vy: f64,
    /// Damage on impact.
    pub damage: f64,
    /// Seconds left before the bullet expires.
    pub ttl: f64,
    /// Collision radius.
    pub radius: f64,
    /// Position at the start of the current tick, for the swept test.
    pub prev_x: f64,
    /// See [`Bullet::prev_x`].
    pub prev_y: f64,
}

/// Arguments for (re)initializing a pooled bullet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulletSpawn {
    /// Id to assign.
    pub id: EntityId,
    /// Team of the firing ship.
    pub team: Team,
    /// Firing ship.
    pub owner: Option<ShipId>,
    /// Start position.
    pub x: f64,
    /// Start position.
    pub y: f64,
    /// Velocity.
    pub vx: f64,
    /// Velocity.
    pub vy: f64,
    /// Damage on impact.
    pub damage: f64,
    /// Lifetime in seconds.
    pub ttl: f64,
    /// Collision radius.
    pub radius: f64,
}

impl Resettable for Bullet {
    type Init = BulletSpawn;

    fn create(init: BulletSpawn) -> Self {
        let mut bullet = Bullet {
            id: 0,
            team: init.team,
            owner: None,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            damage: 0.0,
            ttl: 0.0,
            radius: 0.0,
            prev_x: 0.0,
            prev_y: 0.0,
        };
        bullet.reset(init);
        bullet
    }

    fn reset(&mut self, init: BulletSpawn) {
        self.id = init.id;
        self.team = init.team;
        self.owner = init.owner;
        self.x = init.x;
        self.y = init.y;
        self.vx = init.vx;
        self.vy = init.vy;
        self.damage = init.damage;
        self.ttl = init.ttl;
        self.radius = init.radius;
        self.prev_x = init.x;
        self.prev_y = init.y;
    }

    fn pool_key(&self) -> u64 {
        self.id
    }
}

// ============================================================================
// Effects
// ============================================================================

/// Observational record: explosion, shield hit, hull hit or particle.
///
/// Effects never influence physics. They exist so the presentation layer can
/// read what happened this tick, and they are pooled like bullets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Unique id.
    pub id: EntityId,
    /// World position.
    pub x: f64,
    /// World position.
    pub y: f64,
    /// Drift velocity (particles only; zero otherwise).
    pub vx: f64,
    /// See [`Effect::vx`].
    pub vy: f64,
    /// Team the effect is attributed to.
    pub team: Team,
    /// Size or damage amount.
    pub magnitude: f64,
    /// Seconds remaining.
    pub life: f64,
    /// Total lifetime.
    pub ttl: f64,
}

impl Effect {
    /// Remaining life as a fraction of the total.
    #[must_use]
    pub fn life_fraction(&self) -> f64 {
        if self.ttl > 0.0 {
            (self.life / self.ttl).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Arguments for (re)initializing a pooled effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSpawn {
    /// Id to assign.
    pub id: EntityId,
    /// Position.
    pub x: f64,
    /// Position.
    pub y: f64,
    /// Drift velocity.
    pub vx: f64,
    /// Drift velocity.
    pub vy: f64,
    /// Attributed team.
    pub team: Team,
    /// Size or amount.
    pub magnitude: f64,
    /// Lifetime in seconds.
    pub ttl: f64,
}

impl Resettable for Effect {
    type Init = EffectSpawn;

    fn create(init: EffectSpawn) -> Self {
        let mut effect = Effect {
            id: 0,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            team: init.team,
            magnitude: 0.0,
            life: 0.0,
            ttl: 0.0,
        };
        effect.reset(init);
        effect
    }

    fn reset(&mut self, init: EffectSpawn) {
        self.id = init.id;
        self.x = init.x;
        self.y = init.y;
        self.vx = init.vx;
        self.vy = init.vy;
        self.team = init.team;
        self.magnitude = init.magnitude;
        self.life = init.ttl;
        self.ttl = init.ttl;
    }

    fn pool_key(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bullet_spawn(id: EntityId) -> BulletSpawn {
        BulletSpawn {
            id,
            team: Team::Red,
            owner: Some(3),
            x: 10.0,
            y: 20.0,
            vx: 100.0,
            vy: 0.0,
            damage: 5.0,
            ttl: 1.0,
            radius: 2.0,
        }
    }

    #[test]
    fn test_bullet_reset_clears_previous_flight() {
        let mut bullet = Bullet::create(bullet_spawn(1));
        bullet.x = 500.0;
        bullet.prev_x = 490.0;
        bullet.ttl = 0.0;

        bullet.reset(bullet_spawn(9));
        assert_eq!(bullet.id, 9);
        assert_eq!(bullet.x, 10.0);
        assert_eq!(bullet.prev_x, 10.0);
        assert_eq!(bullet.ttl, 1.0);
        assert_eq!(bullet.pool_key(), 9);
    }

    #[test]
    fn test_effect_life_fraction() {
        let mut effect = Effect::create(EffectSpawn {
            id: 1,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            team: Team::Blue,
            magnitude: 4.0,
            ttl: 0.5,
        });
        assert_eq!(effect.life_fraction(), 1.0);
        effect.life = 0.25;
        assert!((effect.life_fraction() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_team_names_are_stable() {
        assert_eq!(Team::Red.name(), "red");
        assert_eq!(Team::Blue.name(), "blue");
        assert!(Team::Red < Team::Blue);
    }

    #[test]
    fn test_weapon_cooldown_period() {
        let stats = WeaponStats {
            damage: 1.0,
            rate: 4.0,
            muzzle_speed: 1.0,
            bullet_ttl: 1.0,
            bullet_radius: 1.0,
            spread: 0.0,
            range: 1.0,
        };
        assert_eq!(stats.cooldown_period(), 0.25);
        let idle = WeaponStats { rate: 0.0, ..stats };
        assert!(idle.cooldown_period().is_infinite());
    }
}
