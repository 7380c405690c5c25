//! Test fixtures and helpers.
//!
//! Ship builders and pre-built battles for consistent testing.

use serde::{Deserialize, Serialize};

use fleet_core::ai::AiConfig;
use fleet_core::components::{
    Cannon, Ship, ShipId, ShipType, SizeClass, Team, Turret, TurretKind, TurretTargeting, Weapon,
    WeaponStats,
};
use fleet_core::config::SimConfig;
use fleet_core::simulation::{BulletRequest, ShipSpawn, Simulation};

// ============================================================================
// Ship builder
// ============================================================================

/// Builds a fully specified [`Ship`] without going through templates.
///
/// Defaults: a medium corvette at the origin with 100 hp, no shield, no
/// armor, no weapons and no AI state.
#[derive(Debug, Clone)]
pub struct ShipBuilder {
    ship: Ship,
}

impl ShipBuilder {
    /// Start a ship with the given identity.
    #[must_use]
    pub fn new(id: ShipId, team: Team) -> Self {
        Self {
            ship: Ship {
                id,
                team,
                ship_type: ShipType::Corvette,
                size_class: SizeClass::Medium,
                x: 0.0,
                y: 0.0,
                angle: team.facing(),
                vx: 0.0,
                vy: 0.0,
                throttle: 0.0,
                steering: 0.0,
                hp: 100.0,
                max_hp: 100.0,
                shield: 0.0,
                max_shield: 0.0,
                shield_regen: 0.0,
                armor: 0.0,
                accel: 100.0,
                turn_rate: 2.0,
                max_speed: 150.0,
                radius: 12.0,
                weapons: Vec::new(),
                xp: 0.0,
                level: 1,
                kills: 0,
                hp_percent: 1.0,
                shield_percent: 0.0,
                carrier: None,
                parent_id: None,
                ai: None,
            },
        }
    }

    /// Position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.ship.x = x;
        self.ship.y = y;
        self
    }

    /// Heading.
    #[must_use]
    pub fn facing(mut self, angle: f64) -> Self {
        self.ship.angle = angle;
        self
    }

    /// Velocity.
    #[must_use]
    pub fn moving(mut self, vx: f64, vy: f64) -> Self {
        self.ship.vx = vx;
        self.ship.vy = vy;
        self
    }

    /// Current and maximum hull.
    #[must_use]
    pub fn hp(mut self, hp: f64, max_hp: f64) -> Self {
        self.ship.hp = hp;
        self.ship.max_hp = max_hp;
        self
    }

    /// Current and maximum shield.
    #[must_use]
    pub fn shield(mut self, shield: f64, max_shield: f64) -> Self {
        self.ship.shield = shield;
        self.ship.max_shield = max_shield;
        self
    }

    /// Shield regeneration per second.
    #[must_use]
    pub fn regen(mut self, per_second: f64) -> Self {
        self.ship.shield_regen = per_second;
        self
    }

    /// Armor points.
    #[must_use]
    pub fn armor(mut self, armor: f64) -> Self {
        self.ship.armor = armor;
        self
    }

    /// Collision radius.
    #[must_use]
    pub fn radius(mut self, radius: f64) -> Self {
        self.ship.radius = radius;
        self
    }

    /// Kinematic limits.
    #[must_use]
    pub fn engine(mut self, accel: f64, turn_rate: f64, max_speed: f64) -> Self {
        self.ship.accel = accel;
        self.ship.turn_rate = turn_rate;
        self.ship.max_speed = max_speed;
        self
    }

    /// Hull type and size class.
    #[must_use]
    pub fn hull(mut self, ship_type: ShipType, size_class: SizeClass) -> Self {
        self.ship.ship_type = ship_type;
        self.ship.size_class = size_class;
        self
    }

    /// Add a forward cannon.
    #[must_use]
    pub fn cannon(mut self, stats: WeaponStats) -> Self {
        self.ship.weapons.push(Weapon::Cannon(Cannon {
            stats,
            cooldown: 0.0,
            fire_arc: 0.6,
        }));
        self
    }

    /// Add a turret at the hull center.
    #[must_use]
    pub fn turret(mut self, stats: WeaponStats, targeting: TurretTargeting) -> Self {
        let angle = self.ship.angle;
        self.ship.weapons.push(Weapon::Turret(Turret {
            stats,
            cooldown: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            kind: TurretKind::Light,
            targeting,
            angle,
            target_angle: angle,
            turn_rate: 3.0,
            target: None,
        }));
        self
    }

    /// Accumulated experience.
    #[must_use]
    pub fn xp(mut self, xp: f64) -> Self {
        self.ship.xp = xp;
        self
    }

    /// Finish the ship.
    #[must_use]
    pub fn build(mut self) -> Ship {
        self.ship.refresh_percentages();
        self.ship
    }
}

/// A mid-weight gun: 10 damage, 2 shots per second, 300 range, no spread.
#[must_use]
pub fn test_gun() -> WeaponStats {
    WeaponStats {
        damage: 10.0,
        rate: 2.0,
        muzzle_speed: 400.0,
        bullet_ttl: 1.5,
        bullet_radius: 2.0,
        spread: 0.0,
        range: 300.0,
    }
}

/// A stationary bullet request with no owner.
#[must_use]
pub fn test_bullet(team: Team, x: f64, y: f64, damage: f64) -> BulletRequest {
    BulletRequest {
        team,
        owner: None,
        x,
        y,
        vx: 0.0,
        vy: 0.0,
        damage,
        ttl: 1.0,
        radius: 2.0,
    }
}

// ============================================================================
// Battles
// ============================================================================

/// Configuration whose AI always engages: no evasion, re-decides often.
#[must_use]
pub fn aggressive_config() -> SimConfig {
    SimConfig {
        ai: AiConfig {
            evade_threshold: 0.0,
            evade_chance: 0.0,
            engage_chance: 1.0,
            decision_min: 0.1,
            decision_max: 0.2,
            ..AiConfig::default()
        },
        ..SimConfig::default()
    }
}

/// Two template frigates facing each other 200 units apart, always engaging.
///
/// # Panics
///
/// Panics if the default catalog lacks frigates.
#[must_use]
pub fn duel(seed: u32) -> Simulation {
    let mut sim = Simulation::new(aggressive_config(), seed).expect("valid config");
    let (cx, cy) = sim.config().bounds.center();
    sim.spawn_ship(ShipSpawn::new(ShipType::Frigate, Team::Red, cx - 100.0, cy))
        .expect("frigate template");
    sim.spawn_ship(ShipSpawn::new(ShipType::Frigate, Team::Blue, cx + 100.0, cy))
        .expect("frigate template");
    sim
}

/// A generated battle with roughly `ships_per_team` ships on each side,
/// keeping the default type proportions.
///
/// # Panics
///
/// Panics if the scaled configuration fails validation.
#[must_use]
pub fn skirmish(seed: u32, ships_per_team: u32) -> Simulation {
    let mut config = SimConfig::default();
    let base = config.fleet.ships_per_team().max(1);
    for count in config.fleet.counts.values_mut() {
        *count = (*count * ships_per_team).div_ceil(base);
    }
    config.fleet.spawn_radius *= f64::from(ships_per_team.max(1)).sqrt() / f64::from(base).sqrt();
    Simulation::with_initial_fleet(config, seed).expect("valid skirmish config")
}

// ============================================================================
// Scenarios
// ============================================================================

/// A hand-placed battle loaded from RON.
///
/// ```ron
/// (
///     seed: 1,
///     ticks: 120,
///     ships: [
///         (shipType: frigate, team: red, x: 800.0, y: 540.0),
///         (shipType: frigate, team: blue, x: 1100.0, y: 540.0),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Generator seed.
    pub seed: u32,
    /// Ticks the scenario is meant to run.
    #[serde(default)]
    pub ticks: u32,
    /// Ships to spawn, in order.
    pub ships: Vec<ShipSpawn>,
}

impl Scenario {
    /// Parse a scenario.
    ///
    /// # Errors
    ///
    /// Returns the RON error for malformed input.
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Build the simulation the scenario describes.
    ///
    /// # Errors
    ///
    /// Returns configuration or unknown-type errors from the core.
    pub fn build(&self, config: SimConfig) -> fleet_core::error::Result<Simulation> {
        let mut sim = Simulation::new(config, self.seed)?;
        for spawn in &self.ships {
            sim.spawn_ship(*spawn)?;
        }
        tracing::debug!(ships = self.ships.len(), seed = self.seed, "Scenario built");
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_percentages() {
        let ship = ShipBuilder::new(1, Team::Red).hp(50.0, 100.0).shield(5.0, 10.0).build();
        assert!((ship.hp_percent - 0.5).abs() < 1e-12);
        assert!((ship.shield_percent - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_duel_has_two_ships() {
        let sim = duel(1);
        assert_eq!(sim.state().team_count(Team::Red), 1);
        assert_eq!(sim.state().team_count(Team::Blue), 1);
    }

    #[test]
    fn test_skirmish_scales() {
        let sim = skirmish(1, 50);
        assert!(sim.state().team_count(Team::Red) >= 50);
        assert!(sim.state().team_count(Team::Blue) >= 50);
    }

    #[test]
    fn test_scenario_from_ron() {
        let text = r"(
            seed: 3,
            ticks: 10,
            ships: [
                (shipType: corvette, team: red, x: 100.0, y: 100.0),
                (shipType: corvette, team: blue, x: 400.0, y: 100.0, angle: Some(1.0)),
            ],
        )";
        let scenario = Scenario::from_ron(text).unwrap();
        let sim = scenario.build(SimConfig::default()).unwrap();
        assert_eq!(sim.state().ships.len(), 2);
        assert_eq!(sim.state().ships[1].angle, 1.0);
    }
}
