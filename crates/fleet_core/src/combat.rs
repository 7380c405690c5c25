//! Shield/armor/hull damage pipeline and level progression.
//!
//! This module implements:
//! - Shield-first absorption, then armor-attenuated hull damage
//! - XP attribution for damage dealt and kills
//! - Multi-level progression with diminishing per-level stat scalars
//! - Passive shield regeneration
//!
//! # Damage formula
//!
//! ```text
//! absorbed  = min(shield, damage)
//! remainder = damage - absorbed
//! dealt     = floor(remainder × clamp(1 - 0.1 × armor, 0, 1))
//! ```
//!
//! The armor multiplier is clamped so very high armor values cannot turn
//! hits into healing.

use serde::{Deserialize, Serialize};

use crate::components::{Ship, Weapon};

/// Fraction of post-shield damage removed per armor point.
pub const ARMOR_REDUCTION_PER_POINT: f64 = 0.1;

/// Progression curve and XP awards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// XP needed to leave level 1.
    pub xp_base: f64,
    /// Growth factor of the XP requirement per level.
    pub xp_growth: f64,
    /// XP granted per point of damage dealt (shield plus hull).
    pub xp_per_damage: f64,
    /// Flat XP granted for a kill.
    pub kill_xp: f64,
    /// Max/current hp boost on the first level-up.
    pub hp_percent: f64,
    /// Max/current shield boost on the first level-up.
    pub shield_percent: f64,
    /// Cannon damage boost on the first level-up.
    pub damage_percent: f64,
    /// Acceleration boost on the first level-up.
    pub accel_percent: f64,
    /// Shield regeneration boost on the first level-up.
    pub regen_percent: f64,
    /// Multiplier applied to every percent for each further level.
    pub percent_decay: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            xp_base: 100.0,
            xp_growth: 1.25,
            xp_per_damage: 1.0,
            kill_xp: 50.0,
            hp_percent: 0.10,
            shield_percent: 0.08,
            damage_percent: 0.06,
            accel_percent: 0.03,
            regen_percent: 0.05,
            percent_decay: 0.9,
        }
    }
}

impl ProgressionConfig {
    /// XP required to advance from `level` to `level + 1`.
    ///
    /// `xp_base × xp_growth^(level − 1)`.
    #[must_use]
    pub fn xp_to_level(&self, level: u32) -> f64 {
        let exponent = level.saturating_sub(1).min(i32::MAX as u32) as i32;
        self.xp_base * self.xp_growth.powi(exponent)
    }

    /// Scale a first-level percent down for the level being reached.
    ///
    /// Reaching level 2 applies `base`; each later level multiplies by
    /// `percent_decay` once more.
    #[must_use]
    pub fn percent_at(&self, base: f64, new_level: u32) -> f64 {
        let exponent = new_level.saturating_sub(2).min(i32::MAX as u32) as i32;
        base * self.percent_decay.powi(exponent)
    }
}

/// Result of one bullet striking one ship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HitOutcome {
    /// Damage taken by the shield.
    pub shield_absorbed: f64,
    /// Damage taken by the hull, after armor.
    pub hull_dealt: f64,
    /// Whether this hit brought hp to zero.
    pub killed: bool,
}

impl HitOutcome {
    /// Shield plus hull damage.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.shield_absorbed + self.hull_dealt
    }
}

/// Fraction of post-shield damage that reaches the hull.
#[must_use]
pub fn armor_multiplier(armor: f64) -> f64 {
    (1.0 - ARMOR_REDUCTION_PER_POINT * armor).clamp(0.0, 1.0)
}

/// Apply `damage` to `ship`: shield first, then armor-reduced hull damage.
///
/// Keeps `0 <= shield <= max_shield` and `0 <= hp <= max_hp`. Damage to a
/// ship that is already dead is ignored.
pub fn apply_damage(ship: &mut Ship, damage: f64) -> HitOutcome {
    if damage.is_nan() || damage <= 0.0 || !ship.is_alive() {
        return HitOutcome::default();
    }

    let shield_absorbed = ship.shield.max(0.0).min(damage);
    ship.shield -= shield_absorbed;

    let remainder = damage - shield_absorbed;
    let attenuated = (remainder * armor_multiplier(ship.armor)).floor();
    let hull_dealt = attenuated.min(ship.hp).max(0.0);
    ship.hp -= hull_dealt;

    HitOutcome {
        shield_absorbed,
        hull_dealt,
        killed: ship.hp <= 0.0,
    }
}

/// Grant XP and resolve every level it buys.
///
/// Returns the number of levels gained. Stat scalars are applied exactly
/// once per level, in order, so one huge award can raise several levels.
pub fn grant_xp(ship: &mut Ship, amount: f64, config: &ProgressionConfig) -> u32 {
    if amount.is_nan() || amount <= 0.0 {
        return 0;
    }
    ship.xp += amount;

    let mut gained = 0;
    loop {
        let threshold = config.xp_to_level(ship.level);
        if threshold.is_nan() || threshold <= 0.0 || ship.xp < threshold {
            break;
        }
        ship.xp -= threshold;
        ship.level += 1;
        apply_level_scalars(ship, ship.level, config);
        gained += 1;
    }
    gained
}

/// Multiply leveled stats for reaching `new_level`.
pub fn apply_level_scalars(ship: &mut Ship, new_level: u32, config: &ProgressionConfig) {
    let hp = 1.0 + config.percent_at(config.hp_percent, new_level);
    let shield = 1.0 + config.percent_at(config.shield_percent, new_level);
    let damage = 1.0 + config.percent_at(config.damage_percent, new_level);
    let accel = 1.0 + config.percent_at(config.accel_percent, new_level);
    let regen = 1.0 + config.percent_at(config.regen_percent, new_level);

    ship.max_hp *= hp;
    ship.hp = (ship.hp * hp).min(ship.max_hp);
    ship.max_shield *= shield;
    ship.shield = (ship.shield * shield).min(ship.max_shield);
    ship.accel *= accel;
    ship.shield_regen *= regen;

    for weapon in &mut ship.weapons {
        if let Weapon::Cannon(cannon) = weapon {
            cannon.stats.damage *= damage;
        }
    }
}

/// Regenerate shield for `dt` seconds, capped at the maximum.
pub fn regen_shield(ship: &mut Ship, dt: f64) {
    if ship.shield_regen > 0.0 && ship.shield < ship.max_shield {
        ship.shield = (ship.shield + ship.shield_regen * dt).min(ship.max_shield);
    }
}
