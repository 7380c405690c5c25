//! Per-ship decision state machine and weapon target selection.
//!
//! Each ship carries an [`AiState`] with one of three behaviors:
//!
//! - **Engage**: full throttle, steer toward the target, fire when lined up.
//! - **Evade**: reduced throttle, steer directly away from the target.
//! - **Idle**: drift with zero throttle and steering.
//!
//! Behaviors are re-sampled on a jittered timer rather than every tick, so
//! ships do not thrash between states and decision cost is spread across
//! ticks. Every roll goes through the simulation's [`Generator`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::components::{Ship, ShipId, Team, Turret, TurretTargeting};
use crate::error::{Result, SimError};
use crate::math::{angle_diff, bearing, distance_squared, wrap_angle};
use crate::rng::Generator;

/// Current high-level behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    /// No throttle, no steering.
    #[default]
    Idle,
    /// Close on the target and fire.
    Engage,
    /// Turn away from the target.
    Evade,
}

/// Decision state for one ship. Created on first evaluation with an expired
/// timer, so the first tick always samples a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AiState {
    /// Active behavior.
    pub behavior: Behavior,
    /// Seconds until the behavior is re-sampled.
    pub timer: f64,
    /// Remembered target.
    pub target: Option<ShipId>,
}

/// Tuning for the decision process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Below this hp fraction a ship always evades.
    pub evade_threshold: f64,
    /// Probability of evading regardless of health.
    pub evade_chance: f64,
    /// Probability of engaging when not evading.
    pub engage_chance: f64,
    /// Shortest decision interval, seconds.
    pub decision_min: f64,
    /// Longest decision interval, seconds.
    pub decision_max: f64,
    /// Throttle while evading.
    pub evade_throttle: f64,
    /// Steering per radian of heading error, before clamping to `[-1, 1]`.
    pub steering_gain: f64,
    /// Largest turret aim error at which a turret fires, radians.
    pub aim_tolerance: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            evade_threshold: 0.25,
            evade_chance: 0.1,
            engage_chance: 0.8,
            decision_min: 0.5,
            decision_max: 1.5,
            evade_throttle: 0.6,
            steering_gain: 2.0,
            aim_tolerance: 0.25,
        }
    }
}

impl AiConfig {
    /// Check ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] for probabilities outside `[0, 1]`
    /// or an inverted or negative decision interval.
    pub fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("evade_threshold", self.evade_threshold),
            ("evade_chance", self.evade_chance),
            ("engage_chance", self.engage_chance),
            ("evade_throttle", self.evade_throttle),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::InvalidConfig(format!(
                    "ai.{name} must be in [0, 1], got {p}"
                )));
            }
        }
        if !(self.decision_min >= 0.0 && self.decision_max >= self.decision_min) {
            return Err(SimError::InvalidConfig(format!(
                "ai decision interval [{}, {}] is invalid",
                self.decision_min, self.decision_max
            )));
        }
        if !(self.steering_gain.is_finite() && self.aim_tolerance >= 0.0) {
            return Err(SimError::InvalidConfig(
                "ai steering_gain and aim_tolerance must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// What the AI wants the ship's cannons to do this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireSolution {
    /// Index of the target in the ship list.
    pub target_index: usize,
    /// Distance to the target.
    pub distance: f64,
    /// Signed angle between heading and the target bearing.
    pub heading_error: f64,
}

/// Run one AI evaluation for `ships[idx]`, setting its throttle and
/// steering.
///
/// Returns a fire solution when the ship is engaging a live target. The
/// caller decides per mount whether range and arc allow a shot.
pub fn think(
    idx: usize,
    ships: &mut [Ship],
    index: &HashMap<ShipId, usize>,
    rng: &mut Generator,
    config: &AiConfig,
    dt: f64,
    scratch: &mut Vec<usize>,
) -> Option<FireSolution> {
    if !ships.get(idx).is_some_and(Ship::is_alive) {
        return None;
    }
    let mut ai = ships[idx].ai.take().unwrap_or_default();

    let target_index = retain_or_pick_target(idx, ai.target, ships, index, rng, scratch);
    ai.target = target_index.map(|t| ships[t].id);

    ai.timer -= dt;
    if ai.timer <= 0.0 {
        let previous = ai.behavior;
        ai.behavior = sample_behavior(&ships[idx], rng, config);
        ai.timer = rng.range(config.decision_min, config.decision_max);
        if ai.behavior != previous {
            tracing::trace!(
                ship = ships[idx].id,
                from = ?previous,
                to = ?ai.behavior,
                "AI behavior change"
            );
        }
    }

    let ship = &ships[idx];
    let aim = target_index.map(|t| {
        let target = &ships[t];
        let heading = bearing(ship.x, ship.y, target.x, target.y);
        let distance = distance_squared(ship.x, ship.y, target.x, target.y).sqrt();
        (t, heading, distance)
    });

    let (throttle, steering, solution) = match (ai.behavior, aim) {
        (Behavior::Engage, Some((t, heading, distance))) => {
            let error = angle_diff(ship.angle, heading);
            let steering = (error * config.steering_gain).clamp(-1.0, 1.0);
            let solution = FireSolution {
                target_index: t,
                distance,
                heading_error: error,
            };
            (1.0, steering, Some(solution))
        }
        (Behavior::Evade, Some((_, heading, _))) => {
            let away = wrap_angle(heading + std::f64::consts::PI);
            let error = angle_diff(ship.angle, away);
            let steering = (error * config.steering_gain).clamp(-1.0, 1.0);
            (config.evade_throttle, steering, None)
        }
        (Behavior::Evade, None) => (config.evade_throttle, 0.0, None),
        _ => (0.0, 0.0, None),
    };

    let ship = &mut ships[idx];
    ship.throttle = throttle;
    ship.steering = steering;
    ship.ai = Some(ai);
    solution
}

fn sample_behavior(ship: &Ship, rng: &mut Generator, config: &AiConfig) -> Behavior {
    let health = if ship.max_hp > 0.0 {
        ship.hp / ship.max_hp
    } else {
        0.0
    };
    if health < config.evade_threshold || rng.chance(config.evade_chance) {
        Behavior::Evade
    } else if rng.chance(config.engage_chance) {
        Behavior::Engage
    } else {
        Behavior::Idle
    }
}

/// Keep `remembered` if it is still a live enemy, otherwise pick a random
/// live enemy.
fn retain_or_pick_target(
    idx: usize,
    remembered: Option<ShipId>,
    ships: &[Ship],
    index: &HashMap<ShipId, usize>,
    rng: &mut Generator,
    scratch: &mut Vec<usize>,
) -> Option<usize> {
    let team = ships[idx].team;
    if let Some(t) = remembered.and_then(|id| index.get(&id).copied()) {
        if ships.get(t).is_some_and(|s| s.is_alive() && s.team != team) {
            return Some(t);
        }
    }

    scratch.clear();
    scratch.extend(
        ships
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_alive() && s.team != team)
            .map(|(i, _)| i),
    );
    rng.pick(scratch).copied()
}

// ============================================================================
// Weapons
// ============================================================================

/// Whether a cannon with `range` and `fire_arc` may shoot at the target
/// described by `solution`.
#[must_use]
pub fn cannon_has_shot(solution: &FireSolution, range: f64, fire_arc: f64) -> bool {
    solution.distance <= range && solution.heading_error.abs() <= fire_arc
}

/// Index of the closest live enemy of `team` to `(x, y)`.
///
/// Ties keep the lower index.
#[must_use]
pub fn nearest_enemy(ships: &[Ship], team: Team, x: f64, y: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, ship) in ships.iter().enumerate() {
        if ship.team == team || !ship.is_alive() {
            continue;
        }
        let d = distance_squared(x, y, ship.x, ship.y);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Pick what `turret` on `ships[owner]` should track, by its targeting mode.
///
/// - `Nearest`: the closest live enemy.
/// - `Random`: the turret's previous target while it lives and stays in
///   range, otherwise a random live enemy in range.
/// - `Focus`: the owner's AI target, falling back to nearest.
pub fn select_turret_target(
    turret: &Turret,
    owner: usize,
    ships: &[Ship],
    index: &HashMap<ShipId, usize>,
    rng: &mut Generator,
    scratch: &mut Vec<usize>,
) -> Option<usize> {
    let ship = &ships[owner];
    let (mx, my) = ship.mount_position(turret);
    let live_enemy = |i: usize| ships.get(i).is_some_and(|s| s.is_alive() && s.team != ship.team);

    match turret.targeting {
        TurretTargeting::Nearest => nearest_enemy(ships, ship.team, mx, my),
        TurretTargeting::Focus => ship
            .ai
            .and_then(|ai| ai.target)
            .and_then(|id| index.get(&id).copied())
            .filter(|&i| live_enemy(i))
            .or_else(|| nearest_enemy(ships, ship.team, mx, my)),
        TurretTargeting::Random => {
            let range_sq = turret.stats.range * turret.stats.range;
            let in_range = |i: usize| {
                live_enemy(i) && distance_squared(mx, my, ships[i].x, ships[i].y) <= range_sq
            };
            if let Some(i) = turret.target.and_then(|id| index.get(&id).copied()) {
                if in_range(i) {
                    return Some(i);
                }
            }
            scratch.clear();
            scratch.extend((0..ships.len()).filter(|&i| in_range(i)));
            rng.pick(scratch).copied()
        }
    }
}

/// Rotate a turret toward its desired angle, limited by its turn rate.
pub fn aim_turret(turret: &mut Turret, dt: f64) {
    let error = angle_diff(turret.angle, turret.target_angle);
    let max_step = turret.turn_rate.max(0.0) * dt;
    turret.angle = wrap_angle(turret.angle + error.clamp(-max_step, max_step));
}
