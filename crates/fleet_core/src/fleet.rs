//! Initial fleet layout and reinforcement planning.
//!
//! Both produce [`SpawnOrder`]s rather than ships. The caller turns orders
//! into ships, so the planners stay free of side effects and can be tested
//! without a running simulation.
//!
//! Each team's initial layout draws from its own generator seeded with
//! `base_seed + hash(team name)`, so one team's layout does not depend on
//! how many draws the other team's layout took.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::components::{ShipType, Team};
use crate::config::Bounds;
use crate::error::{Result, SimError};
use crate::rng::{hash_label, Generator};

/// A ship the caller should create.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnOrder {
    /// Owning team.
    pub team: Team,
    /// Hull type.
    pub ship_type: ShipType,
    /// Position.
    pub x: f64,
    /// Position.
    pub y: f64,
    /// Heading.
    pub angle: f64,
}

/// Initial fleet composition and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Ships per type, for each team.
    pub counts: BTreeMap<ShipType, u32>,
    /// Radius of the placement disk around the team base.
    pub spawn_radius: f64,
    /// Base x jitter as a fraction of field width (0.02 puts bases in
    /// 18–22% and 78–82%).
    pub base_jitter: f64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            counts: BTreeMap::from([
                (ShipType::Fighter, 8),
                (ShipType::Corvette, 4),
                (ShipType::Frigate, 3),
                (ShipType::Destroyer, 2),
                (ShipType::Carrier, 1),
            ]),
            spawn_radius: 140.0,
            base_jitter: 0.02,
        }
    }
}

impl FleetConfig {
    /// Check ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] for a negative radius or jitter.
    pub fn validate(&self) -> Result<()> {
        if !(self.spawn_radius >= 0.0 && self.base_jitter >= 0.0 && self.base_jitter < 0.2) {
            return Err(SimError::InvalidConfig(
                "fleet.spawn_radius must be >= 0 and fleet.base_jitter in [0, 0.2)".into(),
            ));
        }
        Ok(())
    }

    /// Ships per team.
    #[must_use]
    pub fn ships_per_team(&self) -> u32 {
        self.counts.values().sum()
    }
}

/// Continuous reinforcement tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReinforcementConfig {
    /// Seconds between reinforcement checks.
    pub interval: f64,
    /// A team is reinforced when its strength share is below
    /// `0.5 - score_margin`.
    pub score_margin: f64,
    /// Most orders produced per check.
    pub per_tick: u32,
    /// Position jitter around the team base.
    pub jitter: f64,
    /// Relative weight of each hull type.
    pub mix: BTreeMap<ShipType, f64>,
}

impl Default for ReinforcementConfig {
    fn default() -> Self {
        Self {
            interval: 5.0,
            score_margin: 0.12,
            per_tick: 2,
            jitter: 80.0,
            mix: BTreeMap::from([
                (ShipType::Fighter, 0.35),
                (ShipType::Corvette, 0.25),
                (ShipType::Frigate, 0.2),
                (ShipType::Destroyer, 0.15),
                (ShipType::Carrier, 0.05),
            ]),
        }
    }
}

impl ReinforcementConfig {
    /// Check ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] for a non-positive interval, a
    /// margin outside `[0, 0.5]`, or a mix with no positive weight.
    pub fn validate(&self) -> Result<()> {
        if !(self.interval.is_finite() && self.interval > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "reinforcement.interval must be positive, got {}",
                self.interval
            )));
        }
        if !(0.0..=0.5).contains(&self.score_margin) {
            return Err(SimError::InvalidConfig(format!(
                "reinforcement.score_margin must be in [0, 0.5], got {}",
                self.score_margin
            )));
        }
        if !self.mix.values().any(|w| *w > 0.0) {
            return Err(SimError::InvalidConfig(
                "reinforcement.mix needs at least one positive weight".into(),
            ));
        }
        Ok(())
    }
}

/// Seed for a team's layout generator.
#[must_use]
pub fn team_seed(base_seed: u32, team: Team) -> u32 {
    base_seed.wrapping_add(hash_label(team.name()))
}

/// Nominal base point of a team: its side fraction of the width, centered
/// vertically.
#[must_use]
pub fn team_base(team: Team, bounds: &Bounds) -> (f64, f64) {
    (bounds.width * team.base_fraction(), bounds.height * 0.5)
}

fn clamp_to(bounds: &Bounds, x: f64, y: f64) -> (f64, f64) {
    (x.clamp(0.0, bounds.width), y.clamp(0.0, bounds.height))
}

/// Lay out every team's starting fleet.
///
/// Ships are placed uniformly in a disk around a jittered base point and
/// face the enemy side. Teams are laid out in [`Team::ALL`] order, but each
/// uses its own generator, so the result per team is independent of order.
#[must_use]
pub fn generate_initial_fleet(base_seed: u32, bounds: &Bounds, config: &FleetConfig) -> Vec<SpawnOrder> {
    let mut orders = Vec::with_capacity(config.ships_per_team() as usize * Team::ALL.len());
    for team in Team::ALL {
        let mut rng = Generator::new(team_seed(base_seed, team));
        let (nominal_x, base_y) = team_base(team, bounds);
        let base_x = nominal_x + rng.jitter(config.base_jitter) * bounds.width;

        for (&ship_type, &count) in &config.counts {
            for _ in 0..count {
                let r = config.spawn_radius * rng.next().sqrt();
                let theta = rng.range(0.0, TAU);
                let (x, y) = clamp_to(bounds, base_x + r * theta.cos(), base_y + r * theta.sin());
                orders.push(SpawnOrder {
                    team,
                    ship_type,
                    x,
                    y,
                    angle: team.facing(),
                });
            }
        }
    }
    orders
}

/// Decide which team, if any, needs reinforcing.
///
/// Returns the weakest team when its share of total strength is below
/// `0.5 - score_margin`. Ties go to the team listed first.
#[must_use]
pub fn weakest_team(strengths: &BTreeMap<Team, f64>, score_margin: f64) -> Option<Team> {
    let total: f64 = strengths.values().filter(|s| s.is_finite()).sum();
    if total <= 0.0 {
        return None;
    }
    let (&team, &strength) = strengths
        .iter()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    (strength / total < 0.5 - score_margin).then_some(team)
}

/// Produce reinforcement orders for the weakest team, if it qualifies.
///
/// Emits between 1 and `per_tick` orders. Types are drawn from the
/// configured mix; positions are jittered around the team base.
pub fn plan_reinforcements(
    strengths: &BTreeMap<Team, f64>,
    bounds: &Bounds,
    config: &ReinforcementConfig,
    rng: &mut Generator,
) -> Vec<SpawnOrder> {
    let Some(team) = weakest_team(strengths, config.score_margin) else {
        return Vec::new();
    };

    let types: Vec<ShipType> = config.mix.keys().copied().collect();
    let weights: Vec<f64> = config.mix.values().copied().collect();
    let count = rng.int_range(1, i64::from(config.per_tick.max(1)));
    let (base_x, base_y) = team_base(team, bounds);

    let mut orders = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let Some(pick) = rng.weighted_index(&weights) else {
            break;
        };
        let (x, y) = clamp_to(
            bounds,
            base_x + rng.jitter(config.jitter),
            base_y + rng.jitter(config.jitter),
        );
        orders.push(SpawnOrder {
            team,
            ship_type: types[pick],
            x,
            y,
            angle: team.facing(),
        });
    }
    orders
}

/// Interval timer for reinforcement checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reinforcer {
    elapsed: f64,
}

impl Reinforcer {
    /// Create a timer at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `dt`; returns `true` each time `interval` elapses.
    pub fn tick(&mut self, dt: f64, interval: f64) -> bool {
        self.elapsed += dt;
        if interval > 0.0 && self.elapsed >= interval {
            self.elapsed -= interval;
            true
        } else {
            false
        }
    }

    /// Restart the interval.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}
