//! Tick systems.
//!
//! Each system is a free function over [`GameState`] plus a
//! [`SystemContext`] carrying the configuration, the generator, pools and
//! scratch buffers. [`crate::simulation::Simulation::step`] runs them in a
//! fixed order:
//!
//! 1. [`prune_system`]: expire bullets and effects, returning them to pools
//! 2. [`ai_system`] and [`movement_system`]: decisions, cannon triggers,
//!    ship and bullet integration, boundary policies
//! 3. [`turret_system`]: turret target selection and aim tracking, then
//!    [`fire_system`] turns queued shots into pooled bullets
//! 4. [`carrier_system`]: fighter launches
//! 5. [`collision_system`]: broad phase, swept hit tests, damage, XP, deaths
//! 6. [`regen_system`]: shield regeneration and cached percentages
//!
//! Systems never allocate per entity in steady state: intermediate lists
//! live in [`Scratch`] and are cleared, not dropped, between ticks.

use std::collections::{BTreeMap, HashMap};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::ai::{self, FireSolution};
use crate::combat::{apply_damage, grant_xp, regen_shield};
use crate::components::{
    BulletSpawn, EffectSpawn, EntityId, Ship, ShipId, ShipType, Team, Weapon, WeaponStats,
};
use crate::config::{Bounds, BoundaryMode, ShipTemplate, SimConfig};
use crate::error::Result;
use crate::math::{
    angle_diff, bearing, circles_overlap, distance_squared, segment_intersects_circle, wrap_angle,
};
use crate::pool::{EntityKind, Pools};
use crate::rng::Generator;
use crate::simulation::{DamageEvent, KillEvent, LevelUpEvent, TickEvents};
use crate::spatial::GridPool;
use crate::state::GameState;

/// A shot queued by a weapon, turned into a bullet by [`fire_system`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    /// Firing team.
    pub team: Team,
    /// Firing ship.
    pub owner: ShipId,
    /// Muzzle position.
    pub x: f64,
    /// Muzzle position.
    pub y: f64,
    /// Firing direction before spread.
    pub angle: f64,
    /// Velocity of the firing ship, inherited by the bullet.
    pub vx: f64,
    /// See [`Shot::vx`].
    pub vy: f64,
    /// Ballistics of the mount.
    pub stats: WeaponStats,
}

#[derive(Debug, Clone, Copy)]
struct Launch {
    parent: ShipId,
    team: Team,
    x: f64,
    y: f64,
    angle: f64,
    vx: f64,
    vy: f64,
}

/// Reusable per-tick buffers.
#[derive(Debug, Clone, Default)]
pub struct Scratch {
    candidates: Vec<usize>,
    targets: Vec<usize>,
    solutions: Vec<Option<FireSolution>>,
    shots: Vec<Shot>,
    bullet_hits: Vec<bool>,
    removals: Vec<ShipId>,
    census: HashMap<ShipId, u32>,
    launches: Vec<Launch>,
}

/// Everything a system may touch besides the state itself.
pub struct SystemContext<'a> {
    /// Validated configuration.
    pub config: &'a SimConfig,
    /// Resolved ship types.
    pub templates: &'a BTreeMap<ShipType, ShipTemplate>,
    /// The simulation's only random source.
    pub rng: &'a mut Generator,
    /// Bullet and effect pools.
    pub pools: &'a mut Pools,
    /// Broad-phase grids.
    pub grids: &'a mut GridPool,
    /// Reusable buffers.
    pub scratch: &'a mut Scratch,
    /// Observations recorded this tick.
    pub events: &'a mut TickEvents,
}

// ============================================================================
// 1. Pruning
// ============================================================================

/// Drop expired or escaped bullets and decay effects, releasing each to its
/// pool.
///
/// Bullets leave when `ttl <= 0`, or when they are outside the bounds under
/// [`BoundaryMode::Remove`]. Effects age by `dt`, drift, and leave when
/// their life runs out.
pub fn prune_system(state: &mut GameState, ctx: &mut SystemContext<'_>, dt: f64) {
    let bounds = ctx.config.bounds;
    let remove_escaped = ctx.config.boundary.bullets == BoundaryMode::Remove;
    let bullet_pool = &mut ctx.pools.bullets;
    state.bullets.retain(|b| {
        let keep = b.ttl > 0.0 && !(remove_escaped && !bounds.contains(b.x, b.y));
        if !keep {
            bullet_pool.release(*b);
        }
        keep
    });

    for kind in EntityKind::EFFECTS {
        let pool = ctx.pools.effects_mut(kind);
        state.effects_mut(kind).retain_mut(|e| {
            e.life -= dt;
            e.x += e.vx * dt;
            e.y += e.vy * dt;
            if e.life > 0.0 {
                true
            } else {
                pool.release(*e);
                false
            }
        });
    }
}

// ============================================================================
// 2. AI, cannons and movement
// ============================================================================

/// Evaluate every ship's AI and queue cannon shots.
///
/// Cannon cooldowns tick down every step. A cannon fires when it is ready,
/// the AI is engaging, and the target sits inside the cannon's range and
/// fire arc.
pub fn ai_system(state: &mut GameState, ctx: &mut SystemContext<'_>, dt: f64) {
    let scratch = &mut *ctx.scratch;
    let (ships, index) = state.ships_with_index();

    scratch.solutions.clear();
    for idx in 0..ships.len() {
        let solution = ai::think(
            idx,
            ships,
            index,
            ctx.rng,
            &ctx.config.ai,
            dt,
            &mut scratch.targets,
        );
        scratch.solutions.push(solution);
    }

    for (ship, solution) in ships.iter_mut().zip(&scratch.solutions) {
        let (sin, cos) = ship.angle.sin_cos();
        for weapon in &mut ship.weapons {
            let Weapon::Cannon(cannon) = weapon else {
                continue;
            };
            cannon.cooldown = (cannon.cooldown - dt).max(0.0);
            let ready = cannon.cooldown <= 0.0 && cannon.stats.rate > 0.0;
            let has_shot = solution
                .as_ref()
                .is_some_and(|s| ai::cannon_has_shot(s, cannon.stats.range, cannon.fire_arc));
            if ready && has_shot {
                cannon.cooldown = cannon.stats.cooldown_period();
                let muzzle = ship.radius + cannon.stats.bullet_radius;
                scratch.shots.push(Shot {
                    team: ship.team,
                    owner: ship.id,
                    x: ship.x + cos * muzzle,
                    y: ship.y + sin * muzzle,
                    angle: ship.angle,
                    vx: ship.vx,
                    vy: ship.vy,
                    stats: cannon.stats,
                });
            }
        }
    }
}

/// Integrate ships and bullets, then apply boundary policies.
///
/// Ships rotate by `turn_rate × steering × dt`, accelerate along their
/// heading, lose speed to friction (`friction^(dt × 60)`), are capped at
/// `max_speed` and move. Ships removed by [`BoundaryMode::Remove`] are
/// deleted here without an explosion. Bullets cache their previous position
/// for the swept hit test, move, and lose `dt` of life.
pub fn movement_system(state: &mut GameState, ctx: &mut SystemContext<'_>, dt: f64) {
    let config = ctx.config;
    let damping = config.friction.powf(dt * 60.0);
    let removals = &mut ctx.scratch.removals;
    removals.clear();

    for ship in &mut state.ships {
        integrate_ship(ship, dt, damping);
        if !apply_ship_boundary(ship, &config.bounds, config.boundary.ships) {
            removals.push(ship.id);
        }
    }
    for &id in removals.iter() {
        if state.remove_ship(id).is_some() {
            tracing::debug!(ship = id, "Ship left the field");
            ctx.events.departed.push(id);
        }
    }

    for bullet in &mut state.bullets {
        bullet.prev_x = bullet.x;
        bullet.prev_y = bullet.y;
        bullet.x += bullet.vx * dt;
        bullet.y += bullet.vy * dt;
        bullet.ttl -= dt;
        match config.boundary.bullets {
            BoundaryMode::Wrap => {
                if wrap_position(&mut bullet.x, &mut bullet.y, &config.bounds) {
                    bullet.prev_x = bullet.x;
                    bullet.prev_y = bullet.y;
                }
            }
            BoundaryMode::Bounce => {
                bounce_axis(&mut bullet.x, &mut bullet.vx, 0.0, config.bounds.width);
                bounce_axis(&mut bullet.y, &mut bullet.vy, 0.0, config.bounds.height);
            }
            BoundaryMode::Remove => {}
        }
    }
}

/// Advance one ship's heading, velocity and position.
pub fn integrate_ship(ship: &mut Ship, dt: f64, damping: f64) {
    let steering = ship.steering.clamp(-1.0, 1.0);
    ship.angle = wrap_angle(ship.angle + ship.turn_rate * steering * dt);

    let thrust = ship.accel * ship.throttle.clamp(0.0, 1.0) * dt;
    let (sin, cos) = ship.angle.sin_cos();
    ship.vx = (ship.vx + cos * thrust) * damping;
    ship.vy = (ship.vy + sin * thrust) * damping;

    let speed = ship.speed();
    if speed > ship.max_speed && speed > 0.0 {
        let scale = ship.max_speed / speed;
        ship.vx *= scale;
        ship.vy *= scale;
    }

    ship.x += ship.vx * dt;
    ship.y += ship.vy * dt;
}

/// Apply a boundary policy to a ship. Returns `false` if the ship should be
/// removed.
///
/// - `Wrap` moves the ship to the opposite edge, velocity unchanged.
/// - `Remove` keeps the ship until it is past an edge by more than its
///   radius.
/// - `Bounce` clamps the position into the field and turns the crossing
///   velocity component back inward.
pub fn apply_ship_boundary(ship: &mut Ship, bounds: &Bounds, mode: BoundaryMode) -> bool {
    match mode {
        BoundaryMode::Wrap => {
            wrap_position(&mut ship.x, &mut ship.y, bounds);
            true
        }
        BoundaryMode::Remove => {
            let r = ship.radius;
            ship.x >= -r
                && ship.x <= bounds.width + r
                && ship.y >= -r
                && ship.y <= bounds.height + r
        }
        BoundaryMode::Bounce => {
            bounce_axis(&mut ship.x, &mut ship.vx, 0.0, bounds.width);
            bounce_axis(&mut ship.y, &mut ship.vy, 0.0, bounds.height);
            true
        }
    }
}

/// Wrap a point into the field. Returns `true` if it moved.
fn wrap_position(x: &mut f64, y: &mut f64, bounds: &Bounds) -> bool {
    let wrapped_x = wrap_coordinate(*x, bounds.width);
    let wrapped_y = wrap_coordinate(*y, bounds.height);
    let moved = wrapped_x != *x || wrapped_y != *y;
    *x = wrapped_x;
    *y = wrapped_y;
    moved
}

fn wrap_coordinate(value: f64, extent: f64) -> f64 {
    if value < 0.0 || value > extent {
        value.rem_euclid(extent)
    } else {
        value
    }
}

fn bounce_axis(pos: &mut f64, vel: &mut f64, min: f64, max: f64) {
    if *pos < min {
        *pos = min;
        *vel = vel.abs();
    } else if *pos > max {
        *pos = max;
        *vel = -vel.abs();
    }
}

// ============================================================================
// 3. Turrets and firing
// ============================================================================

/// Retarget and rotate every turret, queuing shots for turrets that are
/// ready, aimed within tolerance, and in range.
///
/// Turrets choose targets through their own targeting mode, independently
/// of the ship's AI target.
pub fn turret_system(state: &mut GameState, ctx: &mut SystemContext<'_>, dt: f64) {
    let aim_tolerance = ctx.config.ai.aim_tolerance;
    let scratch = &mut *ctx.scratch;
    let (ships, index) = state.ships_with_index();

    for idx in 0..ships.len() {
        if !ships[idx].is_alive() {
            continue;
        }
        for w in 0..ships[idx].weapons.len() {
            let Weapon::Turret(mut turret) = ships[idx].weapons[w] else {
                continue;
            };
            let target = ai::select_turret_target(
                &turret,
                idx,
                ships,
                index,
                ctx.rng,
                &mut scratch.targets,
            );
            let ship = &ships[idx];
            let (mx, my) = ship.mount_position(&turret);

            turret.target = target.map(|t| ships[t].id);
            let mut in_range = false;
            if let Some(t) = target {
                let enemy = &ships[t];
                turret.target_angle = bearing(mx, my, enemy.x, enemy.y);
                let range = turret.stats.range;
                in_range = distance_squared(mx, my, enemy.x, enemy.y) <= range * range;
            }
            ai::aim_turret(&mut turret, dt);

            turret.cooldown = (turret.cooldown - dt).max(0.0);
            let aimed = angle_diff(turret.angle, turret.target_angle).abs() < aim_tolerance;
            if target.is_some()
                && in_range
                && aimed
                && turret.cooldown <= 0.0
                && turret.stats.rate > 0.0
            {
                turret.cooldown = turret.stats.cooldown_period();
                scratch.shots.push(Shot {
                    team: ship.team,
                    owner: ship.id,
                    x: mx,
                    y: my,
                    angle: turret.angle,
                    vx: ship.vx,
                    vy: ship.vy,
                    stats: turret.stats,
                });
            }
            ships[idx].weapons[w] = Weapon::Turret(turret);
        }
    }
}

/// Turn queued shots into bullets.
///
/// Spread is drawn from the generator for mounts with non-zero spread. A
/// shot is dropped, with a warning, when the bullet pool refuses it.
pub fn fire_system(state: &mut GameState, ctx: &mut SystemContext<'_>) {
    for shot in ctx.scratch.shots.drain(..) {
        let spread = if shot.stats.spread > 0.0 {
            ctx.rng.jitter(shot.stats.spread)
        } else {
            0.0
        };
        let (sin, cos) = (shot.angle + spread).sin_cos();
        let speed = shot.stats.muzzle_speed;
        let id = state.allocate_id();
        let spawn = BulletSpawn {
            id,
            team: shot.team,
            owner: Some(shot.owner),
            x: shot.x,
            y: shot.y,
            vx: shot.vx + cos * speed,
            vy: shot.vy + sin * speed,
            damage: shot.stats.damage,
            ttl: shot.stats.bullet_ttl,
            radius: shot.stats.bullet_radius,
        };
        match ctx.pools.bullets.acquire(spawn) {
            Ok(bullet) => {
                state.bullets.push(bullet);
                ctx.events.shots_fired += 1;
            }
            Err(err) => {
                tracing::warn!(ship = shot.owner, error = %err, "Shot dropped");
            }
        }
    }
}

// ============================================================================
// 4. Carriers
// ============================================================================

/// Launch fighters from carriers whose timers have run out.
///
/// Each cycle launches up to `fighters_per_cycle`, never letting a carrier's
/// live fighters exceed `max_fighters`. Live fighters are counted by a
/// census of parent links taken at the start of the system.
pub fn carrier_system(state: &mut GameState, ctx: &mut SystemContext<'_>, dt: f64) {
    let carrier_cfg = ctx.config.carrier;
    let templates = ctx.templates;
    let Some(template) = templates.get(&carrier_cfg.fighter_type) else {
        return;
    };
    let scratch = &mut *ctx.scratch;

    scratch.census.clear();
    for ship in &state.ships {
        if let Some(parent) = ship.parent_id {
            *scratch.census.entry(parent).or_insert(0) += 1;
        }
    }

    scratch.launches.clear();
    for ship in &mut state.ships {
        if !ship.is_alive() {
            continue;
        }
        let Some(carrier) = ship.carrier.as_mut() else {
            continue;
        };
        carrier.spawn_timer -= dt;
        if carrier.spawn_timer > 0.0 {
            continue;
        }
        carrier.spawn_timer += carrier_cfg.spawn_interval;
        if carrier.spawn_timer <= 0.0 {
            carrier.spawn_timer = carrier_cfg.spawn_interval;
        }

        let live = scratch.census.get(&ship.id).copied().unwrap_or(0);
        let room = carrier_cfg.max_fighters.saturating_sub(live);
        let count = room.min(carrier_cfg.fighters_per_cycle);
        let distance = ship.radius + carrier_cfg.spawn_offset;
        for _ in 0..count {
            let side = ship.angle + PI + ctx.rng.jitter(FRAC_PI_2);
            scratch.launches.push(Launch {
                parent: ship.id,
                team: ship.team,
                x: ship.x + side.cos() * distance,
                y: ship.y + side.sin() * distance,
                angle: ship.angle,
                vx: ship.vx,
                vy: ship.vy,
            });
        }
    }

    for launch in scratch.launches.drain(..) {
        let id = state.allocate_id();
        let mut fighter = template.instantiate(id, launch.team, launch.x, launch.y, launch.angle);
        fighter.vx = launch.vx;
        fighter.vy = launch.vy;
        fighter.parent_id = Some(launch.parent);
        state.add_ship(fighter);
        ctx.events.spawned.push(id);
        tracing::trace!(carrier = launch.parent, fighter = id, "Fighter launched");
    }
}

// ============================================================================
// 5. Collisions
// ============================================================================

/// Resolve bullet-ship hits and remove the dead.
///
/// The grid is rebuilt from current ship positions. Each bullet queries
/// around the midpoint of its path this tick with a radius covering the
/// whole path, its own radius and the largest ship radius, then tests every
/// enemy candidate in index order with an end-of-step overlap and a swept
/// segment test. The first hit consumes the bullet.
///
/// # Errors
///
/// Propagates an invalid grid cell size.
pub fn collision_system(state: &mut GameState, ctx: &mut SystemContext<'_>) -> Result<()> {
    let config = ctx.config;
    let grid = ctx.grids.acquire(config.grid_cell_size)?;

    let mut max_radius: f64 = 0.0;
    for (i, ship) in state.ships.iter().enumerate() {
        grid.insert(i, ship.x, ship.y);
        max_radius = max_radius.max(ship.radius);
    }
    let margin = config.collision_margin.max(max_radius);

    let scratch = &mut *ctx.scratch;
    scratch.bullet_hits.clear();
    scratch.bullet_hits.resize(state.bullets.len(), false);

    for bi in 0..state.bullets.len() {
        let b = state.bullets[bi];
        let mid_x = (b.prev_x + b.x) * 0.5;
        let mid_y = (b.prev_y + b.y) * 0.5;
        let half_path = distance_squared(b.prev_x, b.prev_y, b.x, b.y).sqrt() * 0.5;
        let reach = half_path + b.radius + margin;
        grid.query_radius(mid_x, mid_y, reach, &mut scratch.candidates);

        let hit = scratch.candidates.iter().copied().find(|&ci| {
            let ship = &state.ships[ci];
            ship.is_alive()
                && ship.team != b.team
                && (circles_overlap(b.x, b.y, b.radius, ship.x, ship.y, ship.radius)
                    || segment_intersects_circle(
                        b.prev_x,
                        b.prev_y,
                        b.x,
                        b.y,
                        ship.x,
                        ship.y,
                        ship.radius + b.radius,
                    ))
        });

        if let Some(ci) = hit {
            scratch.bullet_hits[bi] = true;
            resolve_hit(state, config, ctx.pools, ctx.events, ci, b.owner, b.damage, b.x, b.y);
        }
    }

    let hits = &scratch.bullet_hits;
    let bullet_pool = &mut ctx.pools.bullets;
    let mut i = 0;
    state.bullets.retain(|b| {
        let consumed = hits.get(i).copied().unwrap_or(false);
        i += 1;
        if consumed {
            bullet_pool.release(*b);
        }
        !consumed
    });

    scratch.removals.clear();
    scratch
        .removals
        .extend(state.ships.iter().filter(|s| !s.is_alive()).map(|s| s.id));
    for &id in &scratch.removals {
        if let Some(ship) = state.remove_ship(id) {
            emit_death_effects(state, config, ctx.pools, ctx.rng, &ship);
        }
    }
    Ok(())
}

/// Apply one bullet's damage to `ships[target]`, emit hit effects and credit
/// the owner.
fn resolve_hit(
    state: &mut GameState,
    config: &SimConfig,
    pools: &mut Pools,
    events: &mut TickEvents,
    target: usize,
    owner: Option<ShipId>,
    damage: f64,
    x: f64,
    y: f64,
) {
    let (target_id, target_team, outcome) = {
        let ship = &mut state.ships[target];
        let outcome = apply_damage(ship, damage);
        (ship.id, ship.team, outcome)
    };

    let hits = [
        (EntityKind::ShieldHit, outcome.shield_absorbed),
        (EntityKind::HealthHit, outcome.hull_dealt),
    ];
    for (kind, amount) in hits {
        if amount > 0.0 {
            spawn_effect(state, config, pools, kind, x, y, 0.0, 0.0, target_team, amount);
        }
    }
    events.damage.push(DamageEvent {
        attacker: owner,
        target: target_id,
        shield: outcome.shield_absorbed,
        hull: outcome.hull_dealt,
    });

    // Owners that died earlier this tick get no credit.
    let credited = owner
        .and_then(|id| state.ship_mut(id))
        .filter(|s| s.is_alive());

    if outcome.killed {
        events.kills.push(KillEvent {
            victim: target_id,
            victim_team: target_team,
            killer: credited.as_ref().map(|s| s.id),
        });
        tracing::info!(victim = target_id, killer = ?owner, "Ship destroyed");
    }

    let Some(attacker) = credited else {
        return;
    };
    let progression = &config.progression;
    let mut xp = outcome.total() * progression.xp_per_damage;
    if outcome.killed {
        attacker.kills += 1;
        xp += progression.kill_xp;
    }
    if xp > 0.0 {
        let gained = grant_xp(attacker, xp, progression);
        if gained > 0 {
            tracing::info!(ship = attacker.id, level = attacker.level, "Level up");
            events.level_ups.push(LevelUpEvent {
                ship: attacker.id,
                level: attacker.level,
            });
        }
    }
}

/// Acquire a pooled effect and append it to its live list.
///
/// Effects are observational, so a refusal from the pool only logs.
pub fn spawn_effect(
    state: &mut GameState,
    config: &SimConfig,
    pools: &mut Pools,
    kind: EntityKind,
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    team: Team,
    magnitude: f64,
) -> Option<EntityId> {
    let id = state.allocate_id();
    let spawn = EffectSpawn {
        id,
        x,
        y,
        vx,
        vy,
        team,
        magnitude,
        ttl: config.effects.ttl(kind),
    };
    match pools.effects_mut(kind).acquire(spawn) {
        Ok(effect) => {
            state.effects_mut(kind).push(effect);
            Some(id)
        }
        Err(err) => {
            tracing::warn!(?kind, error = %err, "Effect dropped");
            None
        }
    }
}

fn emit_death_effects(
    state: &mut GameState,
    config: &SimConfig,
    pools: &mut Pools,
    rng: &mut Generator,
    ship: &Ship,
) {
    spawn_effect(
        state,
        config,
        pools,
        EntityKind::Explosion,
        ship.x,
        ship.y,
        ship.vx,
        ship.vy,
        ship.team,
        ship.radius,
    );

    let speed = config.effects.particle_speed;
    for _ in 0..config.effects.particle_count(ship.size_class) {
        let heading = rng.range(0.0, TAU);
        let magnitude = rng.range(0.3, 1.0) * speed;
        spawn_effect(
            state,
            config,
            pools,
            EntityKind::Particle,
            ship.x,
            ship.y,
            ship.vx + heading.cos() * magnitude,
            ship.vy + heading.sin() * magnitude,
            ship.team,
            1.0,
        );
    }
}

// ============================================================================
// 6. Regeneration
// ============================================================================

/// Regenerate shields and refresh cached hp/shield fractions.
pub fn regen_system(state: &mut GameState, dt: f64) {
    for ship in &mut state.ships {
        regen_shield(ship, dt);
        ship.refresh_percentages();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::SizeClass;
    use crate::state::tests::bare_ship;

    #[test]
    fn test_integrate_rotation_and_speed_cap() {
        let mut ship = bare_ship(1, Team::Red);
        ship.steering = 1.0;
        ship.turn_rate = 2.0;
        ship.throttle = 1.0;
        ship.accel = 10_000.0;
        ship.max_speed = 100.0;
        integrate_ship(&mut ship, 0.1, 1.0);
        assert!((ship.angle - 0.2).abs() < 1e-12);
        assert!((ship.speed() - 100.0).abs() < 1e-9);
        assert!((ship.x - ship.vx * 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_friction_damps_coasting_ship() {
        let mut ship = bare_ship(1, Team::Red);
        ship.vx = 50.0;
        let damping = 0.98_f64.powf(1.0);
        integrate_ship(&mut ship, 1.0 / 60.0, damping);
        assert!((ship.vx - 49.0).abs() < 1e-9);
    }

    #[test]
    fn test_wrap_keeps_velocity() {
        let bounds = Bounds::new(100.0, 100.0);
        let mut ship = bare_ship(1, Team::Red);
        ship.x = 101.0;
        ship.y = -2.0;
        ship.vx = 5.0;
        ship.vy = -3.0;
        assert!(apply_ship_boundary(&mut ship, &bounds, BoundaryMode::Wrap));
        assert!((ship.x - 1.0).abs() < 1e-12);
        assert!((ship.y - 98.0).abs() < 1e-12);
        assert_eq!((ship.vx, ship.vy), (5.0, -3.0));
    }

    #[test]
    fn test_remove_waits_for_radius() {
        let bounds = Bounds::new(100.0, 100.0);
        let mut ship = bare_ship(1, Team::Red);
        ship.radius = 10.0;
        ship.x = 108.0;
        ship.y = 50.0;
        assert!(apply_ship_boundary(&mut ship, &bounds, BoundaryMode::Remove));
        ship.x = 110.5;
        assert!(!apply_ship_boundary(&mut ship, &bounds, BoundaryMode::Remove));
    }

    #[test]
    fn test_bounce_negates_and_clamps() {
        let bounds = Bounds::new(100.0, 100.0);
        let mut ship = bare_ship(1, Team::Red);
        ship.x = -4.0;
        ship.y = 50.0;
        ship.vx = -20.0;
        ship.vy = 7.0;
        assert!(apply_ship_boundary(&mut ship, &bounds, BoundaryMode::Bounce));
        assert_eq!(ship.x, 0.0);
        assert_eq!(ship.vx, 20.0);
        assert_eq!(ship.vy, 7.0);
    }

    #[test]
    fn test_death_leaves_explosion_and_particles() {
        let config = SimConfig::default();
        let mut state = GameState::new();
        let mut pools = Pools::new(&config.pools);
        let mut rng = Generator::new(3);
        let mut ship = bare_ship(1, Team::Blue);
        ship.x = 40.0;
        ship.y = 60.0;

        emit_death_effects(&mut state, &config, &mut pools, &mut rng, &ship);

        let explosions = state.effects(EntityKind::Explosion);
        assert_eq!(explosions.len(), 1);
        assert_eq!(explosions[0].magnitude, ship.radius);

        let particles = state.effects(EntityKind::Particle);
        let expected = config.effects.particle_count(SizeClass::Medium) as usize;
        assert_eq!(particles.len(), expected);
        for p in particles {
            assert_eq!((p.x, p.y), (40.0, 60.0));
            assert_eq!(p.team, Team::Blue);
            assert!(p.vx.hypot(p.vy) <= config.effects.particle_speed + 1e-9);
            assert_eq!(p.ttl, config.effects.particle_ttl);
        }
    }
}
