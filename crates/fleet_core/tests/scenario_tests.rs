//! End-to-end battle scenarios.
//!
//! Every scenario runs at seed 1 with 16 ms ticks unless stated otherwise.

use std::collections::BTreeMap;

use fleet_core::components::{ShipType, Team};
use fleet_core::config::{BoundaryMode, Bounds, SimConfig};
use fleet_core::error::SimError;
use fleet_core::fleet::{plan_reinforcements, ReinforcementConfig, Reinforcer};
use fleet_core::pool::EntityKind;
use fleet_core::rng::Generator;
use fleet_core::simulation::{BulletRequest, ShipSpawn, Simulation, TickEvents};
use fleet_core::systems::apply_ship_boundary;
use fleet_test_utils::fixtures::{aggressive_config, duel, test_bullet, Scenario, ShipBuilder};

fn run(sim: &mut Simulation, ticks: u32) -> TickEvents {
    sim.run_ticks(ticks).expect("ticks run")
}

// ============================================================================
// Combat
// ============================================================================

#[test]
fn engaged_ships_record_hits() {
    let mut sim = duel(1);
    let mut hit_effects = 0;
    let mut damage_events = 0;
    for _ in 0..180 {
        let events = sim.tick().unwrap();
        damage_events += events.damage.len();
        hit_effects += sim.state().effects(EntityKind::ShieldHit).len()
            + sim.state().effects(EntityKind::HealthHit).len();
    }
    assert!(damage_events > 0, "no bullet connected in 180 ticks");
    assert!(hit_effects > 0, "no hit effect was recorded");
}

#[test]
fn ron_scenario_plays_out() {
    let scenario = Scenario::from_ron(
        r#"(
            seed: 3,
            ticks: 240,
            ships: [
                (shipType: frigate, team: red, x: 860.0, y: 540.0),
                (shipType: frigate, team: blue, x: 1060.0, y: 540.0),
                (shipType: corvette, team: blue, x: 1080.0, y: 600.0),
            ],
        )"#,
    )
    .unwrap();
    let mut sim = scenario.build(aggressive_config()).unwrap();
    assert_eq!(sim.state().team_count(Team::Red), 1);
    assert_eq!(sim.state().team_count(Team::Blue), 2);

    let mut damage_events = 0;
    for _ in 0..scenario.ticks {
        damage_events += sim.tick().unwrap().damage.len();
    }
    assert_eq!(sim.state().tick, u64::from(scenario.ticks));
    assert!(damage_events > 0, "scenario ships never traded fire");
    assert_eq!(sim.state().check_invariants(), Ok(()));
}

#[test]
fn ron_scenario_rejects_unknown_hull() {
    let text = "(seed: 1, ships: [(shipType: dreadnought, team: red, x: 1.0, y: 1.0)])";
    assert!(Scenario::from_ron(text).is_err());
}

#[test]
fn shield_then_armored_hull_damage() {
    let mut sim = Simulation::new(SimConfig::default(), 1).unwrap();
    sim.insert_ship(
        ShipBuilder::new(1, Team::Blue)
            .at(500.0, 500.0)
            .hp(100.0, 100.0)
            .shield(8.0, 8.0)
            .armor(1.0)
            .build(),
    );
    sim.spawn_bullet(test_bullet(Team::Red, 500.0, 500.0, 10.0)).unwrap();

    let events = sim.tick().unwrap();

    let ship = sim.state().ship(1).unwrap();
    assert_eq!(ship.shield, 0.0);
    assert_eq!(ship.hp, 100.0 - (2.0_f64 * 0.9).floor());
    assert_eq!(ship.hp, 99.0);
    assert_eq!(events.damage.len(), 1);
    assert_eq!(events.damage[0].shield, 8.0);
    assert_eq!(events.damage[0].hull, 1.0);
    assert!(sim.state().bullets.is_empty());
}

#[test]
fn bullet_hits_at_most_one_ship() {
    let mut sim = Simulation::new(SimConfig::default(), 1).unwrap();
    sim.insert_ship(ShipBuilder::new(1, Team::Blue).at(500.0, 500.0).build());
    sim.insert_ship(ShipBuilder::new(2, Team::Blue).at(502.0, 500.0).build());
    sim.spawn_bullet(test_bullet(Team::Red, 501.0, 500.0, 10.0)).unwrap();

    let events = sim.tick().unwrap();
    assert_eq!(events.damage.len(), 1);
}

#[test]
fn fast_bullet_does_not_tunnel() {
    let mut sim = Simulation::new(SimConfig::default(), 1).unwrap();
    sim.insert_ship(ShipBuilder::new(1, Team::Blue).at(500.0, 500.0).radius(4.0).build());
    // 3000 u/s covers 48 units per tick; the ship is 8 wide.
    sim.spawn_bullet(BulletRequest {
        vx: 3000.0,
        ..test_bullet(Team::Red, 470.0, 500.0, 5.0)
    })
    .unwrap();

    let events = sim.tick().unwrap();
    assert_eq!(events.damage.len(), 1);
}

#[test]
fn overspeed_and_non_finite_bullets_rejected() {
    let mut sim = Simulation::new(SimConfig::default(), 1).unwrap();
    let requests = [
        BulletRequest {
            vx: 2.0e7,
            ..test_bullet(Team::Red, 470.0, 500.0, 5.0)
        },
        BulletRequest {
            vy: 1.0e300,
            ..test_bullet(Team::Red, 470.0, 500.0, 5.0)
        },
        BulletRequest {
            x: f64::NAN,
            ..test_bullet(Team::Red, 470.0, 500.0, 5.0)
        },
        BulletRequest {
            ttl: f64::INFINITY,
            ..test_bullet(Team::Red, 470.0, 500.0, 5.0)
        },
    ];
    for request in requests {
        assert!(matches!(
            sim.spawn_bullet(request),
            Err(SimError::InvalidBullet(_))
        ));
    }
    assert!(sim.state().bullets.is_empty());
    assert_eq!(sim.pools().bullets.outstanding(), 0);
}

#[test]
fn runaway_bullet_in_restored_state_still_ticks() {
    let mut sim = Simulation::new(SimConfig::default(), 1).unwrap();
    sim.spawn_ship(ShipSpawn::new(ShipType::Frigate, Team::Blue, 600.0, 900.0))
        .unwrap();
    sim.spawn_bullet(test_bullet(Team::Red, 100.0, 500.0, 5.0)).unwrap();

    // Snapshots are trusted wholesale, so an absurd velocity can arrive
    // through setState; the broad phase must stay bounded regardless.
    let mut state = sim.snapshot();
    state.bullets[0].vx = 1.0e300;
    sim.set_state(state);

    let events = sim.tick().unwrap();
    assert!(events.damage.is_empty());
    assert_eq!(sim.state().tick, 1);
}

#[test]
fn friendly_bullets_pass_through() {
    let mut sim = Simulation::new(SimConfig::default(), 1).unwrap();
    sim.insert_ship(ShipBuilder::new(1, Team::Red).at(500.0, 500.0).build());
    sim.spawn_bullet(test_bullet(Team::Red, 500.0, 500.0, 10.0)).unwrap();

    let events = sim.tick().unwrap();
    assert!(events.damage.is_empty());
    assert_eq!(sim.state().bullets.len(), 1);
}

#[test]
fn kill_removes_ship_and_credits_owner() {
    let mut sim = Simulation::new(aggressive_config(), 1).unwrap();
    sim.insert_ship(ShipBuilder::new(1, Team::Red).at(100.0, 100.0).build());
    sim.insert_ship(ShipBuilder::new(2, Team::Blue).at(900.0, 900.0).hp(5.0, 100.0).build());
    sim.spawn_bullet(BulletRequest {
        owner: Some(1),
        ..test_bullet(Team::Red, 900.0, 900.0, 50.0)
    })
    .unwrap();

    let events = sim.tick().unwrap();

    assert_eq!(events.kills.len(), 1);
    assert_eq!(events.kills[0].killer, Some(1));
    assert!(sim.state().ship(2).is_none());
    assert_eq!(sim.state().team_count(Team::Blue), 0);
    assert_eq!(sim.state().effects(EntityKind::Explosion).len(), 1);
    assert!(!sim.state().effects(EntityKind::Particle).is_empty());

    let killer = sim.state().ship(1).unwrap();
    assert_eq!(killer.kills, 1);
    // 5 hull damage plus the kill bonus
    assert_eq!(killer.xp, 55.0);
    assert_eq!(sim.state().winner(), Some(Team::Red));
}

#[test]
fn massive_xp_gain_levels_repeatedly() {
    let mut sim = Simulation::new(aggressive_config(), 1).unwrap();
    sim.insert_ship(ShipBuilder::new(1, Team::Red).at(100.0, 100.0).build());
    sim.insert_ship(
        ShipBuilder::new(2, Team::Blue)
            .at(900.0, 900.0)
            .hp(1000.0, 1000.0)
            .build(),
    );
    sim.spawn_bullet(BulletRequest {
        owner: Some(1),
        ..test_bullet(Team::Red, 900.0, 900.0, 500.0)
    })
    .unwrap();

    let events = sim.tick().unwrap();

    let ship = sim.state().ship(1).unwrap();
    assert_eq!(events.level_ups.len(), 1);
    assert!(ship.level >= 3, "500 xp should clear several levels, got {}", ship.level);
    assert_eq!(events.level_ups[0].level, ship.level);
    assert!(ship.xp < sim.config().progression.xp_to_level(ship.level));
}

#[test]
fn shields_regenerate_to_cap() {
    let mut sim = Simulation::new(SimConfig::default(), 1).unwrap();
    sim.insert_ship(
        ShipBuilder::new(1, Team::Red)
            .at(500.0, 500.0)
            .shield(0.0, 10.0)
            .regen(5.0)
            .build(),
    );
    run(&mut sim, 60);
    let ship = sim.state().ship(1).unwrap();
    assert!((ship.shield - 4.8).abs() < 1e-9, "shield {}", ship.shield);
    run(&mut sim, 120);
    let ship = sim.state().ship(1).unwrap();
    assert_eq!(ship.shield, 10.0);
    assert_eq!(ship.shield_percent, 1.0);
}

// ============================================================================
// Reinforcement
// ============================================================================

#[test]
fn weak_team_reinforced_on_interval() {
    let config = ReinforcementConfig {
        score_margin: 0.12,
        interval: 1.0,
        ..ReinforcementConfig::default()
    };
    let strengths = BTreeMap::from([(Team::Red, 10.0), (Team::Blue, 100.0)]);
    let bounds = Bounds::default();
    let mut rng = Generator::new(1);
    let mut timer = Reinforcer::new();

    let mut orders = Vec::new();
    for _ in 0..100 {
        if timer.tick(0.016, config.interval) {
            orders = plan_reinforcements(&strengths, &bounds, &config, &mut rng);
            break;
        }
    }
    assert!(!orders.is_empty());
    assert!(orders.iter().all(|o| o.team == Team::Red));
    assert!(orders.iter().all(|o| o.x < bounds.width * 0.5));
}

#[test]
fn reinforcement_orders_become_ships() {
    let mut sim = Simulation::new(SimConfig::default(), 1).unwrap();
    sim.spawn_ship(ShipSpawn::new(ShipType::Destroyer, Team::Blue, 1500.0, 540.0))
        .unwrap();
    let orders = sim.plan_reinforcements(&ReinforcementConfig::default());
    assert!(!orders.is_empty());
    for order in &orders {
        sim.spawn_order(order).unwrap();
    }
    assert_eq!(sim.state().team_count(Team::Red), orders.len());
}

// ============================================================================
// Lifetimes and boundaries
// ============================================================================

#[test]
fn bullet_lifetime_spans_two_ticks() {
    let mut sim = Simulation::new(SimConfig::default(), 1).unwrap();
    sim.spawn_bullet(BulletRequest {
        ttl: 0.1,
        ..test_bullet(Team::Red, 200.0, 200.0, 1.0)
    })
    .unwrap();

    sim.step(0.05).unwrap();
    assert_eq!(sim.state().bullets.len(), 1);
    sim.step(0.05).unwrap();
    assert_eq!(sim.state().bullets.len(), 1);
    sim.step(0.05).unwrap();
    assert!(sim.state().bullets.is_empty());
    assert_eq!(sim.pools().bullets.outstanding(), 0);
}

#[test]
fn wrap_keeps_velocity() {
    let bounds = Bounds::new(100.0, 100.0);
    let mut ship = ShipBuilder::new(1, Team::Red).at(103.0, 50.0).moving(40.0, -5.0).build();
    assert!(apply_ship_boundary(&mut ship, &bounds, BoundaryMode::Wrap));
    assert!((ship.x - 3.0).abs() < 1e-9);
    assert_eq!((ship.vx, ship.vy), (40.0, -5.0));
}

#[test]
fn bounce_reflects_and_clamps() {
    let bounds = Bounds::new(100.0, 100.0);
    let mut ship = ShipBuilder::new(1, Team::Red).at(50.0, -2.0).moving(10.0, -30.0).build();
    assert!(apply_ship_boundary(&mut ship, &bounds, BoundaryMode::Bounce));
    assert_eq!(ship.y, 0.0);
    assert_eq!((ship.vx, ship.vy), (10.0, 30.0));
}

fn small_field(bullets: BoundaryMode) -> Simulation {
    let mut config = SimConfig::default();
    config.bounds = Bounds::new(200.0, 200.0);
    config.boundary.bullets = bullets;
    Simulation::new(config, 1).unwrap()
}

#[test]
fn wrapped_bullet_keeps_velocity_and_skips_the_seam() {
    let mut sim = small_field(BoundaryMode::Wrap);
    // Sits on the line a seam-spanning sweep from x=199 back to x=4 would cross.
    sim.insert_ship(ShipBuilder::new(1, Team::Blue).at(100.0, 100.0).radius(4.0).build());
    sim.spawn_bullet(BulletRequest {
        vx: 100.0,
        vy: 0.0,
        ..test_bullet(Team::Red, 199.0, 100.0, 5.0)
    })
    .unwrap();

    let events = sim.step(0.05).unwrap();

    assert!(events.damage.is_empty(), "wrap must not sweep across the field");
    let bullet = sim.state().bullets[0];
    assert!((bullet.x - 4.0).abs() < 1e-9);
    assert_eq!(bullet.y, 100.0);
    assert_eq!((bullet.vx, bullet.vy), (100.0, 0.0));
    assert_eq!((bullet.prev_x, bullet.prev_y), (bullet.x, bullet.y));

    // Next tick sweeps normally from the wrapped position.
    sim.step(0.05).unwrap();
    assert!((sim.state().bullets[0].x - 9.0).abs() < 1e-9);
}

#[test]
fn bounced_bullet_is_clamped_and_turned_back() {
    let mut sim = small_field(BoundaryMode::Bounce);
    sim.spawn_bullet(BulletRequest {
        vx: 100.0,
        vy: 30.0,
        ..test_bullet(Team::Red, 198.0, 100.0, 5.0)
    })
    .unwrap();

    sim.step(0.05).unwrap();
    let bullet = sim.state().bullets[0];
    assert_eq!(bullet.x, 200.0);
    assert_eq!((bullet.vx, bullet.vy), (-100.0, 30.0));
    assert!((bullet.y - 101.5).abs() < 1e-9);

    sim.step(0.05).unwrap();
    assert_eq!(sim.state().bullets.len(), 1, "bounce never removes");
    assert!((sim.state().bullets[0].x - 195.0).abs() < 1e-9);
}

#[test]
fn remove_deletes_ship_past_radius() {
    let mut config = aggressive_config();
    config.boundary.ships = BoundaryMode::Remove;
    let width = config.bounds.width;
    let mut sim = Simulation::new(config, 1).unwrap();
    sim.insert_ship(
        ShipBuilder::new(1, Team::Red)
            .at(width + 11.0, 500.0)
            .radius(12.0)
            .moving(200.0, 0.0)
            .engine(100.0, 2.0, 300.0)
            .build(),
    );

    let events = sim.tick().unwrap();
    assert_eq!(events.departed, vec![1]);
    assert!(sim.state().ships.is_empty());
    assert_eq!(sim.state().team_count(Team::Red), 0);
}

// ============================================================================
// Carriers
// ============================================================================

#[test]
fn carriers_launch_capped_fighters() {
    let mut config = SimConfig::default();
    config.carrier.spawn_interval = 0.5;
    let max = config.carrier.max_fighters as usize;
    let mut sim = Simulation::new(config, 1).unwrap();
    let carrier = sim
        .spawn_ship(ShipSpawn::new(ShipType::Carrier, Team::Red, 960.0, 540.0))
        .unwrap();

    let events = run(&mut sim, 600);

    let fighters: Vec<_> = sim
        .state()
        .ships
        .iter()
        .filter(|s| s.parent_id == Some(carrier))
        .collect();
    assert!(!events.spawned.is_empty());
    assert_eq!(fighters.len(), max);
    assert!(fighters.iter().all(|f| f.ship_type == ShipType::Fighter && f.team == Team::Red));
}
