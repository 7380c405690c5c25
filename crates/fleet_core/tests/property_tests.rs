//! Property-based tests for the combat math, pools and broad phase.
//!
//! These hold for arbitrary inputs, not just the tuned defaults.

use fleet_core::combat::{apply_damage, armor_multiplier, grant_xp, ProgressionConfig};
use fleet_core::components::{Bullet, BulletSpawn, Team};
use fleet_core::config::SimConfig;
use fleet_core::math::circles_overlap;
use fleet_core::pool::{EntityKind, OverflowStrategy, Pool, PoolConfig};
use fleet_core::simulation::Simulation;
use fleet_core::spatial::SpatialGrid;
use fleet_test_utils::determinism::strategies::{
    arb_armor, arb_damage, arb_health, arb_position, arb_shield, arb_spawn_list,
};
use fleet_test_utils::fixtures::ShipBuilder;
use proptest::prelude::*;

fn bullet(id: u64) -> BulletSpawn {
    BulletSpawn {
        id,
        team: Team::Red,
        owner: None,
        x: 0.0,
        y: 0.0,
        vx: 0.0,
        vy: 0.0,
        damage: 1.0,
        ttl: 1.0,
        radius: 2.0,
    }
}

proptest! {
    // ========================================================================
    // Damage
    // ========================================================================

    #[test]
    fn damage_never_exceeds_input(
        hp in arb_health(),
        shield in arb_shield(),
        armor in arb_armor(),
        damage in arb_damage(),
    ) {
        let mut ship = ShipBuilder::new(1, Team::Blue)
            .hp(hp, hp)
            .shield(shield, shield)
            .armor(armor)
            .build();
        let outcome = apply_damage(&mut ship, damage);

        prop_assert_eq!(outcome.shield_absorbed, shield.min(damage));
        prop_assert!(outcome.total() <= damage + 1e-9);
        prop_assert!(outcome.hull_dealt >= 0.0);
        prop_assert_eq!(outcome.hull_dealt, outcome.hull_dealt.floor());
        prop_assert!(ship.shield >= 0.0 && ship.shield <= ship.max_shield);
        prop_assert!(ship.hp >= 0.0 && ship.hp <= ship.max_hp);
        prop_assert_eq!(outcome.killed, ship.hp <= 0.0);
    }

    #[test]
    fn armor_multiplier_stays_in_unit_range(armor in -50.0f64..50.0) {
        let m = armor_multiplier(armor);
        prop_assert!((0.0..=1.0).contains(&m));
    }

    #[test]
    fn dead_ships_take_no_damage(damage in arb_damage()) {
        let mut ship = ShipBuilder::new(1, Team::Red).hp(0.0, 100.0).build();
        let outcome = apply_damage(&mut ship, damage);
        prop_assert_eq!(outcome.total(), 0.0);
        prop_assert!(!outcome.killed);
    }

    // ========================================================================
    // Progression
    // ========================================================================

    #[test]
    fn xp_grants_are_monotonic(grants in proptest::collection::vec(0.0f64..400.0, 1..20)) {
        let config = ProgressionConfig::default();
        let mut ship = ShipBuilder::new(1, Team::Red).hp(100.0, 100.0).build();
        let mut total_levels = 0;

        for amount in grants {
            let level_before = ship.level;
            let max_hp_before = ship.max_hp;
            let gained = grant_xp(&mut ship, amount, &config);
            total_levels += gained;

            prop_assert_eq!(ship.level, level_before + gained);
            prop_assert!(ship.max_hp >= max_hp_before);
            prop_assert!(ship.xp >= 0.0);
            prop_assert!(ship.xp < config.xp_to_level(ship.level));
        }
        prop_assert_eq!(ship.level, 1 + total_levels);
    }

    #[test]
    fn level_requirement_grows(level in 1u32..60) {
        let config = ProgressionConfig::default();
        prop_assert!(config.xp_to_level(level + 1) > config.xp_to_level(level));
    }

    // ========================================================================
    // Pools
    // ========================================================================

    #[test]
    fn double_release_is_ignored(count in 1u64..40, capacity in 1usize..64) {
        let mut pool: Pool<Bullet> = Pool::new(
            EntityKind::Bullet,
            PoolConfig::new(capacity, OverflowStrategy::DiscardOldest),
        );
        let items: Vec<_> = (0..count).map(|id| pool.acquire(bullet(id)).unwrap()).collect();
        prop_assert_eq!(pool.outstanding(), count as usize);

        for item in &items {
            pool.release(*item);
        }
        let free_after_first = pool.free_len();
        let first = items[0];
        let was_free = pool.is_free(first.id);
        let accepted = pool.release(first);

        prop_assert_eq!(pool.outstanding(), 0);
        prop_assert!(pool.free_len() <= capacity);
        if was_free {
            prop_assert!(!accepted);
            prop_assert_eq!(pool.free_len(), free_after_first);
        }
    }

    #[test]
    fn error_pool_caps_outstanding(capacity in 1usize..32, extra in 1usize..8) {
        let mut pool: Pool<Bullet> = Pool::new(EntityKind::Bullet, PoolConfig::new(capacity, OverflowStrategy::Error));
        let mut ok = 0;
        for id in 0..(capacity + extra) as u64 {
            if pool.acquire(bullet(id)).is_ok() {
                ok += 1;
            }
        }
        prop_assert_eq!(ok, capacity);
        prop_assert_eq!(pool.outstanding(), capacity);
    }

    // ========================================================================
    // Broad phase
    // ========================================================================

    #[test]
    fn grid_query_has_no_false_negatives(
        cell in 8.0f64..200.0,
        ships in proptest::collection::vec((arb_position(), 1.0f64..40.0), 1..60),
        center in arb_position(),
        query_radius in 0.5f64..10.0,
    ) {
        let mut grid = SpatialGrid::new(cell).unwrap();
        let mut max_r: f64 = 0.0;
        for (handle, ((x, y), r)) in ships.iter().enumerate() {
            grid.insert(handle, *x, *y);
            max_r = max_r.max(*r);
        }

        let mut out = Vec::new();
        grid.query_radius(center.0, center.1, query_radius + max_r, &mut out);

        for (handle, ((x, y), r)) in ships.iter().enumerate() {
            if circles_overlap(center.0, center.1, query_radius, *x, *y, *r) {
                prop_assert!(out.binary_search(&handle).is_ok(), "missed overlapping ship {}", handle);
            }
        }
    }

    // ========================================================================
    // Whole battles
    // ========================================================================

    #[test]
    fn random_fleets_keep_state_consistent(
        spawns in arb_spawn_list(16),
        seed in any::<u32>(),
    ) {
        let mut sim = Simulation::new(SimConfig::default(), seed).unwrap();
        for spawn in &spawns {
            sim.spawn_ship(*spawn).unwrap();
        }
        let red = spawns.iter().filter(|s| s.team == Team::Red).count();
        prop_assert_eq!(sim.state().team_count(Team::Red), red);
        prop_assert_eq!(sim.state().team_count(Team::Blue), spawns.len() - red);

        for _ in 0..45 {
            sim.tick().unwrap();
            prop_assert_eq!(sim.state().check_invariants(), Ok(()));
        }
    }
}
