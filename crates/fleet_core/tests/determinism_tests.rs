//! Reproducibility tests for whole battles.
//!
//! Same seed, same configuration and same command sequence must give the
//! same state hash at every tick, whether the battle runs directly, through
//! the engine, after a snapshot restore or next to other battles on threads.

use fleet_core::components::{ShipType, Team};
use fleet_core::config::SimConfig;
use fleet_core::engine::BattleEngine;
use fleet_core::protocol::{Command, Event, ShipCommand};
use fleet_core::simulation::{ShipSpawn, Simulation};
use fleet_core::state::GameState;
use fleet_test_utils::determinism::{
    find_first_divergence, run_parallel_simulations, tick, verify_simulation_determinism,
    verify_snapshot_determinism,
};
use fleet_test_utils::fixtures::{duel, skirmish};

#[test]
fn default_battle_replays_from_seed() {
    let setup = || Simulation::with_initial_fleet(SimConfig::default(), 42).unwrap();
    assert!(verify_simulation_determinism(setup, 600));
}

#[test]
fn duel_never_diverges() {
    assert_eq!(find_first_divergence(|| duel(7), 900), None);
}

#[test]
fn large_skirmish_matches_on_threads() {
    run_parallel_simulations(|| skirmish(3, 60), 4, 200).assert_deterministic();
}

#[test]
fn binary_snapshot_resumes_identically() {
    assert!(verify_snapshot_determinism(|| skirmish(5, 15), 120));
}

#[test]
fn json_snapshots_restore_to_the_same_battle() {
    let mut original = skirmish(11, 10);
    for _ in 0..90 {
        tick(&mut original);
    }
    let json = serde_json::to_string(original.state()).unwrap();

    let restore = || {
        let state: GameState = serde_json::from_str(&json).unwrap();
        let mut sim = Simulation::new(SimConfig::default(), 11).unwrap();
        sim.set_state(state);
        sim.resume_generator(original.rng_state());
        for _ in 0..90 {
            tick(&mut sim);
        }
        sim.state_hash()
    };
    assert_eq!(restore(), restore());
}

#[test]
fn seeds_change_the_battle() {
    let mut a = Simulation::with_initial_fleet(SimConfig::default(), 1).unwrap();
    let mut b = Simulation::with_initial_fleet(SimConfig::default(), 2).unwrap();
    a.run_ticks(30).unwrap();
    b.run_ticks(30).unwrap();
    assert_ne!(a.state_hash(), b.state_hash());
}

#[test]
fn mid_battle_commands_replay() {
    let run = || {
        let mut sim = duel(4);
        for n in 0..300u32 {
            if n % 50 == 0 {
                let y = 200.0 + f64::from(n);
                sim.spawn_ship(ShipSpawn::new(ShipType::Corvette, Team::Blue, 1400.0, y))
                    .unwrap();
            }
            tick(&mut sim);
        }
        sim.state_hash()
    };
    assert_eq!(run(), run());
}

fn engine_hash(commands: &[Command]) -> u64 {
    let mut engine = BattleEngine::new(SimConfig::default()).unwrap();
    engine.set_auto_snapshot(false);
    let mut last = None;
    for command in commands {
        for event in engine.handle(command.clone()) {
            if let Event::StateHash { hash, .. } = event {
                last = Some(hash);
            }
        }
    }
    last.expect("hash reply")
}

#[test]
fn engine_command_sequence_replays() {
    let commands = vec![
        Command::Init {
            seed: 99,
            bounds: None,
            tick_duration_ms: None,
            initial_state: None,
        },
        Command::SetContinuous { enabled: true },
        Command::Step { count: 120 },
        Command::Command {
            action: ShipCommand::SpawnShip(ShipSpawn::new(ShipType::Destroyer, Team::Red, 300.0, 540.0)),
        },
        Command::Step { count: 240 },
        Command::Hash,
    ];
    assert_eq!(engine_hash(&commands), engine_hash(&commands));
}

#[test]
fn engine_and_direct_ticks_agree() {
    let commands = vec![
        Command::Init {
            seed: 5,
            bounds: None,
            tick_duration_ms: None,
            initial_state: None,
        },
        Command::Step { count: 200 },
        Command::Hash,
    ];
    let through_engine = engine_hash(&commands);

    let mut direct = Simulation::with_initial_fleet(SimConfig::default(), 5).unwrap();
    direct.run_ticks(200).unwrap();
    assert_eq!(through_engine, direct.state_hash());
}
