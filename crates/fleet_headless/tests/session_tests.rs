//! Scripted JSON-lines sessions through the in-process host.

use std::io::Cursor;

use fleet_core::protocol::Event;
use fleet_headless::{HeadlessConfig, HeadlessRunner};

fn run_script(script: &str, auto_snapshot: bool) -> (usize, Vec<Event>) {
    let runner = HeadlessRunner::new(HeadlessConfig {
        auto_snapshot,
        ..HeadlessConfig::default()
    });
    let mut out = Vec::new();
    let accepted = runner.run_script(Cursor::new(script), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let events = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("every output line is an event"))
        .collect();
    (accepted, events)
}

#[test]
fn init_step_hash_session() {
    let script = r#"{"type":"init","seed":1}
{"type":"step","count":30}
{"type":"hash"}
"#;
    let (accepted, events) = run_script(script, false);

    assert_eq!(accepted, 3);
    assert!(matches!(events.first(), Some(Event::Ready { tick: 0, .. })));
    assert!(matches!(events.last(), Some(Event::StateHash { tick: 30, .. })));
}

#[test]
fn same_script_prints_same_output() {
    let script = r#"{"type":"init","seed":77}
{"type":"setContinuous","enabled":true}
{"type":"step","count":400}
{"type":"hash"}
"#;
    let render = |events: Vec<Event>| {
        events
            .iter()
            .map(Event::to_json_line)
            .collect::<String>()
    };
    assert_eq!(render(run_script(script, true).1), render(run_script(script, true).1));
}

#[test]
fn malformed_lines_report_and_continue() {
    let script = r#"{"type":"init","seed":2}
this is not json
{"type":"explode"}

{"type":"hash"}
"#;
    let (accepted, events) = run_script(script, false);

    assert_eq!(accepted, 2);
    let errors = events
        .iter()
        .filter(|e| matches!(e, Event::Error { .. }))
        .count();
    assert_eq!(errors, 2);
    assert!(matches!(events.last(), Some(Event::StateHash { .. })));
}

#[test]
fn commands_before_init_are_errors() {
    let (_, events) = run_script("{\"type\":\"step\",\"count\":5}\n", false);
    assert!(matches!(
        events.as_slice(),
        [Event::Error { message, .. }] if message.contains("not initialized")
    ));
}

#[test]
fn spawn_command_reports_id() {
    let script = r#"{"type":"init","seed":3}
{"type":"command","action":{"kind":"spawnShip","shipType":"carrier","team":"blue","x":1500,"y":500}}
"#;
    let (_, events) = run_script(script, false);
    assert!(matches!(events.last(), Some(Event::Spawned { .. })));
}

#[test]
fn runaway_bullet_command_is_refused() {
    let script = r#"{"type":"init","seed":5}
{"type":"command","action":{"kind":"spawnBullet","team":"red","x":100,"y":500,"vx":1e300,"vy":0,"damage":1,"ttl":1}}
{"type":"step","count":1}
{"type":"hash"}
"#;
    let (_, events) = run_script(script, false);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Error { message, .. } if message.contains("Invalid bullet"))));
    assert!(matches!(events.last(), Some(Event::StateHash { tick: 1, .. })));
}

#[test]
fn step_emits_snapshot_when_enabled() {
    let script = "{\"type\":\"init\",\"seed\":4}\n{\"type\":\"step\",\"count\":2}\n";
    let (_, events) = run_script(script, true);
    let Some(Event::Snapshot { state }) = events.last() else {
        panic!("expected a snapshot, got {events:?}");
    };
    assert_eq!(state.tick, 2);
}
