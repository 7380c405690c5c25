//! JSON-lines sessions over a [`SimulationHost`].
//!
//! Two modes:
//!
//! - **Scripted** ([`HeadlessRunner::run_script`]): the in-process host,
//!   no wall clock. Time only moves on `step` commands, so the same script
//!   always prints the same output.
//! - **Serve** ([`HeadlessRunner::serve`]): the worker host with its own
//!   clock. stdin is read on a separate thread and events are written to
//!   stdout as they arrive.
//!
//! Lines that fail to parse produce an `error` event and the session goes on.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use fleet_core::config::SimConfig;
use fleet_core::host::{InProcessHost, SimulationHost};
use fleet_core::protocol::{Command, Event};
use fleet_core::simulation::Simulation;

use crate::error::{HeadlessError, Result};
use crate::worker::{WorkerHost, WorkerOptions};

/// Session settings.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Battle configuration.
    pub sim: SimConfig,
    /// Emit a snapshot after every batch of ticks.
    pub auto_snapshot: bool,
    /// Worker clock interval in serve mode.
    pub poll_interval: Duration,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            auto_snapshot: true,
            poll_interval: WorkerOptions::default().poll_interval,
        }
    }
}

/// Load a RON configuration file, or the defaults when `path` is `None`.
///
/// # Errors
///
/// Returns IO errors, parse errors and validation errors.
pub fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let text = fs::read_to_string(path)?;
    let config = SimConfig::from_ron_str(&text)?;
    config.validate()?;
    info!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Drives one session.
#[derive(Debug, Clone, Default)]
pub struct HeadlessRunner {
    config: HeadlessConfig,
}

impl HeadlessRunner {
    /// Create a runner.
    pub fn new(config: HeadlessConfig) -> Self {
        Self { config }
    }

    /// Run every command line from `input` on the in-process host, writing
    /// events to `output`. Returns the number of commands accepted.
    ///
    /// # Errors
    ///
    /// Returns configuration errors and IO errors on `input` or `output`.
    pub fn run_script<R: BufRead, W: Write>(&self, input: R, output: &mut W) -> Result<usize> {
        let mut host = InProcessHost::new(self.config.sim.clone())?;
        host.engine_mut().set_auto_snapshot(self.config.auto_snapshot);

        let mut accepted = 0;
        for line in input.lines() {
            let line = line?;
            match submit_line(&mut host, &line) {
                Ok(true) => accepted += 1,
                Ok(false) => {}
                Err(event) => write_event(output, &event)?,
            }
            for event in host.poll_events() {
                write_event(output, &event)?;
            }
        }
        output.flush()?;
        debug!(accepted, "Script finished");
        Ok(accepted)
    }

    /// Serve stdin/stdout in real time on a worker thread until stdin closes.
    ///
    /// # Errors
    ///
    /// Returns startup errors and stdout failures.
    pub fn serve(&self) -> Result<()> {
        let mut host = WorkerHost::spawn(
            self.config.sim.clone(),
            WorkerOptions {
                poll_interval: self.config.poll_interval,
                auto_snapshot: self.config.auto_snapshot,
            },
        )?;

        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
        thread::Builder::new().name("fleet-stdin".into()).spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
        })?;

        let stdout = io::stdout();
        let mut out = stdout.lock();
        info!("Serving commands on stdin");

        loop {
            let mut closed = false;
            loop {
                match line_rx.try_recv() {
                    Ok(line) => {
                        if let Err(event) = submit_line(&mut host, &line) {
                            write_event(&mut out, &event)?;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        closed = true;
                        break;
                    }
                }
            }

            for event in host.poll_events() {
                write_event(&mut out, &event)?;
            }
            out.flush()?;

            if closed {
                break;
            }
            thread::sleep(self.config.poll_interval);
        }

        for event in host.shutdown()? {
            write_event(&mut out, &event)?;
        }
        out.flush()?;
        info!("Input closed, session over");
        Ok(())
    }
}

/// Parse and submit one line. Blank lines are skipped (`Ok(false)`); a
/// failure comes back as the error event to report.
fn submit_line<H: SimulationHost>(host: &mut H, line: &str) -> std::result::Result<bool, Event> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(false);
    }
    let command = Command::from_json(line).map_err(|e| {
        warn!(error = %e, "Unparseable command");
        Event::error(HeadlessError::from(e).to_string())
    })?;
    debug!(command = command.name(), "Command received");
    host.submit(command)
        .map_err(|e| Event::error(HeadlessError::from(e).to_string()))?;
    Ok(true)
}

fn write_event<W: Write>(out: &mut W, event: &Event) -> Result<()> {
    out.write_all(event.to_json_line().as_bytes())?;
    Ok(())
}

// ============================================================================
// Determinism check
// ============================================================================

/// Outcome of [`verify_seed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Seed replayed.
    pub seed: u32,
    /// Ticks per run.
    pub ticks: u32,
    /// Final state hash of every run.
    pub hashes: Vec<u64>,
    /// Whether every run ended on the same hash.
    pub deterministic: bool,
}

/// Replay the default layout for `seed` `runs` times and compare the final
/// state hashes.
///
/// # Errors
///
/// Returns configuration and tick errors from the core.
pub fn verify_seed(config: &SimConfig, seed: u32, ticks: u32, runs: u32) -> Result<VerifyReport> {
    let mut hashes = Vec::with_capacity(runs as usize);
    for run in 0..runs {
        let mut sim = Simulation::with_initial_fleet(config.clone(), seed)?;
        sim.run_ticks(ticks)?;
        debug!(run, hash = sim.state_hash(), "Verification run finished");
        hashes.push(sim.state_hash());
    }
    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    Ok(VerifyReport {
        seed,
        ticks,
        hashes,
        deterministic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_skipped() {
        let mut host = InProcessHost::new(SimConfig::default()).unwrap();
        assert!(matches!(submit_line(&mut host, "   "), Ok(false)));
    }

    #[test]
    fn test_bad_json_becomes_error_event() {
        let mut host = InProcessHost::new(SimConfig::default()).unwrap();
        let Err(Event::Error { message, .. }) = submit_line(&mut host, "{not json") else {
            panic!("expected error event");
        };
        assert!(message.starts_with("Invalid JSON"));
    }

    #[test]
    fn test_load_config_defaults() {
        assert_eq!(load_config(None).unwrap(), SimConfig::default());
    }

    #[test]
    fn test_verify_seed_is_deterministic() {
        let report = verify_seed(&SimConfig::default(), 8, 60, 3).unwrap();
        assert!(report.deterministic);
        assert_eq!(report.hashes.len(), 3);
    }
}
