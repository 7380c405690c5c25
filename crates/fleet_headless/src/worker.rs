//! Battle engine running on a dedicated thread.
//!
//! The worker owns the only [`BattleEngine`]. Commands arrive over one
//! channel and events leave over another, so the caller never touches the
//! state while a tick is running. The worker keeps its own clock: while the
//! battle is running it wakes every `poll_interval`, feeds the elapsed wall
//! time to the engine and forwards whatever ticks produced. While stopped it
//! blocks until the next command.
//!
//! A panic inside a command or a tick is caught and reported as an `error`
//! event carrying the panic message and a backtrace; the loop keeps going.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use fleet_core::config::SimConfig;
use fleet_core::engine::BattleEngine;
use fleet_core::error::SimError;
use fleet_core::host::SimulationHost;
use fleet_core::protocol::{Command, Event};

use crate::error::{HeadlessError, Result};

/// Worker settings that are not part of the battle configuration.
#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    /// Sleep between clock checks while running.
    pub poll_interval: Duration,
    /// Emit a snapshot after each batch of ticks.
    pub auto_snapshot: bool,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(4),
            auto_snapshot: true,
        }
    }
}

/// [`SimulationHost`] backed by a worker thread.
#[derive(Debug)]
pub struct WorkerHost {
    commands: Option<UnboundedSender<Command>>,
    events: UnboundedReceiver<Event>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerHost {
    /// Validate `config` and start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns configuration errors from the engine, or an IO error if the
    /// thread cannot be spawned.
    pub fn spawn(config: SimConfig, options: WorkerOptions) -> Result<Self> {
        let mut engine = BattleEngine::new(config)?;
        engine.set_auto_snapshot(options.auto_snapshot);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let handle = thread::Builder::new()
            .name("fleet-sim".into())
            .spawn(move || worker_loop(engine, command_rx, event_tx, options.poll_interval))?;

        info!(poll_ms = options.poll_interval.as_millis() as u64, "Worker started");
        Ok(Self {
            commands: Some(command_tx),
            events: event_rx,
            handle: Some(handle),
        })
    }

    /// Block until the worker emits an event. Returns `None` once the worker
    /// has exited and every event has been taken.
    pub fn next_event(&mut self) -> Option<Event> {
        self.events.blocking_recv()
    }

    /// Close the command channel, let the worker finish what is queued and
    /// return the events it produced on the way out.
    ///
    /// # Errors
    ///
    /// Returns [`HeadlessError::Worker`] if the worker thread panicked
    /// outside the guarded command and tick handlers.
    pub fn shutdown(&mut self) -> Result<Vec<Event>> {
        self.commands = None;
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|payload| HeadlessError::Worker(panic_message(payload.as_ref())))?;
        }
        let mut remaining = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            remaining.push(event);
        }
        debug!(remaining = remaining.len(), "Worker stopped");
        Ok(remaining)
    }
}

impl SimulationHost for WorkerHost {
    fn submit(&mut self, command: Command) -> fleet_core::error::Result<()> {
        let sender = self.commands.as_ref().ok_or(SimError::HostDisconnected)?;
        sender.send(command).map_err(|_| SimError::HostDisconnected)
    }

    fn pump(&mut self, _elapsed_ms: f64) {}

    fn poll_events(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Drop for WorkerHost {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Worker ended abnormally");
        }
    }
}

// ============================================================================
// Worker thread
// ============================================================================

fn worker_loop(
    mut engine: BattleEngine,
    mut commands: UnboundedReceiver<Command>,
    events: UnboundedSender<Event>,
    poll_interval: Duration,
) {
    let mut last = Instant::now();

    loop {
        // Stopped: nothing to tick, so wait for the next command.
        if !engine.is_running() {
            let Some(command) = commands.blocking_recv() else {
                return;
            };
            if !forward(&events, guarded("command", || engine.handle(command))) {
                return;
            }
            last = Instant::now();
            continue;
        }

        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if !forward(&events, guarded("command", || engine.handle(command))) {
                        return;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        let now = Instant::now();
        let elapsed_ms = now.duration_since(last).as_secs_f64() * 1000.0;
        last = now;
        if !forward(&events, guarded("tick", || engine.advance(elapsed_ms))) {
            return;
        }

        thread::sleep(poll_interval);
    }
}

thread_local! {
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static TRACE_HOOK: Once = Once::new();

/// Chain a panic hook that records a backtrace for the panicking thread.
/// The previous hook still runs, so the usual stderr report is kept.
fn install_trace_hook() {
    TRACE_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            PANIC_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

/// Run `f`, turning a panic into a single error event with its backtrace.
fn guarded(what: &str, f: impl FnOnce() -> Vec<Event>) -> Vec<Event> {
    install_trace_hook();
    PANIC_TRACE.with(|slot| slot.borrow_mut().take());
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(events) => events,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            let stack = PANIC_TRACE.with(|slot| slot.borrow_mut().take());
            error!(what, message = %message, "Worker caught a panic");
            vec![Event::error_with_stack(
                format!("{what} panicked: {message}"),
                stack,
            )]
        }
    }
}

/// Send every event. Returns `false` once the receiving side is gone.
fn forward(sender: &UnboundedSender<Event>, events: Vec<Event>) -> bool {
    events.into_iter().all(|event| sender.send(event).is_ok())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_reports_panics() {
        let events = guarded("tick", || panic!("boom"));
        assert_eq!(events.len(), 1);
        let Event::Error { message, stack } = &events[0] else {
            panic!("expected an error event, got {:?}", events[0]);
        };
        assert!(message.contains("boom"));
        assert!(stack.as_deref().is_some_and(|s| !s.is_empty()));

        // A clean run afterwards carries no stale trace.
        let events = guarded("tick", || vec![Event::error("x")]);
        assert!(matches!(&events[0], Event::Error { stack: None, .. }));
    }

    #[test]
    fn test_guarded_passes_events_through() {
        let events = guarded("command", || vec![Event::error("x")]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let mut host = WorkerHost::spawn(SimConfig::default(), WorkerOptions::default()).unwrap();
        host.shutdown().unwrap();
        assert!(matches!(host.submit(Command::Start), Err(SimError::HostDisconnected)));
    }
}
