//! Boundary between a battle and whoever drives it.
//!
//! A [`SimulationHost`] accepts commands and hands back events. The
//! in-process host below calls the engine directly; a channel-backed host
//! that runs the engine on its own thread lives in the headless driver. Both
//! run the same [`BattleEngine`], so results do not depend on the transport.

use std::collections::VecDeque;

use crate::config::SimConfig;
use crate::engine::BattleEngine;
use crate::error::Result;
use crate::protocol::{Command, Event};

/// Something that runs a battle on behalf of a caller.
pub trait SimulationHost {
    /// Queue a command.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::HostDisconnected`](crate::error::SimError::HostDisconnected)
    /// if the host has shut down.
    fn submit(&mut self, command: Command) -> Result<()>;

    /// Report elapsed wall time. Hosts that keep their own clock ignore it.
    fn pump(&mut self, elapsed_ms: f64);

    /// Take every event produced since the last poll.
    fn poll_events(&mut self) -> Vec<Event>;
}

/// Runs the engine on the caller's thread.
#[derive(Debug)]
pub struct InProcessHost {
    engine: BattleEngine,
    outbox: VecDeque<Event>,
}

impl InProcessHost {
    /// Wrap a new engine.
    ///
    /// # Errors
    ///
    /// Returns configuration errors from [`BattleEngine::new`].
    pub fn new(config: SimConfig) -> Result<Self> {
        Ok(Self {
            engine: BattleEngine::new(config)?,
            outbox: VecDeque::new(),
        })
    }

    /// The wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &BattleEngine {
        &self.engine
    }

    /// The wrapped engine, for settings that are not commands.
    pub fn engine_mut(&mut self) -> &mut BattleEngine {
        &mut self.engine
    }
}

impl SimulationHost for InProcessHost {
    fn submit(&mut self, command: Command) -> Result<()> {
        self.outbox.extend(self.engine.handle(command));
        Ok(())
    }

    fn pump(&mut self, elapsed_ms: f64) {
        self.outbox.extend(self.engine.advance(elapsed_ms));
    }

    fn poll_events(&mut self) -> Vec<Event> {
        self.outbox.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_process_round_trip() {
        let mut host = InProcessHost::new(SimConfig::default()).unwrap();
        host.submit(Command::Init {
            seed: 4,
            bounds: None,
            tick_duration_ms: None,
            initial_state: None,
        })
        .unwrap();
        host.submit(Command::Start).unwrap();
        host.pump(48.0);

        let events = host.poll_events();
        assert!(matches!(events.first(), Some(Event::Ready { .. })));
        assert!(matches!(events.last(), Some(Event::Snapshot { .. })));
        assert!(host.poll_events().is_empty());
        assert_eq!(host.engine().simulation().unwrap().state().tick, 3);
    }
}
