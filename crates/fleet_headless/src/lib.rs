//! Headless battle driver.
//!
//! Runs the fleet battle without graphics, controlled through JSON commands
//! on stdin with events on stdout. This enables:
//!
//! - **Scripted runs**: feed a command file, get a reproducible event log
//! - **Live sessions**: a controller drives a battle running on its own thread
//! - **CI verification**: replay a seed several times and compare hashes
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: [`Command`](fleet_core::protocol::Command) messages
//! - **stdout**: [`Event`](fleet_core::protocol::Event) messages
//! - **stderr**: Logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Scripted: time only moves on step commands
//! printf '{"type":"init","seed":1}\n{"type":"step","count":600}\n{"type":"hash"}\n' \
//!     | cargo run -p fleet_headless -- run --no-snapshots
//!
//! # Live, on a worker thread
//! cargo run -p fleet_headless -- serve --config battle.ron
//! ```

pub mod error;
pub mod runner;
pub mod worker;

pub use error::{HeadlessError, Result};
pub use runner::{load_config, verify_seed, HeadlessConfig, HeadlessRunner, VerifyReport};
pub use worker::{WorkerHost, WorkerOptions};
