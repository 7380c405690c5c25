//! Error types for the headless driver.

use thiserror::Error;

use fleet_core::error::SimError;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Failures outside the simulation itself.
///
/// Inside a session these are turned into `error` events; only startup
/// failures end the process.
#[derive(Debug, Error)]
pub enum HeadlessError {
    /// Reading input or writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A line was not a valid command.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The simulation rejected a request.
    #[error(transparent)]
    Core(#[from] SimError),

    /// The worker thread could not be started or ended abnormally.
    #[error("Worker failed: {0}")]
    Worker(String),
}
