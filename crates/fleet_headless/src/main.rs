//! Headless fleet battle driver.
//!
//! Runs a battle without graphics, controlled via JSON on stdin/stdout.
//!
//! # Usage
//!
//! ```bash
//! # Scripted session - deterministic, time moves only on step commands
//! cargo run -p fleet_headless -- run < script.jsonl
//!
//! # Live session on a worker thread
//! cargo run -p fleet_headless -- serve
//!
//! # Verify determinism for a seed
//! cargo run -p fleet_headless -- verify --seed 12345 --ticks 3600 --runs 5
//!
//! # Print the default configuration
//! cargo run -p fleet_headless -- dump-config > battle.ron
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON events, one per line
//! Logs (stderr): Debug information, filtered by `RUST_LOG`

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fleet_core::config::SimConfig;
use fleet_headless::{load_config, verify_seed, HeadlessConfig, HeadlessRunner};

#[derive(Parser)]
#[command(name = "fleet_headless")]
#[command(about = "Headless fleet battle driver")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Battle configuration (RON); defaults apply when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted session from stdin without a wall clock
    Run {
        /// Do not emit a snapshot after each step
        #[arg(long)]
        no_snapshots: bool,
    },

    /// Serve a live session with the battle on a worker thread
    Serve {
        /// Do not emit a snapshot after each batch of ticks
        #[arg(long)]
        no_snapshots: bool,

        /// Worker clock interval in milliseconds
        #[arg(long, default_value = "4")]
        poll_ms: u64,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u32,

        /// Ticks per run
        #[arg(short, long, default_value = "3600")]
        ticks: u32,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Print the configuration in effect as RON
    DumpConfig,
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for protocol
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let sim = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Run { no_snapshots }) => cmd_run(HeadlessConfig {
            sim,
            auto_snapshot: !no_snapshots,
            ..HeadlessConfig::default()
        }),
        Some(Commands::Serve {
            no_snapshots,
            poll_ms,
        }) => cmd_serve(HeadlessConfig {
            sim,
            auto_snapshot: !no_snapshots,
            poll_interval: Duration::from_millis(poll_ms.max(1)),
        }),
        Some(Commands::Verify { seed, ticks, runs }) => cmd_verify(&sim, seed, ticks, runs),
        Some(Commands::DumpConfig) => cmd_dump_config(&sim),
        None => cmd_serve(HeadlessConfig {
            sim,
            ..HeadlessConfig::default()
        }),
    }
}

/// Run a scripted session
fn cmd_run(config: HeadlessConfig) {
    tracing::info!("Starting scripted session");
    let runner = HeadlessRunner::new(config);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match runner.run_script(io::stdin().lock(), &mut out) {
        Ok(accepted) => tracing::info!(accepted, "Scripted session finished"),
        Err(e) => {
            eprintln!("Session failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Serve a live session
fn cmd_serve(config: HeadlessConfig) {
    tracing::info!("Starting live session");
    if let Err(e) = HeadlessRunner::new(config).serve() {
        eprintln!("Session failed: {e}");
        std::process::exit(1);
    }
}

/// Verify determinism
fn cmd_verify(config: &SimConfig, seed: u32, ticks: u32, runs: u32) {
    tracing::info!(seed, ticks, runs, "Verifying determinism");

    let report = match verify_seed(config, seed, ticks, runs) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Verification failed to run: {e}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "Could not serialize report"),
    }

    if report.deterministic {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}

/// Print the configuration as RON
fn cmd_dump_config(config: &SimConfig) {
    match config.to_ron_string() {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Failed to render configuration: {e}");
            std::process::exit(1);
        }
    }
}
