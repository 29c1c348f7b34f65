// ============================================
// File: crates/tunpair-node/src/main.rs
// ============================================
//! # tunpair Entry Point
//!
//! ## Creation Reason
//! Main entry point for the `tunpair` binary. Handles CLI parsing, logging
//! setup, and running one tunnel session.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Configuration loading and validation
//! - Session execution and exit status
//!
//! ## Exit Status
//! - `0`: stopped by a signal, or the peer closed the tunnel
//! - `1`: setup failed, or forwarding failed mid-session
//! - `2`: invalid configuration
//!
//! ## ⚠️ Important Note for Next Developer
//! - Requires root or CAP_NET_ADMIN for the tun/tap device
//! - Nothing is acquired before the configuration validates
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tunpair_node::cli::Cli;
use tunpair_node::error::EXIT_FAILURE;
use tunpair_node::{FileConfig, Lifecycle, NodeError, Session};

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<NodeError>()
                .map_or(EXIT_FAILURE, NodeError::exit_code);
            ExitCode::from(code)
        }
    }
}

/// Loads configuration, runs the session, returns the exit status.
async fn run(cli: Cli) -> anyhow::Result<u8> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(path).await,
        None => Ok(FileConfig::default()),
    };

    // Before the file result is checked, so load errors are reported too
    let level = cli
        .log_level
        .clone()
        .or_else(|| file.as_ref().ok().map(|f| f.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level);

    let file = file?;
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path.display());
    }
    let config = cli
        .tunnel_options()
        .resolve(&file)
        .context("invalid command line")?;

    info!("tunpair v{}", env!("CARGO_PKG_VERSION"));

    let lifecycle = Lifecycle::new();
    let signals = lifecycle.spawn_signal_listener()?;

    let session = Session::system(config, lifecycle);
    let result = session.run().await;

    // Normally gone already: every way out of `run` cancels the lifecycle
    signals.abort();

    let report = result?;
    if let Some(forwarding) = &report.forwarding {
        info!(
            sent = forwarding.outbound.stats.packets,
            received = forwarding.inbound.stats.packets,
            "Session summary"
        );
    }

    Ok(report.exit_code())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}
