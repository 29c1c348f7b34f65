// ============================================
// File: crates/tunpair-node/src/lib.rs
// ============================================
//! # tunpair Node Library
//!
//! ## Creation Reason
//! Wires the lower crates into one running tunnel end: configuration,
//! lifecycle, session setup and packet forwarding.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`cli`]: Command line definition
//! - [`config`]: Option merging and validation
//! - [`lifecycle`]: Single-fire cancellation and signal handling
//! - [`session`]: Role-parameterized setup and teardown
//! - [`engine`]: The two forwarding pumps
//! - [`error`]: Node-specific error types and exit codes
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         tunpair node                            │
//! │                                                                 │
//! │  ┌──────────┐     ┌───────────┐     ┌──────────────────────┐   │
//! │  │  Config  │────►│  Session  │────►│  Forwarding Engine   │   │
//! │  └──────────┘     └─────┬─────┘     │  outbound │ inbound  │   │
//! │                         │           └──────────┬───────────┘   │
//! │                         ▼                      │               │
//! │                  ┌─────────────┐               │               │
//! │                  │  Lifecycle  │◄──────────────┘               │
//! │                  │ (signals)   │   pump ended -> cancel        │
//! │                  └─────────────┘                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                     Transport Layer                             │
//! │  ┌─────────────────────┐     ┌─────────────────────────────┐   │
//! │  │   TCP (one peer)    │     │   tun/tap device + `ip`     │   │
//! │  └─────────────────────┘     └─────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! local stack → tun/tap → frame → TCP → peer → tun/tap → peer stack
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Device setup requires root or CAP_NET_ADMIN
//! - One connection per process run; there is no reconnect
//! - Interface configuration is not undone on exit
//!
//! ## Last Modified
//! v0.1.0 - Initial node library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod session;

// Re-export primary types
pub use config::{FileConfig, TunnelConfig, TunnelOptions};
pub use engine::{ForwardingEngine, ForwardingReport, PumpOutcome, PumpReport, PumpStats};
pub use error::{NodeError, Result};
pub use lifecycle::{CancelReason, Lifecycle};
pub use session::{Session, SessionReport};
