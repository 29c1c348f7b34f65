// ============================================
// File: crates/tunpair-transport/src/lib.rs
// ============================================
//! # tunpair Transport - OS I/O Layer
//!
//! ## Creation Reason
//! Provides everything that touches the operating system: the tun/tap
//! device, the `ip` configurator, and the TCP connection to the peer.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: `TunDevice` trait and device configuration
//! - [`tun`]: Linux tun/tap device, mock device, interface manager
//! - [`configurator`]: address / link / MTU configuration
//! - [`tcp`]: dial, listen and accept-one
//! - [`framed`]: frame reader and writer over stream halves
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 tunpair-node                        │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                    │
//! │         ▼                     ▼                    │
//! │   tunpair-core         tunpair-transport           │
//! │         ▲              You are here ◄──            │
//! │         └──────────┬──────────┘                    │
//! │                    ▼                               │
//! │             tunpair-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! ┌──────────────┐  packet   ┌──────────────┐  frame   ┌──────────────┐
//! │ tun/tap dev  │ ────────► │  tunpair     │ ───────► │ TCP stream   │
//! │ (one packet  │ ◄──────── │  pumps       │ ◄─────── │ (to the peer)│
//! │  per call)   │  packet   └──────────────┘  frame   └──────────────┘
//! └──────────────┘
//! ```
//!
//! ## Platform Support
//! | Platform | TCP | tun/tap |
//! |----------|-----|---------|
//! | Linux | ✅ | ✅ |
//! | Others | ✅ | ❌ |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Device creation and configuration require elevated privileges
//! - Always use traits for testability
//! - Platform-specific code must be isolated
//! - Mock implementations available with `mock` feature
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod configurator;
pub mod error;
pub mod framed;
pub mod tcp;
pub mod traits;
pub mod tun;

// Re-export primary types
pub use configurator::{ConfigStep, InterfaceConfigurator, IpCommandConfigurator};
pub use error::{Result, TransportError};
pub use framed::{FrameReader, FrameWriter};
pub use tcp::{dial, TcpConnection, TunnelListener};
pub use traits::{TunConfig, TunDevice};
pub use tun::{InterfaceManager, SystemDeviceFactory, VirtualInterface};

#[cfg(target_os = "linux")]
pub use tun::linux::LinuxTun;
