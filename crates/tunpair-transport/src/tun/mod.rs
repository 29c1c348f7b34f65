// ============================================
// File: crates/tunpair-transport/src/tun/mod.rs
// ============================================
//! # Virtual Device Module
//!
//! ## Creation Reason
//! Provides tun/tap device management for the local end of the tunnel.
//!
//! ## Main Functionality
//! - Platform-specific device implementations
//! - Mock implementation for testing
//! - `InterfaceManager`: create once, configure once
//!
//! ## Platform Implementations
//! - `linux`: Uses `/dev/net/tun` with IFF_TUN or IFF_TAP
//! - `mock`: In-memory implementation for testing
//!
//! ## tun vs tap
//! ```text
//! ┌──────────────────────────────┐     ┌──────────────────────────────┐
//! │ tun (layer 3)                │     │ tap (layer 2)                │
//! │ read/write = one IP packet   │     │ read/write = one Ethernet    │
//! │                              │     │ frame                        │
//! └──────────────┬───────────────┘     └──────────────┬───────────────┘
//!                │                                    │
//!                └──────────► tunpair pumps ◄─────────┘
//!                          (payload is opaque)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Device creation requires root or CAP_NET_ADMIN capability
//! - Device names are limited to 15 characters on Linux
//!
//! ## Last Modified
//! v0.1.0 - Initial tun/tap module structure

// Platform-specific implementations
#[cfg(target_os = "linux")]
pub mod linux;

pub mod manager;

// Mock implementation for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(target_os = "linux")]
pub use linux::LinuxTun;

pub use manager::{DeviceFactory, InterfaceManager, SystemDeviceFactory, VirtualInterface};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockDeviceFactory, MockTun};
