// ============================================
// File: crates/tunpair-common/src/lib.rs
// ============================================
//! # tunpair Common - Shared Types Library
//!
//! ## Creation Reason
//! Provides foundational types shared across all tunpair crates,
//! so the role, interface kind and tunnel addressing have one definition.
//!
//! ## Main Functionality
//! - [`types`]: Role, interface kind, tunnel subnet and addresses
//! - [`error`]: Common error type and result alias
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 tunpair-node                        │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                    │
//! │         ▼                     ▼                    │
//! │   tunpair-core         tunpair-transport           │
//! │         │                     │                    │
//! │         └──────────┬──────────┘                    │
//! │                    ▼                               │
//! │             tunpair-common  ◄── You are here      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Keep dependencies minimal (leaf node)
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use types::{InterfaceAddress, InterfaceKind, Role, TunnelSubnet};
