// ============================================
// File: crates/tunpair-core/src/lib.rs
// ============================================
//! # tunpair Core - Wire Protocol
//!
//! ## Creation Reason
//! Holds the part of tunpair both peers must agree on byte for byte:
//! how a packet read from a virtual interface travels over TCP.
//!
//! ## Main Functionality
//! - [`protocol`]: Frame layout and the frame codec
//! - [`error`]: Framing error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 tunpair-node                        │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                    │
//! │         ▼                     ▼                    │
//! │   tunpair-core         tunpair-transport           │
//! │   You are here ◄──            │                    │
//! │         └──────────┬──────────┘                    │
//! │                    ▼                               │
//! │             tunpair-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - No I/O in this crate; it only transforms buffers
//! - Protocol changes MUST stay compatible with deployed peers
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod protocol;

// Re-export commonly used items
pub use error::{CoreError, Result};
pub use protocol::{FrameCodec, FRAME_HEADER_SIZE, MAX_FRAME_PAYLOAD};
