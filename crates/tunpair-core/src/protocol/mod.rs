// ============================================
// File: crates/tunpair-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the tunnel wire protocol: one length-prefixed frame per
//! packet, carried over a single TCP connection.
//!
//! ### Submodules
//! - [`frame`]: Frame layout and constants
//! - [`codec`]: Frame encoding/decoding
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Initiator ═══ [len|packet][len|packet]... ═══► Responder  │
//! │  Initiator ◄══ [len|packet][len|packet]... ═══ Responder   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//! There is no handshake: both sides start forwarding as soon as the
//! TCP connection is up.
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod codec;
pub mod frame;

// Re-export primary types
pub use codec::FrameCodec;
pub use frame::{FRAME_HEADER_SIZE, MAX_FRAME_PAYLOAD};
