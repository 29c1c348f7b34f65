// ============================================
// File: crates/tunpair-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines error types for the tunnel wire protocol: everything that can
//! go wrong while turning packets into frames and frames back into packets.
//!
//! ## Error Categories
//! 1. **Size Errors**: frame larger than the negotiated MTU or the
//!    length field can express
//! 2. **Stream Errors**: byte stream ended in the middle of a frame
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use tunpair_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for framing operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Frame payload exceeds the maximum allowed size.
    #[error("Frame too large: max {max} bytes, got {actual}")]
    FrameTooLarge {
        /// Maximum allowed payload size
        max: usize,
        /// Actual payload size
        actual: usize,
    },

    /// Stream ended before a complete frame was received.
    #[error("Truncated frame: expected {expected} more bytes, got {actual}")]
    TruncatedFrame {
        /// Bytes the frame still needed
        expected: usize,
        /// Bytes that were available
        actual: usize,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    /// Creates a `FrameTooLarge` error.
    pub const fn too_large(max: usize, actual: usize) -> Self {
        Self::FrameTooLarge { max, actual }
    }

    /// Creates a `TruncatedFrame` error.
    pub const fn truncated(expected: usize, actual: usize) -> Self {
        Self::TruncatedFrame { expected, actual }
    }

    /// Returns `true` if the peer sent bytes that violate the framing.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(self, Self::FrameTooLarge { .. } | Self::TruncatedFrame { .. })
    }
}

// ============================================
// Tests
// ============================================
