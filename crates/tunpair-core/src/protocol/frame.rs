// ============================================
// File: crates/tunpair-core/src/protocol/frame.rs
// ============================================
//! # Frame Definitions
//!
//! ## Creation Reason
//! TCP is a byte stream: one `write` of N bytes may arrive as several
//! reads or merged with the next write. The tunnel needs one packet per
//! interface write, so every packet crosses the wire inside a frame that
//! carries its own length.
//!
//! ## Wire Format (Big Endian)
//! ```text
//! ┌──────────────────┬─────────────────────────────┐
//! │ Length (2 bytes) │ Payload (Length bytes)      │
//! │ big-endian u16   │ one IP packet / Eth frame   │
//! └──────────────────┴─────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - No version byte, no checksum: TCP already guarantees integrity
//! - The length field caps the MTU at 65535
//! - Changing the header width breaks compatibility with older peers
//!
//! ## Last Modified
//! v0.1.0 - Initial frame definitions

/// Size of the frame header (the length field) in bytes.
pub const FRAME_HEADER_SIZE: usize = 2;

/// Largest payload the length field can describe.
pub const MAX_FRAME_PAYLOAD: usize = u16::MAX as usize;

/// Reads the payload length from a frame header.
#[must_use]
pub const fn payload_len(header: [u8; FRAME_HEADER_SIZE]) -> usize {
    u16::from_be_bytes(header) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_len_is_big_endian() {
        assert_eq!(payload_len([0x05, 0xDC]), 1500);
        assert_eq!(payload_len([0xFF, 0xFF]), MAX_FRAME_PAYLOAD);
        assert_eq!(payload_len([0x00, 0x00]), 0);
    }
}
