// ============================================
// File: crates/tunpair-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! Defines the abstract interface to a virtual network device so the
//! forwarding engine can run against a real tun/tap device or an
//! in-memory mock.
//!
//! ## Main Functionality
//! - `TunDevice`: one-packet-per-call read/write interface
//! - `TunConfig`: what to ask the kernel for when creating a device
//!
//! ## Design Philosophy
//! - Traits enable mock implementations for testing
//! - Async-first design with `async_trait`
//! - Reads and writes take `&self` so one task can read while another
//!   writes through the same `Arc`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Implementations must be Send + Sync for use in async contexts
//! - Buffer management is caller's responsibility
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use async_trait::async_trait;

use tunpair_common::InterfaceKind;

use crate::error::{Result, TransportError};

/// Longest interface name Linux accepts (IFNAMSIZ - 1).
pub const MAX_DEVICE_NAME_LEN: usize = 15;

// ============================================
// TunDevice Trait
// ============================================

/// Abstract interface for tun/tap device operations.
///
/// # Data Format
/// - `Tun`: raw IP packets, no link-layer header
/// - `Tap`: full Ethernet frames
///
/// Every successful `read` yields exactly one packet, never a partial or
/// merged one, and every `write` injects exactly one packet.
///
/// Implementations are `Debug` so a shared `Arc<dyn TunDevice>` can be
/// logged and can sit in reports.
///
/// # Example
/// ```ignore
/// async fn drain<T: TunDevice>(tun: &T, mtu: usize) -> Result<()> {
///     let mut buf = vec![0u8; mtu];
///     loop {
///         let len = tun.read(&mut buf).await?;
///         // One packet in buf[..len]
///     }
/// }
/// ```
#[async_trait]
pub trait TunDevice: Send + Sync + std::fmt::Debug {
    /// Reads one packet from the device.
    ///
    /// # Returns
    /// Number of bytes read
    ///
    /// # Errors
    /// Returns error if read fails
    async fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Writes one packet to the device.
    ///
    /// # Returns
    /// Number of bytes written
    ///
    /// # Errors
    /// Returns error if write fails
    async fn write(&self, buf: &[u8]) -> Result<usize>;

    /// Returns the device name.
    fn name(&self) -> &str;

    /// Returns the device kind.
    fn kind(&self) -> InterfaceKind;
}

// ============================================
// TunConfig
// ============================================

/// Configuration for tun/tap device creation.
///
/// # Example
/// ```
/// use tunpair_common::InterfaceKind;
/// use tunpair_transport::traits::TunConfig;
///
/// let config = TunConfig::new(InterfaceKind::Tap).with_name("tunpair0");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunConfig {
    /// Device kind.
    pub kind: InterfaceKind,
    /// Requested device name; empty lets the kernel pick `tunN`/`tapN`.
    pub name: String,
}

impl TunConfig {
    /// Creates a configuration with a kernel-assigned name.
    #[must_use]
    pub fn new(kind: InterfaceKind) -> Self {
        Self {
            kind,
            name: String::new(),
        }
    }

    /// Sets the requested device name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if the name is too long or contains invalid characters.
    pub fn validate(&self) -> Result<()> {
        if self.name.len() > MAX_DEVICE_NAME_LEN {
            return Err(TransportError::invalid_config(
                "device_name",
                format!("cannot exceed {MAX_DEVICE_NAME_LEN} characters"),
            ));
        }

        if self
            .name
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '\0')
        {
            return Err(TransportError::invalid_config(
                "device_name",
                "cannot contain whitespace, '/' or NUL",
            ));
        }

        Ok(())
    }
}

impl Default for TunConfig {
    fn default() -> Self {
        Self::new(InterfaceKind::Tun)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tun_config_defaults() {
        let config = TunConfig::default();

        assert_eq!(config.kind, InterfaceKind::Tun);
        assert!(config.name.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tun_config_validation() {
        assert!(TunConfig::new(InterfaceKind::Tap).with_name("tap7").validate().is_ok());

        // Name too long
        let config = TunConfig::new(InterfaceKind::Tun).with_name("a".repeat(16));
        assert!(config.validate().is_err());

        // Bad characters
        let config = TunConfig::new(InterfaceKind::Tun).with_name("tun 0");
        assert!(config.validate().is_err());
        let config = TunConfig::new(InterfaceKind::Tun).with_name("tun/0");
        assert!(config.validate().is_err());
    }
}
