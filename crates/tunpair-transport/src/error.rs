// ============================================
// File: crates/tunpair-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for everything that touches the OS: the tun/tap
//! device, the `ip` configurator and the TCP connection to the peer.
//!
//! ## Error Categories
//! 1. **Setup Errors**: device unavailable, configuration step failed,
//!    dial/listen/accept failed. Always fatal, never retried.
//! 2. **Device I/O Errors**: tun/tap read or write failed mid-session
//! 3. **Connection I/O Errors**: TCP read or write failed mid-session
//! 4. **Configuration Errors**: invalid endpoint or device name
//!
//! ## ⚠️ Important Note for Next Developer
//! - Setup errors end the process; do not add retry logic on top
//! - TUN errors usually mean missing CAP_NET_ADMIN
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;

use thiserror::Error;

use tunpair_common::error::CommonError;
use tunpair_core::error::CoreError;

use crate::configurator::ConfigStep;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Device Setup Errors
    // ========================================

    /// Failed to create the tun/tap device.
    #[error("Failed to create {kind} device '{name}': {reason}")]
    TunCreateFailed {
        /// Requested device kind
        kind: String,
        /// Requested device name (empty if kernel-assigned)
        name: String,
        /// Why creation failed
        reason: String,
    },

    /// Permission denied for operation.
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// What operation was denied
        operation: String,
    },

    /// A configuration step on the device failed.
    #[error("Failed to configure device '{name}' ({step}): {reason}")]
    TunConfigFailed {
        /// Device name
        name: String,
        /// Which step failed
        step: ConfigStep,
        /// Why configuration failed
        reason: String,
    },

    // ========================================
    // Connection Setup Errors
    // ========================================

    /// Failed to connect to the peer.
    #[error("Failed to connect to {endpoint}: {reason}")]
    DialFailed {
        /// Endpoint we dialed
        endpoint: String,
        /// Why the dial failed
        reason: String,
    },

    /// Failed to listen on the endpoint.
    #[error("Failed to listen on {endpoint}: {reason}")]
    ListenFailed {
        /// Endpoint we tried to listen on
        endpoint: String,
        /// Why listening failed
        reason: String,
    },

    /// Failed to accept the peer connection.
    #[error("Failed to accept connection: {reason}")]
    AcceptFailed {
        /// Why accept failed
        reason: String,
    },

    // ========================================
    // Session I/O Errors
    // ========================================

    /// Device read failed.
    #[error("Device read failed: {reason}")]
    TunReadFailed {
        /// Why read failed
        reason: String,
    },

    /// Device write failed.
    #[error("Device write failed: {reason}")]
    TunWriteFailed {
        /// Why write failed
        reason: String,
    },

    /// Connection read failed.
    #[error("Connection read failed: {reason}")]
    ConnectionReadFailed {
        /// Why read failed
        reason: String,
    },

    /// Connection write failed.
    #[error("Connection write failed: {reason}")]
    ConnectionWriteFailed {
        /// Why write failed
        reason: String,
    },

    // ========================================
    // Configuration Errors
    // ========================================

    /// Invalid configuration.
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig {
        /// Configuration field name
        field: String,
        /// Why it's invalid
        reason: String,
    },

    /// Endpoint could not be parsed or resolved.
    #[error("Invalid endpoint: {endpoint}")]
    InvalidEndpoint {
        /// The invalid endpoint string
        endpoint: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening when the error occurred
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Framing error from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `TunCreateFailed` error.
    pub fn tun_create_failed(
        kind: impl ToString,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::TunCreateFailed {
            kind: kind.to_string(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `TunConfigFailed` error.
    pub fn config_failed(
        name: impl Into<String>,
        step: ConfigStep,
        reason: impl Into<String>,
    ) -> Self {
        Self::TunConfigFailed {
            name: name.into(),
            step,
            reason: reason.into(),
        }
    }

    /// Creates a `DialFailed` error.
    pub fn dial_failed(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::DialFailed {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `ListenFailed` error.
    pub fn listen_failed(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::ListenFailed {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates an `InvalidConfig` error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this error happened while setting the tunnel up.
    ///
    /// Setup errors are always fatal and are never retried.
    #[must_use]
    pub const fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::TunCreateFailed { .. }
                | Self::PermissionDenied { .. }
                | Self::TunConfigFailed { .. }
                | Self::DialFailed { .. }
                | Self::ListenFailed { .. }
                | Self::AcceptFailed { .. }
        )
    }

    /// Returns `true` if the virtual device could not be allocated.
    #[must_use]
    pub const fn is_device_unavailable(&self) -> bool {
        matches!(
            self,
            Self::TunCreateFailed { .. } | Self::PermissionDenied { .. }
        )
    }

    /// Returns `true` if this is a tun/tap device error.
    #[must_use]
    pub const fn is_tun_error(&self) -> bool {
        matches!(
            self,
            Self::TunCreateFailed { .. }
                | Self::TunConfigFailed { .. }
                | Self::TunReadFailed { .. }
                | Self::TunWriteFailed { .. }
        )
    }

    /// Returns `true` if this error came from the peer connection.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::DialFailed { .. }
                | Self::ListenFailed { .. }
                | Self::AcceptFailed { .. }
                | Self::ConnectionReadFailed { .. }
                | Self::ConnectionWriteFailed { .. }
                | Self::Core(_)
        )
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            context: "unspecified I/O operation".into(),
            source: err,
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::dial_failed("127.0.0.1:9000", "connection refused");
        assert!(err.to_string().contains("127.0.0.1:9000"));
        assert!(err.to_string().contains("connection refused"));

        let err = TransportError::config_failed("tun0", ConfigStep::SetMtu, "exit status 2");
        assert_eq!(
            err.to_string(),
            "Failed to configure device 'tun0' (set mtu): exit status 2"
        );
    }

    #[test]
    fn test_error_classification() {
        let create = TransportError::tun_create_failed("tap", "", "no such device");
        assert!(create.is_setup_error());
        assert!(create.is_device_unavailable());
        assert!(create.is_tun_error());

        let accept = TransportError::AcceptFailed {
            reason: "too many open files".into(),
        };
        assert!(accept.is_setup_error());
        assert!(accept.is_connection_error());

        let read = TransportError::TunReadFailed {
            reason: "bad fd".into(),
        };
        assert!(!read.is_setup_error());
        assert!(read.is_tun_error());
    }

    #[test]
    fn test_core_error_is_connection_error() {
        let err: TransportError = CoreError::truncated(4, 1).into();
        assert!(err.is_connection_error());
        assert!(!err.is_setup_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe");
        let err: TransportError = io_err.into();
        assert!(matches!(err, TransportError::Io { .. }));
    }
}
