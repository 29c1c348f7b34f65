// ============================================
// File: crates/tunpair-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Parsing the shared value types (role, interface kind, subnet) can fail;
//! this is the error those parsers return. Higher crates wrap it.
//!
//! ## Main Functionality
//! - `CommonError`: Bad value for a named field
//! - `Result<T>`: Type alias using `CommonError`
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::fmt;
use thiserror::Error;

/// Result type for value parsing.
pub type Result<T> = std::result::Result<T, CommonError>;

/// A value that cannot be used.
///
/// # Example
/// ```
/// use tunpair_common::error::{CommonError, Result};
///
/// fn check_endpoint(endpoint: &str) -> Result<()> {
///     if !endpoint.contains(':') {
///         return Err(CommonError::invalid_value("ip", "expected host:port"));
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// The value does not parse or is not allowed.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field or option the value was given for
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// A numeric value outside its allowed range.
    #[error("'{field}' out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        /// Field or option the value was given for
        field: String,
        /// The rejected value
        value: String,
        /// Smallest allowed value
        min: String,
        /// Largest allowed value
        max: String,
    },
}

impl CommonError {
    /// Creates an `InvalidValue` error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `OutOfRange` error.
    pub fn out_of_range(
        field: impl Into<String>,
        value: impl fmt::Display,
        min: impl fmt::Display,
        max: impl fmt::Display,
    ) -> Self {
        Self::OutOfRange {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    /// Name of the offending field.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::InvalidValue { field, .. } | Self::OutOfRange { field, .. } => field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommonError::invalid_value("tun-type", "expected tun or tap");
        assert_eq!(err.to_string(), "Invalid value for 'tun-type': expected tun or tap");

        let err = CommonError::out_of_range("mtu", -5, 0, 65535);
        assert_eq!(err.to_string(), "'mtu' out of range: -5 not in [0, 65535]");
    }

    #[test]
    fn test_field() {
        assert_eq!(CommonError::invalid_value("subnet", "bad").field(), "subnet");
        assert_eq!(CommonError::out_of_range("subnet", 31, 0, 30).field(), "subnet");
    }
}
