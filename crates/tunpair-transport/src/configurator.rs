// ============================================
// File: crates/tunpair-transport/src/configurator.rs
// ============================================
//! # Interface Configurator
//!
//! ## Creation Reason
//! Applies layer-3 settings to a freshly created virtual device: the
//! tunnel address, the link state and the MTU.
//!
//! ## Main Functionality
//! - `InterfaceConfigurator`: the three configuration steps as a trait
//! - `IpCommandConfigurator`: runs iproute2's `ip` for each step
//! - `RecordingConfigurator`: records calls and can fail on demand (tests)
//!
//! ## Step Order
//! 1. `ip addr add <a.b.c.d/len> dev <name>`
//! 2. `ip link set up dev <name>`
//! 3. `ip link set mtu <mtu> dev <name>`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every non-zero exit is fatal, including "File exists" from a stale
//!   address; the operator must clean the interface up
//! - Nothing here is undone on exit
//!
//! ## Last Modified
//! v0.1.0 - Initial configurator

use std::fmt;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use tunpair_common::InterfaceAddress;

use crate::error::{Result, TransportError};

// ============================================
// ConfigStep
// ============================================

/// One configuration step, used to report which step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStep {
    /// Assign the tunnel address.
    AssignAddress,
    /// Bring the link up.
    LinkUp,
    /// Set the link MTU.
    SetMtu,
}

impl ConfigStep {
    /// Returns a short human-readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AssignAddress => "assign address",
            Self::LinkUp => "link up",
            Self::SetMtu => "set mtu",
        }
    }
}

impl fmt::Display for ConfigStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// InterfaceConfigurator Trait
// ============================================

/// Applies address, link state and MTU to a named interface.
#[async_trait]
pub trait InterfaceConfigurator: Send + Sync {
    /// Assigns `address` to the interface.
    async fn assign_address(&self, name: &str, address: InterfaceAddress) -> Result<()>;

    /// Brings the interface link up.
    async fn link_up(&self, name: &str) -> Result<()>;

    /// Sets the interface MTU.
    async fn set_mtu(&self, name: &str, mtu: u16) -> Result<()>;
}

// ============================================
// IpCommandConfigurator
// ============================================

/// Configurator backed by the iproute2 `ip` binary.
#[derive(Debug, Clone)]
pub struct IpCommandConfigurator {
    program: String,
}

impl IpCommandConfigurator {
    /// Uses `ip` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("ip")
    }

    /// Uses a specific binary instead of `ip`.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, name: &str, step: ConfigStep, args: &[&str]) -> Result<()> {
        debug!(device = %name, %step, "{} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                TransportError::config_failed(
                    name,
                    step,
                    format!("failed to run {}: {e}", self.program),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransportError::config_failed(
                name,
                step,
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(())
    }
}

impl Default for IpCommandConfigurator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InterfaceConfigurator for IpCommandConfigurator {
    async fn assign_address(&self, name: &str, address: InterfaceAddress) -> Result<()> {
        let cidr = address.to_string();
        self.run(
            name,
            ConfigStep::AssignAddress,
            &["addr", "add", &cidr, "dev", name],
        )
        .await
    }

    async fn link_up(&self, name: &str) -> Result<()> {
        self.run(name, ConfigStep::LinkUp, &["link", "set", "up", "dev", name])
            .await
    }

    async fn set_mtu(&self, name: &str, mtu: u16) -> Result<()> {
        let mtu = mtu.to_string();
        self.run(
            name,
            ConfigStep::SetMtu,
            &["link", "set", "mtu", &mtu, "dev", name],
        )
        .await
    }
}

// ============================================
// RecordingConfigurator
// ============================================

#[cfg(any(test, feature = "mock"))]
pub use recording::{ConfigCall, RecordingConfigurator};

#[cfg(any(test, feature = "mock"))]
mod recording {
    use parking_lot::Mutex;

    use super::{async_trait, ConfigStep, InterfaceAddress, InterfaceConfigurator};
    use crate::error::{Result, TransportError};

    /// A configuration call captured by [`RecordingConfigurator`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ConfigCall {
        /// `assign_address(name, address)`
        AssignAddress(String, InterfaceAddress),
        /// `link_up(name)`
        LinkUp(String),
        /// `set_mtu(name, mtu)`
        SetMtu(String, u16),
    }

    /// In-memory configurator for tests.
    ///
    /// Records every call in order and optionally fails at one step.
    #[derive(Debug, Default)]
    pub struct RecordingConfigurator {
        calls: Mutex<Vec<ConfigCall>>,
        fail_at: Option<ConfigStep>,
    }

    impl RecordingConfigurator {
        /// Creates a configurator where every step succeeds.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a configurator that fails when `step` is reached.
        #[must_use]
        pub fn failing_at(step: ConfigStep) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_at: Some(step),
            }
        }

        /// Returns the calls made so far, in order.
        #[must_use]
        pub fn calls(&self) -> Vec<ConfigCall> {
            self.calls.lock().clone()
        }

        fn record(&self, step: ConfigStep, name: &str, call: ConfigCall) -> Result<()> {
            self.calls.lock().push(call);
            if self.fail_at == Some(step) {
                return Err(TransportError::config_failed(name, step, "injected failure"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl InterfaceConfigurator for RecordingConfigurator {
        async fn assign_address(&self, name: &str, address: InterfaceAddress) -> Result<()> {
            self.record(
                ConfigStep::AssignAddress,
                name,
                ConfigCall::AssignAddress(name.to_owned(), address),
            )
        }

        async fn link_up(&self, name: &str) -> Result<()> {
            self.record(ConfigStep::LinkUp, name, ConfigCall::LinkUp(name.to_owned()))
        }

        async fn set_mtu(&self, name: &str, mtu: u16) -> Result<()> {
            self.record(
                ConfigStep::SetMtu,
                name,
                ConfigCall::SetMtu(name.to_owned(), mtu),
            )
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn test_step_display() {
        assert_eq!(ConfigStep::AssignAddress.to_string(), "assign address");
        assert_eq!(ConfigStep::LinkUp.to_string(), "link up");
        assert_eq!(ConfigStep::SetMtu.to_string(), "set mtu");
    }

    #[tokio::test]
    async fn test_missing_binary_reports_step() {
        let configurator = IpCommandConfigurator::with_program("/nonexistent/tunpair-ip");
        let err = configurator.link_up("tun0").await.unwrap_err();

        assert!(matches!(
            err,
            TransportError::TunConfigFailed {
                step: ConfigStep::LinkUp,
                ..
            }
        ));
        assert!(err.is_setup_error());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        // `false` ignores its arguments and exits 1
        let configurator = IpCommandConfigurator::with_program("false");
        let err = configurator.set_mtu("tun0", 1400).await.unwrap_err();

        assert!(matches!(
            err,
            TransportError::TunConfigFailed {
                step: ConfigStep::SetMtu,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let configurator = IpCommandConfigurator::with_program("true");
        let address = InterfaceAddress::new(Ipv4Addr::new(10, 253, 0, 1), 30);

        assert!(configurator.assign_address("tun0", address).await.is_ok());
        assert!(configurator.link_up("tun0").await.is_ok());
    }

    #[tokio::test]
    async fn test_recording_configurator() {
        let configurator = RecordingConfigurator::failing_at(ConfigStep::LinkUp);
        let address = InterfaceAddress::new(Ipv4Addr::new(10, 253, 0, 2), 30);

        configurator.assign_address("tap0", address).await.unwrap();
        assert!(configurator.link_up("tap0").await.is_err());

        assert_eq!(
            configurator.calls(),
            vec![
                ConfigCall::AssignAddress("tap0".into(), address),
                ConfigCall::LinkUp("tap0".into()),
            ]
        );
    }
}
