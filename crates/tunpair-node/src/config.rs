// ============================================
// File: crates/tunpair-node/src/config.rs
// ============================================
//! # Tunnel Configuration
//!
//! ## Creation Reason
//! Turns command-line options and an optional TOML file into one
//! immutable, validated `TunnelConfig` that every component reads from.
//!
//! ## Main Functionality
//! - `FileConfig`: optional TOML file with site defaults
//! - `TunnelOptions`: raw, unvalidated values from the command line
//! - `TunnelOptions::resolve`: merge + validate into `TunnelConfig`
//!
//! ## Precedence
//! command line > config file > built-in default
//!
//! ## Example Configuration
//! ```toml
//! [tunnel]
//! subnet = "10.253.0.0/30"
//! device_name = "tunpair0"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Validation runs before any device or socket is touched
//! - MTU is range-checked as a signed integer so `-5` is reported as
//!   out of range instead of a parse failure
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::Path;

use serde::{Deserialize, Serialize};

use tunpair_common::{InterfaceAddress, InterfaceKind, Role, TunnelSubnet};
use tunpair_transport::traits::TunConfig;

use crate::error::{NodeError, Result};

// ============================================
// Defaults
// ============================================

/// Endpoint used when `-ip` is not given.
pub const DEFAULT_ENDPOINT: &str = "0.0.0.0:80";

/// MTU used when `-mtu` is not given.
pub const DEFAULT_MTU: i64 = 1500;

/// Largest MTU the 16-bit frame length can carry.
pub const MAX_MTU: i64 = u16::MAX as i64;

// ============================================
// FileConfig
// ============================================

/// Optional TOML configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Tunnel defaults.
    #[serde(default)]
    pub tunnel: TunnelSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Does not log: it runs before the subscriber exists, since the file
    /// may set the log level.
    ///
    /// # Errors
    /// Returns `ConfigLoad` if the file cannot be read or parsed.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NodeError::config_load(&path_str, e.to_string()))?;

        Self::parse(&content).map_err(|e| match e {
            NodeError::ConfigLoad { reason, .. } => NodeError::config_load(&path_str, reason),
            other => other,
        })
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigLoad` on malformed TOML and `ConfigInvalid` on bad values.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| NodeError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.tunnel.device_name {
            validate_device_name(name, "tunnel.device_name")?;
        }
        Ok(())
    }
}

/// `[tunnel]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelSection {
    /// Tunnel subnet holding both ends.
    #[serde(default)]
    pub subnet: TunnelSubnet,

    /// Device name hint; absent lets the kernel choose.
    #[serde(default)]
    pub device_name: Option<String>,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// TunnelOptions
// ============================================

/// Unvalidated tunnel options as given on the command line.
///
/// `None` means "not given": the file value or built-in default applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelOptions {
    /// `-s`: act as responder.
    pub responder: bool,
    /// `-c`: act as initiator.
    pub initiator: bool,
    /// `-ip host:port`.
    pub endpoint: Option<String>,
    /// `-mtu`.
    pub mtu: Option<i64>,
    /// `-tun-type tun|tap`.
    pub tun_type: Option<String>,
    /// `--subnet a.b.c.d/len`.
    pub subnet: Option<String>,
    /// `--dev name`.
    pub device_name: Option<String>,
}

impl TunnelOptions {
    /// Merges with `file` and validates.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first invalid field.
    pub fn resolve(self, file: &FileConfig) -> Result<TunnelConfig> {
        let role = match (self.responder, self.initiator) {
            (true, false) => Role::Responder,
            (false, true) => Role::Initiator,
            (true, true) => {
                return Err(NodeError::config_invalid(
                    "role",
                    "-s and -c are mutually exclusive",
                ))
            }
            (false, false) => {
                return Err(NodeError::config_invalid(
                    "role",
                    "exactly one of -s or -c is required",
                ))
            }
        };

        let mtu = validate_mtu(self.mtu.unwrap_or(DEFAULT_MTU))?;

        let kind = match self.tun_type.as_deref() {
            Some(s) => s
                .parse::<InterfaceKind>()
                .map_err(|e| NodeError::config_invalid("tun-type", e.to_string()))?,
            None => InterfaceKind::default(),
        };

        let endpoint = self.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        validate_endpoint(&endpoint)?;

        let subnet = match self.subnet.as_deref() {
            Some(s) => s
                .parse::<TunnelSubnet>()
                .map_err(|e| NodeError::config_invalid("subnet", e.to_string()))?,
            None => file.tunnel.subnet,
        };

        let device_name = self
            .device_name
            .or_else(|| file.tunnel.device_name.clone())
            .filter(|name| !name.is_empty());
        if let Some(name) = &device_name {
            validate_device_name(name, "dev")?;
        }

        Ok(TunnelConfig {
            role,
            endpoint,
            mtu,
            kind,
            subnet,
            device_name,
        })
    }
}

fn validate_mtu(mtu: i64) -> Result<u16> {
    u16::try_from(mtu).map_err(|_| {
        NodeError::config_invalid("mtu", format!("must be between 0 and {MAX_MTU}, got {mtu}"))
    })
}

fn validate_endpoint(endpoint: &str) -> Result<()> {
    let Some((host, port)) = endpoint.rsplit_once(':') else {
        return Err(NodeError::config_invalid(
            "ip",
            format!("'{endpoint}' is not in host:port form"),
        ));
    };

    if host.is_empty() {
        return Err(NodeError::config_invalid(
            "ip",
            format!("'{endpoint}' has no host"),
        ));
    }

    port.parse::<u16>().map_err(|_| {
        NodeError::config_invalid("ip", format!("'{port}' is not a valid port"))
    })?;

    Ok(())
}

fn validate_device_name(name: &str, field: &str) -> Result<()> {
    TunConfig::new(InterfaceKind::Tun)
        .with_name(name)
        .validate()
        .map_err(|e| match e {
            tunpair_transport::TransportError::InvalidConfig { reason, .. } => {
                NodeError::config_invalid(field, reason)
            }
            other => NodeError::config_invalid(field, other.to_string()),
        })
}

// ============================================
// TunnelConfig
// ============================================

/// Validated, immutable tunnel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
    role: Role,
    endpoint: String,
    mtu: u16,
    kind: InterfaceKind,
    subnet: TunnelSubnet,
    device_name: Option<String>,
}

impl TunnelConfig {
    /// Returns the role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the endpoint to dial or listen on.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the MTU, also the pump buffer size.
    #[must_use]
    pub const fn mtu(&self) -> u16 {
        self.mtu
    }

    /// Returns the interface kind.
    #[must_use]
    pub const fn kind(&self) -> InterfaceKind {
        self.kind
    }

    /// Returns the tunnel subnet.
    #[must_use]
    pub const fn subnet(&self) -> TunnelSubnet {
        self.subnet
    }

    /// Returns the device name hint, if any.
    #[must_use]
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    /// Returns this end's tunnel address.
    #[must_use]
    pub fn address(&self) -> InterfaceAddress {
        self.subnet.address_for(self.role)
    }
}

// ============================================
// Tests
// ============================================
