// ============================================
// File: crates/tunpair-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the small set of domain types every tunpair crate agrees
//! on: which end of the tunnel a process is, which kind of virtual
//! interface it owns, and which addresses the two ends use.
//!
//! ## Main Functionality
//! - `Role`: Initiator (dials) or Responder (listens)
//! - `InterfaceKind`: layer-3 `tun` or layer-2 `tap`
//! - `TunnelSubnet`: the point-to-point subnet both ends live in
//! - `InterfaceAddress`: an IPv4 address with its prefix length (CIDR)
//!
//! ## Addressing
//! ```text
//! subnet 10.253.0.0/30
//!   ├── 10.253.0.1/30  Responder
//!   └── 10.253.0.2/30  Initiator
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Prefixes longer than /30 leave no room for both ends and are rejected
//! - `InterfaceKind` parsing is case-insensitive (`TUN`, `Tap`, ...)
//! - Keep Display output stable, the `ip` command consumes it verbatim
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Default tunnel subnet shared by both ends.
pub const DEFAULT_SUBNET: TunnelSubnet = TunnelSubnet {
    network: Ipv4Addr::new(10, 253, 0, 0),
    prefix_len: 30,
};

/// Longest prefix that still holds the `.1` and `.2` host addresses.
pub const MAX_TUNNEL_PREFIX: u8 = 30;

// ============================================
// Role
// ============================================

/// Which end of the tunnel this process is.
///
/// Immutable for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Dials the peer.
    Initiator,
    /// Listens and accepts exactly one peer.
    Responder,
}

impl Role {
    /// Host number of this role inside the tunnel subnet.
    #[must_use]
    pub const fn host_id(self) -> u32 {
        match self {
            Self::Responder => 1,
            Self::Initiator => 2,
        }
    }

    /// Returns the role on the other end of the tunnel.
    #[must_use]
    pub const fn peer(self) -> Self {
        match self {
            Self::Initiator => Self::Responder,
            Self::Responder => Self::Initiator,
        }
    }

    /// Returns the lowercase role name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initiator => "initiator",
            Self::Responder => "responder",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// InterfaceKind
// ============================================

/// Kind of virtual network interface.
///
/// - `Tun`: each read/write carries one IP packet
/// - `Tap`: each read/write carries one Ethernet frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    /// Layer-3 device.
    #[default]
    Tun,
    /// Layer-2 device.
    Tap,
}

impl InterfaceKind {
    /// Returns the lowercase kind name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tun => "tun",
            Self::Tap => "tap",
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterfaceKind {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tun" => Ok(Self::Tun),
            "tap" => Ok(Self::Tap),
            _ => Err(CommonError::invalid_value(
                "tun-type",
                format!("'{s}' is not one of: tun, tap"),
            )),
        }
    }
}

// ============================================
// InterfaceAddress
// ============================================

/// IPv4 address plus prefix length, displayed in CIDR notation.
///
/// # Example
/// ```
/// use tunpair_common::types::InterfaceAddress;
/// use std::net::Ipv4Addr;
///
/// let addr = InterfaceAddress::new(Ipv4Addr::new(10, 253, 0, 1), 30);
/// assert_eq!(addr.to_string(), "10.253.0.1/30");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceAddress {
    addr: Ipv4Addr,
    prefix_len: u8,
}

impl InterfaceAddress {
    /// Creates a new `InterfaceAddress`.
    #[must_use]
    pub const fn new(addr: Ipv4Addr, prefix_len: u8) -> Self {
        Self { addr, prefix_len }
    }

    /// Returns the host address.
    #[must_use]
    pub const fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    /// Returns the prefix length.
    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }
}

impl fmt::Display for InterfaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

// ============================================
// TunnelSubnet
// ============================================

/// Point-to-point subnet holding both tunnel ends.
///
/// The network address is always stored masked, so `10.253.0.5/30`
/// parses to `10.253.0.4/30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TunnelSubnet {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl TunnelSubnet {
    /// Creates a subnet, masking `network` down to `prefix_len` bits.
    ///
    /// # Errors
    /// Returns `OutOfRange` if `prefix_len` exceeds [`MAX_TUNNEL_PREFIX`].
    pub fn new(network: Ipv4Addr, prefix_len: u8) -> Result<Self, CommonError> {
        if prefix_len > MAX_TUNNEL_PREFIX {
            return Err(CommonError::out_of_range("subnet", prefix_len, 0, MAX_TUNNEL_PREFIX));
        }
        let network = Ipv4Addr::from(u32::from(network) & prefix_mask(prefix_len));
        Ok(Self {
            network,
            prefix_len,
        })
    }

    /// Returns the (masked) network address.
    #[must_use]
    pub const fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Returns the prefix length.
    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns the interface address assigned to `role`.
    #[must_use]
    pub fn address_for(&self, role: Role) -> InterfaceAddress {
        let host = u32::from(self.network) + role.host_id();
        InterfaceAddress::new(Ipv4Addr::from(host), self.prefix_len)
    }
}

impl Default for TunnelSubnet {
    fn default() -> Self {
        DEFAULT_SUBNET
    }
}

impl fmt::Display for TunnelSubnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for TunnelSubnet {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (network, prefix) = s.split_once('/').ok_or_else(|| {
            CommonError::invalid_value("subnet", "must be in CIDR notation (e.g. 10.253.0.0/30)")
        })?;

        let network: Ipv4Addr = network
            .parse()
            .map_err(|_| CommonError::invalid_value("subnet", "invalid network address"))?;

        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| CommonError::invalid_value("subnet", "invalid prefix length"))?;

        Self::new(network, prefix_len)
    }
}

impl TryFrom<String> for TunnelSubnet {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TunnelSubnet> for String {
    fn from(subnet: TunnelSubnet) -> Self {
        subnet.to_string()
    }
}

fn prefix_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        !0u32 << (32 - u32::from(prefix_len))
    }
}

// ============================================
// Tests
// ============================================
