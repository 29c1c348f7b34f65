// ============================================
// File: crates/tunpair-node/src/cli.rs
// ============================================
//! # Command Line
//!
//! ## Creation Reason
//! Defines the `tunpair` command line and maps it onto `TunnelOptions`.
//!
//! ## Usage
//! ```bash
//! # Responder: listen on port 8000, addresses 10.253.0.1/30
//! tunpair -s -ip 0.0.0.0:8000
//!
//! # Initiator: dial the responder, tap device, MTU 1400
//! tunpair -c -ip 198.51.100.7:8000 -tun-type tap -mtu 1400
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Long options are also accepted with a single dash (`-ip`, `-mtu`,
//!   `-tun-type`); [`normalize_args`] rewrites them before clap sees them
//! - Role exclusivity and ranges are checked in `config`, not by clap,
//!   so every validation error goes through one path
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{TunnelOptions, DEFAULT_ENDPOINT, DEFAULT_MTU};

/// Long options that may also be spelled with a single dash.
const SINGLE_DASH_LONGS: &[&str] = &["ip", "mtu", "tun-type", "subnet", "dev", "config", "log-level"];

/// Point-to-point tun/tap tunnel over TCP
///
/// One end listens (-s), the other dials (-c). Each end creates a virtual
/// interface and forwards its packets to the peer.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "tunpair")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Act as responder: listen on -ip and accept one peer
    #[arg(short = 's')]
    pub server: bool,

    /// Act as initiator: dial -ip
    #[arg(short = 'c')]
    pub client: bool,

    /// Endpoint to listen on or dial (host:port)
    #[arg(long = "ip", value_name = "HOST:PORT", default_value = DEFAULT_ENDPOINT)]
    pub ip: String,

    /// Interface MTU and packet buffer size (0-65535)
    #[arg(long, default_value_t = DEFAULT_MTU, allow_negative_numbers = true)]
    pub mtu: i64,

    /// Interface kind: tun or tap
    #[arg(long = "tun-type", value_name = "KIND", default_value = "tun")]
    pub tun_type: String,

    /// Tunnel subnet; responder gets .1, initiator .2 [default: 10.253.0.0/30]
    #[arg(long, value_name = "A.B.C.D/LEN")]
    pub subnet: Option<String>,

    /// Device name hint (kernel picks tunN/tapN when absent)
    #[arg(long, value_name = "NAME")]
    pub dev: Option<String>,

    /// Optional TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Parses the process arguments, accepting single-dash long options.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Converts into unvalidated tunnel options.
    #[must_use]
    pub fn tunnel_options(&self) -> TunnelOptions {
        TunnelOptions {
            responder: self.server,
            initiator: self.client,
            endpoint: Some(self.ip.clone()),
            mtu: Some(self.mtu),
            tun_type: Some(self.tun_type.clone()),
            subnet: self.subnet.clone(),
            device_name: self.dev.clone(),
        }
    }
}

/// Rewrites `-ip`, `-mtu`, `-tun-type`, ... to their `--` form.
///
/// Short flags (`-s`, `-c`), values and everything after `--` are left
/// untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut passthrough = false;

    for (i, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();

        // argv[0] and anything after "--" pass through
        if i == 0 || passthrough {
            out.push(arg);
            continue;
        }
        if arg == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }

        let rewritten = arg.to_str().and_then(|s| {
            let rest = s.strip_prefix('-').filter(|r| !r.starts_with('-'))?;
            let name = rest.split_once('=').map_or(rest, |(name, _)| name);
            SINGLE_DASH_LONGS
                .contains(&name)
                .then(|| OsString::from(format!("-{s}")))
        });
        out.push(rewritten.unwrap_or(arg));
    }

    out
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(normalize_args(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_normalize_single_dash_longs() {
        let args = normalize_args(["tunpair", "-s", "-ip", "0.0.0.0:8000", "-mtu=1400", "-tun-type", "tap"]);
        assert_eq!(
            args,
            ["tunpair", "-s", "--ip", "0.0.0.0:8000", "--mtu=1400", "--tun-type", "tap"]
                .map(OsString::from)
        );
    }

    #[test]
    fn test_normalize_leaves_values_and_passthrough() {
        let args = normalize_args(["tunpair", "-c", "--ip", "h:1", "--mtu", "-5", "--", "-ip"]);
        assert_eq!(
            args,
            ["tunpair", "-c", "--ip", "h:1", "--mtu", "-5", "--", "-ip"].map(OsString::from)
        );
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["tunpair", "-s"]);

        assert!(cli.server);
        assert!(!cli.client);
        assert_eq!(cli.ip, "0.0.0.0:80");
        assert_eq!(cli.mtu, 1500);
        assert_eq!(cli.tun_type, "tun");
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_go_style_flags() {
        let cli = parse(&["tunpair", "-c", "-ip", "192.0.2.1:9000", "-mtu", "1280", "-tun-type", "TAP"]);

        assert!(cli.client);
        assert_eq!(cli.ip, "192.0.2.1:9000");
        assert_eq!(cli.mtu, 1280);
        assert_eq!(cli.tun_type, "TAP");
    }

    #[test]
    fn test_negative_mtu_reaches_validation() {
        let cli = parse(&["tunpair", "-s", "-mtu", "-5"]);
        assert_eq!(cli.mtu, -5);

        let err = cli
            .tunnel_options()
            .resolve(&crate::config::FileConfig::default())
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);
    }

    #[test]
    fn test_extra_options() {
        let cli = parse(&[
            "tunpair", "-s", "--subnet", "10.9.9.0/30", "--dev", "tp0", "-log-level", "debug",
        ]);

        let options = cli.tunnel_options();
        assert_eq!(options.subnet.as_deref(), Some("10.9.9.0/30"));
        assert_eq!(options.device_name.as_deref(), Some("tp0"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }
}
