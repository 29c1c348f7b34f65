// ============================================
// File: crates/tunpair-transport/src/tun/linux.rs
// ============================================
//! # Linux tun/tap Device
//!
//! ## Creation Reason
//! The real device behind `TunDevice` on Linux: a non-persistent
//! interface allocated through the `/dev/net/tun` clone device.
//!
//! ## Allocation
//! 1. Open `/dev/net/tun` read/write
//! 2. `TUNSETIFF` with `IFF_TUN` or `IFF_TAP`, always with `IFF_NO_PI`
//! 3. Take the name the kernel wrote back (`tun0`, `tap3`, ...)
//! 4. `O_NONBLOCK` + `AsyncFd`, so reads and writes park on the reactor
//!
//! Addressing, link state and MTU belong to the configurator.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Needs CAP_NET_ADMIN
//! - Without `IFF_NO_PI` each packet would carry a 4-byte prefix and the
//!   peer would receive it as payload
//! - Dropping the device closes the fd and the kernel removes the link
//!
//! ## Last Modified
//! v0.1.0 - Initial Linux tun/tap implementation

#![cfg(target_os = "linux")]

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

use async_trait::async_trait;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::libc;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tracing::{debug, info};

use tunpair_common::InterfaceKind;

use crate::error::{Result, TransportError};
use crate::traits::{TunConfig, TunDevice};

const CLONE_DEVICE: &str = "/dev/net/tun";

const IFF_TUN: libc::c_short = 0x0001;
const IFF_TAP: libc::c_short = 0x0002;
const IFF_NO_PI: libc::c_short = 0x1000;

// TUNSETIFF = _IOW('T', 202, int)
nix::ioctl_write_ptr_bad!(
    tun_set_iff,
    nix::request_code_write!(b'T', 202, std::mem::size_of::<libc::c_int>()),
    IfReq
);

/// `struct ifreq` as far as `TUNSETIFF` reads it: name + flags.
#[repr(C)]
struct IfReq {
    name: [libc::c_char; libc::IFNAMSIZ],
    flags: libc::c_short,
    // Rest of the ifru union
    _pad: [u8; 22],
}

impl IfReq {
    /// Request for `kind`, asking for `name` (empty = kernel picks).
    fn for_device(kind: InterfaceKind, name: &str) -> Self {
        let mut req = Self {
            name: [0; libc::IFNAMSIZ],
            flags: request_flags(kind),
            _pad: [0; 22],
        };
        // Leave at least one NUL
        for (slot, byte) in req.name[..libc::IFNAMSIZ - 1].iter_mut().zip(name.bytes()) {
            *slot = byte as libc::c_char;
        }
        req
    }

    fn device_name(&self) -> String {
        let bytes: Vec<u8> = self
            .name
            .iter()
            .take_while(|c| **c != 0)
            .map(|c| *c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

const fn request_flags(kind: InterfaceKind) -> libc::c_short {
    let mode = match kind {
        InterfaceKind::Tun => IFF_TUN,
        InterfaceKind::Tap => IFF_TAP,
    };
    mode | IFF_NO_PI
}

fn is_permission_error(errno: Errno) -> bool {
    matches!(errno, Errno::EPERM | Errno::EACCES)
}

// ============================================
// LinuxTun
// ============================================

/// A tun or tap interface owned by this process.
pub struct LinuxTun {
    fd: AsyncFd<File>,
    kind: InterfaceKind,
    name: String,
}

impl LinuxTun {
    /// Allocates the interface described by `config`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// `PermissionDenied` without CAP_NET_ADMIN, `TunCreateFailed` for
    /// anything else (no tun module, name already taken, ...).
    pub fn create(config: TunConfig) -> Result<Self> {
        config.validate()?;
        let kind = config.kind;

        info!(%kind, requested = %config.name, "Allocating virtual device");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(CLONE_DEVICE)
            .map_err(|e| match e.kind() {
                io::ErrorKind::PermissionDenied => TransportError::PermissionDenied {
                    operation: format!("open {CLONE_DEVICE}"),
                },
                _ => TransportError::tun_create_failed(kind, &config.name, e.to_string()),
            })?;
        let raw = file.as_raw_fd();

        let mut req = IfReq::for_device(kind, &config.name);
        // SAFETY: `raw` is an open fd and `req` lives across the call
        if let Err(errno) = unsafe { tun_set_iff(raw, &mut req) } {
            return Err(if is_permission_error(errno) {
                TransportError::PermissionDenied {
                    operation: "TUNSETIFF".into(),
                }
            } else {
                TransportError::tun_create_failed(kind, &config.name, format!("TUNSETIFF: {errno}"))
            });
        }
        let name = req.device_name();
        debug!(%name, "Kernel assigned device");

        set_nonblocking(raw)
            .map_err(|e| TransportError::tun_create_failed(kind, &name, format!("O_NONBLOCK: {e}")))?;

        let fd = AsyncFd::new(file)
            .map_err(|e| TransportError::tun_create_failed(kind, &name, format!("reactor: {e}")))?;

        Ok(Self { fd, kind, name })
    }

    /// Waits for `interest` and runs `op` until it stops returning `EAGAIN`.
    async fn with_ready<F>(&self, interest: Interest, mut op: F) -> io::Result<usize>
    where
        F: FnMut(RawFd) -> io::Result<usize>,
    {
        loop {
            let mut guard = self.fd.ready(interest).await?;
            match guard.try_io(|inner| op(inner.get_ref().as_raw_fd())) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}

fn set_nonblocking(fd: RawFd) -> nix::Result<()> {
    let current = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
    fcntl(fd, FcntlArg::F_SETFL(current | OFlag::O_NONBLOCK))?;
    Ok(())
}

#[async_trait]
impl TunDevice for LinuxTun {
    async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.with_ready(Interest::READABLE, |fd| {
            // SAFETY: `buf` is valid for `buf.len()` bytes of writes
            let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
            Errno::result(n).map(isize::unsigned_abs).map_err(io::Error::from)
        })
        .await
        .map_err(|e| TransportError::TunReadFailed {
            reason: e.to_string(),
        })
    }

    async fn write(&self, buf: &[u8]) -> Result<usize> {
        self.with_ready(Interest::WRITABLE, |fd| {
            // SAFETY: `buf` is valid for `buf.len()` bytes of reads
            let n = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
            Errno::result(n).map(isize::unsigned_abs).map_err(io::Error::from)
        })
        .await
        .map_err(|e| TransportError::TunWriteFailed {
            reason: e.to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> InterfaceKind {
        self.kind
    }
}

impl Drop for LinuxTun {
    fn drop(&mut self) {
        debug!(name = %self.name, "Closing virtual device");
    }
}

impl std::fmt::Debug for LinuxTun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinuxTun")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Allocation itself needs CAP_NET_ADMIN; these cover the request.

    #[test]
    fn test_request_carries_name_and_flags() {
        let req = IfReq::for_device(InterfaceKind::Tun, "tp0");
        assert_eq!(req.device_name(), "tp0");
        assert_eq!(req.flags, IFF_TUN | IFF_NO_PI);

        let req = IfReq::for_device(InterfaceKind::Tap, "");
        assert_eq!(req.device_name(), "");
        assert_eq!(req.flags, IFF_TAP | IFF_NO_PI);
    }

    #[test]
    fn test_long_name_keeps_terminator() {
        let req = IfReq::for_device(InterfaceKind::Tun, &"x".repeat(32));
        assert_eq!(req.device_name().len(), libc::IFNAMSIZ - 1);
        assert_eq!(req.name[libc::IFNAMSIZ - 1], 0);
    }

    #[test]
    fn test_tun_never_sets_tap_bit() {
        assert_eq!(request_flags(InterfaceKind::Tun) & IFF_TAP, 0);
        assert_eq!(request_flags(InterfaceKind::Tap) & IFF_TUN, 0);
    }

    #[test]
    fn test_ifreq_size() {
        // struct ifreq is 40 bytes on 64-bit Linux
        #[cfg(target_pointer_width = "64")]
        assert_eq!(std::mem::size_of::<IfReq>(), 40);
    }

    #[test]
    fn test_permission_errnos() {
        assert!(is_permission_error(Errno::EPERM));
        assert!(is_permission_error(Errno::EACCES));
        assert!(!is_permission_error(Errno::EBUSY));
    }
}
