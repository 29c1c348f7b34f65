// ============================================
// File: crates/tunpair-transport/src/tun/mock.rs
// ============================================
//! # Mock tun/tap Device Implementation
//!
//! ## Creation Reason
//! Provides a mock device for testing the forwarding engine and session
//! without creating real interfaces or holding root privileges.
//!
//! ## Main Functionality
//! - In-memory packet queues
//! - `inject_packet` feeds packets to `read()`
//! - `wait_for_written` lets a test await packets the engine wrote
//! - `close` makes pending and future reads fail like a vanished device
//! - `MockDeviceFactory` hands a prepared `MockTun` to the interface manager
//!
//! ## Usage in Tests
//! ```ignore
//! use tunpair_common::InterfaceKind;
//! use tunpair_transport::tun::MockTun;
//! use tunpair_transport::traits::TunDevice;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let tun = MockTun::new("mock0", InterfaceKind::Tun);
//! tun.inject_packet(b"test packet".to_vec());
//!
//! let mut buf = [0u8; 1500];
//! let len = tun.read(&mut buf).await.unwrap();
//! assert_eq!(&buf[..len], b"test packet");
//! # }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only - do not use in production
//! - Packet queues are bounded to prevent memory issues
//! - Reads truncate to the caller's buffer, like the kernel does
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use tunpair_common::InterfaceKind;

use crate::error::{Result, TransportError};
use crate::traits::{TunConfig, TunDevice};
use crate::tun::manager::DeviceFactory;

// ============================================
// Constants
// ============================================

/// Maximum number of packets to queue.
const MAX_QUEUE_SIZE: usize = 1000;

// ============================================
// MockTun
// ============================================

/// Mock tun/tap device for testing.
pub struct MockTun {
    /// Device name
    name: String,
    /// Device kind
    kind: InterfaceKind,
    /// Packets waiting to be read (injected for testing)
    read_queue: Mutex<VecDeque<Vec<u8>>>,
    /// Packets that have been written (captured for verification)
    write_queue: Mutex<Vec<Vec<u8>>>,
    /// Set once the device is closed
    closed: AtomicBool,
    /// Wakes the reader on inject or close
    read_notify: Notify,
    /// Wakes tests waiting on written packets
    write_notify: Notify,
}

impl MockTun {
    /// Creates a new mock device.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: InterfaceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            read_queue: Mutex::new(VecDeque::with_capacity(100)),
            write_queue: Mutex::new(Vec::with_capacity(100)),
            closed: AtomicBool::new(false),
            read_notify: Notify::new(),
            write_notify: Notify::new(),
        }
    }

    /// Injects a packet to be returned by a later `read()` call.
    ///
    /// # Panics
    /// Panics if the queue is full (> MAX_QUEUE_SIZE packets).
    pub fn inject_packet(&self, packet: Vec<u8>) {
        let mut queue = self.read_queue.lock();
        assert!(queue.len() < MAX_QUEUE_SIZE, "Mock tun read queue overflow");
        queue.push_back(packet);
        drop(queue);
        self.read_notify.notify_one();
    }

    /// Injects multiple packets at once, preserving order.
    pub fn inject_packets(&self, packets: impl IntoIterator<Item = Vec<u8>>) {
        for packet in packets {
            self.inject_packet(packet);
        }
    }

    /// Takes all packets that have been written to the device.
    ///
    /// This clears the write queue.
    #[must_use]
    pub fn take_written_packets(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.write_queue.lock())
    }

    /// Waits until at least `count` packets are in the write queue.
    pub async fn wait_for_written(&self, count: usize) {
        loop {
            let notified = self.write_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.written_count() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Returns the number of packets waiting to be read.
    #[must_use]
    pub fn pending_read_count(&self) -> usize {
        self.read_queue.lock().len()
    }

    /// Returns the number of packets that have been written.
    #[must_use]
    pub fn written_count(&self) -> usize {
        self.write_queue.lock().len()
    }

    /// Closes the device.
    ///
    /// Queued packets are still returned; once the queue is empty every
    /// read fails.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.read_notify.notify_one();
    }

    /// Returns `true` once [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl TunDevice for MockTun {
    async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            {
                let mut queue = self.read_queue.lock();
                if let Some(packet) = queue.pop_front() {
                    let len = packet.len().min(buf.len());
                    buf[..len].copy_from_slice(&packet[..len]);
                    return Ok(len);
                }
            }

            if self.is_closed() {
                return Err(TransportError::TunReadFailed {
                    reason: "device closed".into(),
                });
            }

            self.read_notify.notified().await;
        }
    }

    async fn write(&self, buf: &[u8]) -> Result<usize> {
        if self.is_closed() {
            return Err(TransportError::TunWriteFailed {
                reason: "device closed".into(),
            });
        }

        let mut queue = self.write_queue.lock();
        if queue.len() >= MAX_QUEUE_SIZE {
            return Err(TransportError::TunWriteFailed {
                reason: "Write queue full".into(),
            });
        }
        queue.push(buf.to_vec());
        drop(queue);
        self.write_notify.notify_waiters();
        Ok(buf.len())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> InterfaceKind {
        self.kind
    }
}

impl std::fmt::Debug for MockTun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTun")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("closed", &self.is_closed())
            .field("pending_reads", &self.pending_read_count())
            .field("written_packets", &self.written_count())
            .finish()
    }
}

impl Default for MockTun {
    fn default() -> Self {
        Self::new("mock0", InterfaceKind::Tun)
    }
}

// ============================================
// MockDeviceFactory
// ============================================

/// Device factory that returns a prepared [`MockTun`].
#[derive(Debug, Default)]
pub struct MockDeviceFactory {
    /// Device handed out on every `open`; `None` simulates a missing driver
    device: Option<Arc<MockTun>>,
    /// Every configuration passed to `open`
    requested: Mutex<Vec<TunConfig>>,
}

impl MockDeviceFactory {
    /// Factory that always returns `device`.
    #[must_use]
    pub fn new(device: Arc<MockTun>) -> Self {
        Self {
            device: Some(device),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Factory that fails like a host without `/dev/net/tun`.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Returns every configuration passed to `open`, in order.
    #[must_use]
    pub fn requested(&self) -> Vec<TunConfig> {
        self.requested.lock().clone()
    }
}

impl DeviceFactory for MockDeviceFactory {
    fn open(&self, config: &TunConfig) -> Result<Arc<dyn TunDevice>> {
        self.requested.lock().push(config.clone());

        match &self.device {
            Some(device) => Ok(Arc::clone(device) as Arc<dyn TunDevice>),
            None => Err(TransportError::tun_create_failed(
                config.kind,
                &config.name,
                "No such device",
            )),
        }
    }
}

// ============================================
// Tests
// ============================================
