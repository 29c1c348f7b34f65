// ============================================
// File: crates/tunpair-node/src/engine.rs
// ============================================
//! # Forwarding Engine
//!
//! ## Creation Reason
//! Moves packets between the local virtual interface and the peer
//! connection once both are established.
//!
//! ## Main Functionality
//! - Outbound pump: interface read -> one frame -> connection
//! - Inbound pump: connection frame -> one packet -> interface
//! - Per-direction packet and byte counters
//!
//! ## Pump Flow
//! ```text
//!            ┌──────────── outbound ────────────┐
//!  device ──►│ read ≤ mtu ─► skip empty ─► frame │──► FrameWriter
//!            └───────────────────────────────────┘
//!            ┌──────────── inbound ─────────────┐
//!  device ◄──│ write packet ◄─ skip empty ◄─ frame│◄── FrameReader
//!            └───────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Each pump cancels the whole run when it ends, whatever the cause
//! - Every await inside a pump is raced against cancellation, except that
//!   a frame already being written is finished (bounded by `DRAIN_TIMEOUT`)
//!   so a local shutdown reaches the peer as a clean close
//! - Packets are forwarded strictly in read order; no reordering queues
//!
//! ## Last Modified
//! v0.1.0 - Initial forwarding engine

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use tunpair_transport::framed::{FrameReader, FrameWriter};
use tunpair_transport::traits::TunDevice;
use tunpair_transport::TransportError;

use crate::lifecycle::{CancelReason, Lifecycle};

/// How long a cancelled outbound pump may spend finishing the frame in
/// flight and closing its write half.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================
// Direction / Stats / Outcome
// ============================================

/// Direction a pump moves packets in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Interface to peer connection.
    Outbound,
    /// Peer connection to interface.
    Inbound,
}

impl Direction {
    /// Returns a short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Outbound => "interface->peer",
            Self::Inbound => "peer->interface",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Packet and byte counters for one direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Packets forwarded.
    pub packets: u64,
    /// Payload bytes forwarded.
    pub bytes: u64,
    /// Empty reads or frames that were dropped.
    pub skipped: u64,
}

impl PumpStats {
    fn record(&mut self, len: usize) {
        self.packets += 1;
        self.bytes += len as u64;
    }
}

/// How a pump ended.
#[derive(Debug)]
pub enum PumpOutcome {
    /// Stopped because the run was cancelled elsewhere.
    Cancelled,
    /// The peer closed the connection on a frame boundary.
    PeerClosed,
    /// An I/O or protocol error ended the pump.
    Failed(TransportError),
    /// The pump task panicked or was aborted.
    Aborted(String),
}

impl PumpOutcome {
    /// Returns `true` if the pump ended because of an error.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Aborted(_))
    }
}

/// Final report of one pump.
#[derive(Debug)]
pub struct PumpReport {
    /// Which pump.
    pub direction: Direction,
    /// Traffic counters.
    pub stats: PumpStats,
    /// How it ended.
    pub outcome: PumpOutcome,
}

impl PumpReport {
    /// Cancels the run with the reason this pump ended, if any.
    fn cancel_run(&self, lifecycle: &Lifecycle) {
        let reason = match &self.outcome {
            PumpOutcome::Cancelled => return,
            PumpOutcome::PeerClosed => CancelReason::PeerClosed,
            PumpOutcome::Failed(e) => CancelReason::PumpFailed(format!("{}: {e}", self.direction)),
            PumpOutcome::Aborted(e) => CancelReason::PumpFailed(format!("{}: {e}", self.direction)),
        };
        lifecycle.cancel(reason);
    }
}

/// Reports of both pumps.
#[derive(Debug)]
pub struct ForwardingReport {
    /// Interface to peer.
    pub outbound: PumpReport,
    /// Peer to interface.
    pub inbound: PumpReport,
}

// ============================================
// Pumps
// ============================================

/// Reads packets from `device` and writes each as one frame.
///
/// Runs until cancelled or until a read or write fails. Empty reads are
/// skipped and never sent. On cancellation a partly written frame is
/// completed and the write half shut down, both within `DRAIN_TIMEOUT`.
pub async fn pump_outbound<W>(
    device: Arc<dyn TunDevice>,
    mut writer: FrameWriter<W>,
    mtu: usize,
    lifecycle: Lifecycle,
) -> PumpReport
where
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; mtu];
    let mut stats = PumpStats::default();

    let outcome = loop {
        let len = tokio::select! {
            () = lifecycle.cancelled() => break PumpOutcome::Cancelled,
            result = device.read(&mut buf) => match result {
                Ok(len) => len,
                Err(e) => break PumpOutcome::Failed(e),
            },
        };

        if len == 0 {
            stats.skipped += 1;
            trace!("Skipping empty read");
            continue;
        }

        let sent = {
            let write = writer.write_frame(&buf[..len]);
            tokio::pin!(write);
            tokio::select! {
                result = &mut write => Some(result),
                () = lifecycle.cancelled() => {
                    // Finish the frame in flight so the peer never sees half of it
                    match tokio::time::timeout(DRAIN_TIMEOUT, write).await {
                        Ok(Ok(())) => stats.record(len),
                        Ok(Err(e)) => debug!("Frame in flight lost: {}", e),
                        Err(_) => warn!(len, "Peer stopped reading; frame in flight cut short"),
                    }
                    None
                }
            }
        };

        match sent {
            Some(Ok(())) => {
                trace!(len, "Packet sent to peer");
                stats.record(len);
            }
            Some(Err(e)) => break PumpOutcome::Failed(e),
            None => break PumpOutcome::Cancelled,
        }
    };

    if matches!(outcome, PumpOutcome::Cancelled) {
        // FIN on a frame boundary: the peer reads a clean close
        if let Ok(Err(e)) = tokio::time::timeout(DRAIN_TIMEOUT, writer.shutdown()).await {
            debug!("Shutdown of the write half failed: {}", e);
        }
    }

    finish(Direction::Outbound, stats, outcome, &lifecycle)
}

/// Reads frames from `reader` and writes each payload as one packet.
///
/// Runs until cancelled, until the peer closes, or until a read, decode
/// or write fails. Empty frames are dropped.
pub async fn pump_inbound<R>(
    mut reader: FrameReader<R>,
    device: Arc<dyn TunDevice>,
    lifecycle: Lifecycle,
) -> PumpReport
where
    R: AsyncRead + Unpin,
{
    let mut stats = PumpStats::default();

    let outcome = loop {
        let frame = tokio::select! {
            () = lifecycle.cancelled() => break PumpOutcome::Cancelled,
            result = reader.read_frame() => match result {
                Ok(Some(frame)) => frame,
                Ok(None) => break PumpOutcome::PeerClosed,
                Err(e) => break PumpOutcome::Failed(e),
            },
        };

        if frame.is_empty() {
            stats.skipped += 1;
            trace!("Dropping empty frame");
            continue;
        }

        tokio::select! {
            () = lifecycle.cancelled() => break PumpOutcome::Cancelled,
            result = device.write(&frame) => {
                if let Err(e) = result {
                    break PumpOutcome::Failed(e);
                }
            }
        }

        trace!(len = frame.len(), "Packet written to interface");
        stats.record(frame.len());
    };

    finish(Direction::Inbound, stats, outcome, &lifecycle)
}

fn finish(
    direction: Direction,
    stats: PumpStats,
    outcome: PumpOutcome,
    lifecycle: &Lifecycle,
) -> PumpReport {
    match &outcome {
        PumpOutcome::Failed(e) => warn!(%direction, "Pump failed: {}", e),
        other => debug!(%direction, outcome = ?other, "Pump stopped"),
    }

    let report = PumpReport {
        direction,
        stats,
        outcome,
    };
    report.cancel_run(lifecycle);
    report
}

// ============================================
// ForwardingEngine
// ============================================

/// Runs the two pumps of one session.
#[derive(Debug, Clone)]
pub struct ForwardingEngine {
    lifecycle: Lifecycle,
    mtu: usize,
}

impl ForwardingEngine {
    /// Creates an engine whose outbound buffer holds `mtu` bytes.
    #[must_use]
    pub fn new(mtu: u16, lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle,
            mtu: usize::from(mtu),
        }
    }

    /// Returns the pump buffer size.
    #[must_use]
    pub const fn buffer_size(&self) -> usize {
        self.mtu
    }

    /// Spawns both pumps and waits until both have stopped.
    pub async fn run<R, W>(
        &self,
        device: Arc<dyn TunDevice>,
        reader: FrameReader<R>,
        writer: FrameWriter<W>,
    ) -> ForwardingReport
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!(device = %device.name(), mtu = self.mtu, "Forwarding started");

        let outbound = tokio::spawn(pump_outbound(
            Arc::clone(&device),
            writer,
            self.mtu,
            self.lifecycle.clone(),
        ));
        let inbound = tokio::spawn(pump_inbound(reader, device, self.lifecycle.clone()));

        let outbound = self.join(Direction::Outbound, outbound).await;
        let inbound = self.join(Direction::Inbound, inbound).await;

        info!(
            sent_packets = outbound.stats.packets,
            sent_bytes = outbound.stats.bytes,
            received_packets = inbound.stats.packets,
            received_bytes = inbound.stats.bytes,
            "Forwarding stopped"
        );

        ForwardingReport { outbound, inbound }
    }

    async fn join(&self, direction: Direction, handle: JoinHandle<PumpReport>) -> PumpReport {
        match handle.await {
            Ok(report) => report,
            Err(e) => {
                let report = PumpReport {
                    direction,
                    stats: PumpStats::default(),
                    outcome: PumpOutcome::Aborted(e.to_string()),
                };
                report.cancel_run(&self.lifecycle);
                report
            }
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    use tunpair_common::InterfaceKind;
    use tunpair_core::protocol::FrameCodec;
    use tunpair_transport::tun::MockTun;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    fn codec(mtu: usize) -> FrameCodec {
        FrameCodec::new(mtu).unwrap()
    }

    #[tokio::test]
    async fn test_outbound_frames_packets_in_order() {
        let tun = Arc::new(MockTun::new("tun0", InterfaceKind::Tun));
        let (a, b) = duplex(64 * 1024);
        let lifecycle = Lifecycle::new();

        tun.inject_packets([vec![1; 10], vec![], vec![2; 1500], vec![3; 1]]);

        let pump = tokio::spawn(pump_outbound(
            tun.clone() as Arc<dyn TunDevice>,
            FrameWriter::new(a, codec(1500)),
            1500,
            lifecycle.clone(),
        ));

        let mut reader = FrameReader::new(b, codec(1500));
        for expected in [vec![1u8; 10], vec![2; 1500], vec![3; 1]] {
            let frame = reader.read_frame().await.unwrap().unwrap();
            assert_eq!(&frame[..], &expected[..]);
        }

        lifecycle.cancel(CancelReason::Signal("SIGINT"));
        let report = tokio::time::timeout(WAIT, pump).await.unwrap().unwrap();

        assert!(matches!(report.outcome, PumpOutcome::Cancelled));
        assert_eq!(report.stats.packets, 3);
        assert_eq!(report.stats.bytes, 1511);
        assert_eq!(report.stats.skipped, 1);
    }

    #[tokio::test]
    async fn test_cancel_mid_frame_still_delivers_whole_frame() {
        let tun = Arc::new(MockTun::default());
        // Much smaller than one frame: the write parks part way through
        let (a, b) = duplex(512);
        let lifecycle = Lifecycle::new();

        tun.inject_packet(vec![0x5A; 1500]);

        let pump = tokio::spawn(pump_outbound(
            tun.clone() as Arc<dyn TunDevice>,
            FrameWriter::new(a, codec(1500)),
            1500,
            lifecycle.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        lifecycle.cancel(CancelReason::Signal("SIGINT"));

        let mut reader = FrameReader::new(b, codec(1500));
        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(&frame[..], &[0x5A; 1500][..]);
        // Then a clean close, not a truncated frame
        assert!(reader.read_frame().await.unwrap().is_none());

        let report = tokio::time::timeout(WAIT, pump).await.unwrap().unwrap();
        assert!(matches!(report.outcome, PumpOutcome::Cancelled));
        assert_eq!(report.stats.packets, 1);
    }

    #[tokio::test]
    async fn test_cancel_with_stalled_peer_is_bounded() {
        let tun = Arc::new(MockTun::default());
        let (a, _b) = duplex(512);
        let lifecycle = Lifecycle::new();

        tun.inject_packet(vec![1; 1500]);

        let pump = tokio::spawn(pump_outbound(
            tun.clone() as Arc<dyn TunDevice>,
            FrameWriter::new(a, codec(1500)),
            1500,
            lifecycle.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        lifecycle.cancel(CancelReason::Signal("SIGHUP"));

        // Nobody reads `_b`; the drain gives up after DRAIN_TIMEOUT
        let report = tokio::time::timeout(WAIT, pump).await.unwrap().unwrap();
        assert!(matches!(report.outcome, PumpOutcome::Cancelled));
        assert_eq!(report.stats.packets, 0);
    }

    #[tokio::test]
    async fn test_outbound_buffer_is_mtu() {
        let tun = Arc::new(MockTun::default());
        let (a, b) = duplex(64 * 1024);
        let lifecycle = Lifecycle::new();

        // Larger than the MTU: the read truncates to the buffer size
        tun.inject_packet(vec![7; 300]);

        let _pump = tokio::spawn(pump_outbound(
            tun.clone() as Arc<dyn TunDevice>,
            FrameWriter::new(a, codec(256)),
            256,
            lifecycle.clone(),
        ));

        let mut reader = FrameReader::new(b, codec(1500));
        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.len(), 256);
        lifecycle.cancel(CancelReason::PeerClosed);
    }

    #[tokio::test]
    async fn test_inbound_writes_payloads_and_drops_empty() {
        let tun = Arc::new(MockTun::default());
        let (a, b) = duplex(64 * 1024);
        let lifecycle = Lifecycle::new();

        let mut writer = FrameWriter::new(a, codec(1500));
        writer.write_frame(b"first").await.unwrap();
        writer.write_frame(b"").await.unwrap();
        writer.write_frame(b"second").await.unwrap();
        drop(writer);

        let report = tokio::time::timeout(
            WAIT,
            pump_inbound(
                FrameReader::new(b, codec(1500)),
                tun.clone() as Arc<dyn TunDevice>,
                lifecycle.clone(),
            ),
        )
        .await
        .unwrap();

        assert_eq!(
            tun.take_written_packets(),
            vec![b"first".to_vec(), b"second".to_vec()]
        );
        assert!(matches!(report.outcome, PumpOutcome::PeerClosed));
        assert_eq!(report.stats.packets, 2);
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(lifecycle.reason(), Some(CancelReason::PeerClosed));
    }

    #[tokio::test]
    async fn test_inbound_oversized_frame_fails_run() {
        let tun = Arc::new(MockTun::default());
        let (mut a, b) = duplex(64 * 1024);
        let lifecycle = Lifecycle::new();

        // Length 2000 announced to a receiver with MTU 1500
        a.write_all(&[0x07, 0xD0]).await.unwrap();

        let report = pump_inbound(
            FrameReader::new(b, codec(1500)),
            tun.clone() as Arc<dyn TunDevice>,
            lifecycle.clone(),
        )
        .await;

        assert!(report.outcome.is_failure());
        assert!(matches!(lifecycle.reason(), Some(CancelReason::PumpFailed(_))));
        assert_eq!(tun.written_count(), 0);
    }

    #[tokio::test]
    async fn test_inbound_truncated_frame_fails_run() {
        let tun = Arc::new(MockTun::default());
        let (mut a, b) = duplex(64 * 1024);
        let lifecycle = Lifecycle::new();

        a.write_all(&[0x00, 0x10, 1, 2, 3]).await.unwrap();
        drop(a);

        let report = pump_inbound(
            FrameReader::new(b, codec(1500)),
            tun as Arc<dyn TunDevice>,
            lifecycle.clone(),
        )
        .await;

        assert!(matches!(
            report.outcome,
            PumpOutcome::Failed(TransportError::Core(_))
        ));
        assert!(!lifecycle.reason().unwrap().is_graceful());
    }

    async fn drain(mut stream: DuplexStream) {
        let mut sink = Vec::new();
        let _ = stream.read_to_end(&mut sink).await;
    }

    #[tokio::test]
    async fn test_engine_device_failure_stops_both_pumps() {
        let tun = Arc::new(MockTun::default());
        let lifecycle = Lifecycle::new();
        let engine = ForwardingEngine::new(1500, lifecycle.clone());
        assert_eq!(engine.buffer_size(), 1500);

        // Outbound writes into `out_peer`; inbound reads from `in_peer`,
        // which stays open and silent
        let (out_local, out_peer) = duplex(64 * 1024);
        let (in_local, _in_peer) = duplex(64 * 1024);
        tokio::spawn(drain(out_peer));

        tun.close();

        let report = tokio::time::timeout(
            WAIT,
            engine.run(
                tun.clone() as Arc<dyn TunDevice>,
                FrameReader::new(in_local, codec(1500)),
                FrameWriter::new(out_local, codec(1500)),
            ),
        )
        .await
        .unwrap();

        assert!(report.outbound.outcome.is_failure());
        assert!(matches!(report.inbound.outcome, PumpOutcome::Cancelled));
        assert!(matches!(lifecycle.reason(), Some(CancelReason::PumpFailed(_))));
    }

    #[tokio::test]
    async fn test_engine_stops_on_external_cancel() {
        let tun = Arc::new(MockTun::default());
        let lifecycle = Lifecycle::new();
        let engine = ForwardingEngine::new(1500, lifecycle.clone());

        let (out_local, _out_peer) = duplex(1024);
        let (in_local, _in_peer) = duplex(1024);

        let run = tokio::spawn({
            let engine = engine.clone();
            let tun = tun.clone() as Arc<dyn TunDevice>;
            async move {
                engine
                    .run(
                        tun,
                        FrameReader::new(in_local, codec(1500)),
                        FrameWriter::new(out_local, codec(1500)),
                    )
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(lifecycle.cancel(CancelReason::Signal("SIGHUP")));

        let report = tokio::time::timeout(WAIT, run).await.unwrap().unwrap();
        assert!(matches!(report.outbound.outcome, PumpOutcome::Cancelled));
        assert!(matches!(report.inbound.outcome, PumpOutcome::Cancelled));
        assert_eq!(lifecycle.reason(), Some(CancelReason::Signal("SIGHUP")));
    }
}
