// ============================================
// File: crates/tunpair-node/src/lifecycle.rs
// ============================================
//! # Lifecycle Controller
//!
//! ## Creation Reason
//! Owns the process-wide, single-fire cancellation signal. Every long
//! running activity (dial, accept, both pumps, the signal listener)
//! selects on it, so whichever event ends the run stops everything else
//! without waiting for traffic.
//!
//! ## Main Functionality
//! - `Lifecycle::cancel`: Running -> Cancelled, first caller wins
//! - `Lifecycle::cancelled`: await the transition
//! - `Lifecycle::spawn_signal_listener`: SIGHUP / SIGINT / SIGQUIT
//!
//! ## State Machine
//! ```text
//!   ┌─────────┐  signal | setup error | pump ended  ┌───────────┐
//!   │ Running │ ──────────────────────────────────► │ Cancelled │
//!   └─────────┘                                     └───────────┘
//!                   later triggers: logged, ignored
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only the first `cancel` records a reason; keep it that way, the exit
//!   status is derived from it
//! - Signal handlers are installed before the listener task is spawned,
//!   so a signal right after startup is never lost
//!
//! ## Last Modified
//! v0.1.0 - Initial lifecycle controller

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{NodeError, Result};

// ============================================
// CancelReason
// ============================================

/// Why the run was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// A termination signal arrived.
    Signal(&'static str),
    /// Interface or connection setup failed.
    SetupFailed(String),
    /// A forwarding pump hit an I/O or protocol error.
    PumpFailed(String),
    /// The peer closed the connection on a frame boundary.
    PeerClosed,
}

impl CancelReason {
    /// Returns `true` if the run ended without an error.
    #[must_use]
    pub const fn is_graceful(&self) -> bool {
        matches!(self, Self::Signal(_) | Self::PeerClosed)
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "received {name}"),
            Self::SetupFailed(reason) => write!(f, "setup failed: {reason}"),
            Self::PumpFailed(reason) => write!(f, "forwarding failed: {reason}"),
            Self::PeerClosed => f.write_str("peer closed the connection"),
        }
    }
}

// ============================================
// Lifecycle
// ============================================

struct Inner {
    state: watch::Sender<bool>,
    reason: Mutex<Option<CancelReason>>,
}

/// Process-wide cancellation handle. Clones share the same state.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl Lifecycle {
    /// Creates a controller in the `Running` state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                state,
                reason: Mutex::new(None),
            }),
        }
    }

    /// Cancels the run.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// run was already cancelled.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        {
            let mut slot = self.inner.reason.lock();
            if let Some(first) = slot.as_ref() {
                debug!(ignored = %reason, first = %first, "Already cancelled");
                return false;
            }
            info!("Shutting down: {}", reason);
            *slot = Some(reason);
        }

        self.inner.state.send_replace(true);
        true
    }

    /// Returns `true` once cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.state.borrow()
    }

    /// Returns the first cancellation reason, if cancelled.
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.reason.lock().clone()
    }

    /// Completes once the run is cancelled.
    ///
    /// Cancel-safe; completes immediately if already cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.inner.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Installs termination signal handlers and spawns the listener task.
    ///
    /// The task cancels the run on the first signal and exits as soon as
    /// the run is cancelled for any reason.
    ///
    /// # Errors
    /// Returns `Internal` if the handlers cannot be installed.
    pub fn spawn_signal_listener(&self) -> Result<JoinHandle<()>> {
        let mut signals = TerminationSignals::install()
            .map_err(|e| NodeError::internal(format!("installing signal handlers: {e}")))?;
        let lifecycle = self.clone();

        Ok(tokio::spawn(async move {
            tokio::select! {
                () = lifecycle.cancelled() => {
                    debug!("Signal listener exiting");
                }
                name = signals.recv() => {
                    info!(signal = name, "Received termination signal");
                    lifecycle.cancel(CancelReason::Signal(name));
                }
            }
        }))
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

// ============================================
// TerminationSignals
// ============================================

#[cfg(unix)]
struct TerminationSignals {
    hangup: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            hangup: signal(SignalKind::hangup())?,
            interrupt: signal(SignalKind::interrupt())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.quit.recv() => "SIGQUIT",
        }
    }
}

#[cfg(not(unix))]
struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "Ctrl+C",
            // Without a handler, wait for cancellation from another source
            Err(_) => std::future::pending().await,
        }
    }
}

// ============================================
// Tests
// ============================================
