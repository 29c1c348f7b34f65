// ============================================
// File: crates/tunpair-node/tests/signals.rs
// ============================================
//! Real termination signals delivered to the test process.
//!
//! Kept in its own test binary: the signal reaches the whole process.

#![cfg(unix)]

use std::time::Duration;

use nix::sys::signal::{raise, Signal};
use tunpair_node::{CancelReason, Lifecycle};

#[tokio::test]
async fn test_sighup_cancels_run() {
    let lifecycle = Lifecycle::new();
    let listener = lifecycle.spawn_signal_listener().unwrap();

    raise(Signal::SIGHUP).unwrap();

    tokio::time::timeout(Duration::from_secs(5), lifecycle.cancelled())
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), listener)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(lifecycle.reason(), Some(CancelReason::Signal("SIGHUP")));
    assert!(lifecycle.reason().is_some_and(|r| r.is_graceful()));

    // A later signal is absorbed by the installed handler and changes nothing
    raise(Signal::SIGQUIT).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(lifecycle.reason(), Some(CancelReason::Signal("SIGHUP")));
}
