// ============================================
// File: crates/tunpair-node/src/session.rs
// ============================================
//! # Tunnel Session
//!
//! ## Creation Reason
//! Runs one tunnel end from start to finish. The same path serves both
//! roles; the role only decides whether the endpoint is dialed or
//! listened on, and which address the interface gets.
//!
//! ## Main Functionality
//! - Create and configure the virtual interface
//! - Establish the single peer connection
//! - Hand both to the forwarding engine
//! - Summarise the run in a `SessionReport`
//!
//! ## Session Flow
//! ```text
//! create ─► configure ─► dial (initiator)          ─► forward ─► report
//!                    └─► listen + accept (responder) ┘
//!   any setup error: cancel + Err      signal at any step: cancel + report
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Setup steps run in this order on purpose: the interface exists and
//!   is addressed before the peer can send anything
//! - Nothing is retried
//!
//! ## Last Modified
//! v0.1.0 - Initial session implementation

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use tunpair_common::{InterfaceAddress, Role};
use tunpair_core::protocol::FrameCodec;
use tunpair_transport::configurator::{InterfaceConfigurator, IpCommandConfigurator};
use tunpair_transport::tcp::{self, TcpConnection, TunnelListener};
use tunpair_transport::tun::{DeviceFactory, InterfaceManager, SystemDeviceFactory, VirtualInterface};
use tunpair_transport::TransportError;

use crate::config::TunnelConfig;
use crate::engine::{ForwardingEngine, ForwardingReport};
use crate::error::{NodeError, Result, EXIT_FAILURE, EXIT_OK};
use crate::lifecycle::{CancelReason, Lifecycle};

// ============================================
// SessionReport
// ============================================

/// Summary of one run.
#[derive(Debug)]
pub struct SessionReport {
    /// Role this end played.
    pub role: Role,
    /// The configured interface, once setup got that far.
    pub interface: Option<VirtualInterface>,
    /// Address this end owns in the tunnel subnet.
    pub address: InterfaceAddress,
    /// Peer address, once connected.
    pub peer: Option<SocketAddr>,
    /// Pump reports, if forwarding started.
    pub forwarding: Option<ForwardingReport>,
    /// Why the run ended.
    pub reason: Option<CancelReason>,
}

impl SessionReport {
    /// Process exit status for this run.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match &self.reason {
            None => EXIT_OK,
            Some(reason) if reason.is_graceful() => EXIT_OK,
            Some(_) => EXIT_FAILURE,
        }
    }
}

// ============================================
// Session
// ============================================

/// One tunnel end.
#[derive(Debug)]
pub struct Session<F, C> {
    config: TunnelConfig,
    manager: InterfaceManager<F, C>,
    lifecycle: Lifecycle,
    listen_addr: watch::Sender<Option<SocketAddr>>,
}

impl Session<SystemDeviceFactory, IpCommandConfigurator> {
    /// Session using real devices configured with `ip`.
    #[must_use]
    pub fn system(config: TunnelConfig, lifecycle: Lifecycle) -> Self {
        Self::new(config, InterfaceManager::system(), lifecycle)
    }
}

impl<F: DeviceFactory, C: InterfaceConfigurator> Session<F, C> {
    /// Creates a session.
    #[must_use]
    pub fn new(config: TunnelConfig, manager: InterfaceManager<F, C>, lifecycle: Lifecycle) -> Self {
        let (listen_addr, _) = watch::channel(None);
        Self {
            config,
            manager,
            lifecycle,
            listen_addr,
        }
    }

    /// Returns the interface manager.
    #[must_use]
    pub const fn manager(&self) -> &InterfaceManager<F, C> {
        &self.manager
    }

    /// Watches the responder's bound address.
    ///
    /// Stays `None` for initiators and until the listener is bound.
    #[must_use]
    pub fn listen_addr(&self) -> watch::Receiver<Option<SocketAddr>> {
        self.listen_addr.subscribe()
    }

    /// Runs the session until it ends.
    ///
    /// # Errors
    /// Returns `Setup` if the interface or the connection cannot be set up.
    /// A cancelled setup or a failed forwarding session is reported through
    /// `SessionReport::reason` instead.
    pub async fn run(&self) -> Result<SessionReport> {
        let role = self.config.role();
        let address = self.config.address();
        let mut report = SessionReport {
            role,
            interface: None,
            address,
            peer: None,
            forwarding: None,
            reason: None,
        };

        info!(
            %role,
            endpoint = %self.config.endpoint(),
            kind = %self.config.kind(),
            mtu = self.config.mtu(),
            %address,
            "Starting tunnel"
        );

        let device = self.setup(async {
            self.manager
                .create(self.config.kind(), self.config.device_name())
        })
        .await?;
        let Some(device) = device else {
            return Ok(self.finish(report));
        };

        let iface = self
            .setup(self.manager.configure(device, address, self.config.mtu()))
            .await?;
        let Some(iface) = iface else {
            return Ok(self.finish(report));
        };
        report.interface = Some(iface.clone());

        let connection = self.setup(self.connect()).await?;
        let Some(connection) = connection else {
            return Ok(self.finish(report));
        };
        report.peer = Some(connection.peer_addr());

        let codec = FrameCodec::new(usize::from(iface.mtu()))?;
        let (reader, writer) = connection.into_framed(codec);

        let engine = ForwardingEngine::new(iface.mtu(), self.lifecycle.clone());
        report.forwarding = Some(engine.run(Arc::clone(iface.device()), reader, writer).await);

        Ok(self.finish(report))
    }

    /// Dials or listens + accepts, depending on role.
    async fn connect(&self) -> tunpair_transport::Result<TcpConnection> {
        match self.config.role() {
            role @ Role::Initiator => {
                info!("Dialing {} at {}", role.peer(), self.config.endpoint());
                tcp::dial(self.config.endpoint()).await
            }
            role @ Role::Responder => {
                let listener = TunnelListener::bind(self.config.endpoint()).await?;
                self.listen_addr.send_replace(Some(listener.local_addr()));
                info!("Waiting for {} on {}", role.peer(), listener.local_addr());
                listener.accept_one().await
            }
        }
    }

    /// Runs one setup step raced against cancellation.
    ///
    /// `Ok(None)` means the run was cancelled first. A failure cancels the
    /// run and is returned as `Setup`.
    async fn setup<T>(
        &self,
        step: impl Future<Output = tunpair_transport::Result<T>>,
    ) -> Result<Option<T>> {
        tokio::select! {
            biased;
            () = self.lifecycle.cancelled() => Ok(None),
            result = step => match result {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    error!("Setup failed: {}", e);
                    self.lifecycle.cancel(CancelReason::SetupFailed(e.to_string()));
                    Err(setup_error(e))
                }
            },
        }
    }

    fn finish(&self, mut report: SessionReport) -> SessionReport {
        report.reason = self.lifecycle.reason();
        match &report.reason {
            Some(reason) => info!(role = %report.role, "Tunnel stopped: {}", reason),
            None => info!(role = %report.role, "Tunnel stopped"),
        }
        report
    }
}

fn setup_error(e: TransportError) -> NodeError {
    match e {
        TransportError::InvalidConfig { field, reason } => NodeError::config_invalid(field, reason),
        other => NodeError::Setup(other),
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use tunpair_common::InterfaceKind;
    use tunpair_transport::configurator::{ConfigCall, ConfigStep, RecordingConfigurator};
    use tunpair_transport::tun::{MockDeviceFactory, MockTun};

    use super::*;
    use crate::config::{FileConfig, TunnelOptions};

    const WAIT: Duration = Duration::from_secs(5);

    fn config(responder: bool, endpoint: &str) -> TunnelConfig {
        TunnelOptions {
            responder,
            initiator: !responder,
            endpoint: Some(endpoint.into()),
            ..TunnelOptions::default()
        }
        .resolve(&FileConfig::default())
        .unwrap()
    }

    fn mock_session(
        config: TunnelConfig,
        tun: &Arc<MockTun>,
        configurator: RecordingConfigurator,
        lifecycle: &Lifecycle,
    ) -> Session<MockDeviceFactory, RecordingConfigurator> {
        let manager = InterfaceManager::new(MockDeviceFactory::new(Arc::clone(tun)), configurator);
        Session::new(config, manager, lifecycle.clone())
    }

    #[tokio::test]
    async fn test_responder_configures_then_waits_for_peer() {
        let tun = Arc::new(MockTun::new("tun5", InterfaceKind::Tun));
        let lifecycle = Lifecycle::new();
        let session = Arc::new(mock_session(
            config(true, "127.0.0.1:0"),
            &tun,
            RecordingConfigurator::new(),
            &lifecycle,
        ));

        let mut listening = session.listen_addr();
        let run = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.run().await }
        });

        tokio::time::timeout(WAIT, listening.wait_for(Option::is_some))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            session.manager().configurator().calls(),
            vec![
                ConfigCall::AssignAddress(
                    "tun5".into(),
                    InterfaceAddress::new(Ipv4Addr::new(10, 253, 0, 1), 30)
                ),
                ConfigCall::LinkUp("tun5".into()),
                ConfigCall::SetMtu("tun5".into(), 1500),
            ]
        );

        // Signal while blocked in accept
        lifecycle.cancel(CancelReason::Signal("SIGINT"));
        let report = tokio::time::timeout(WAIT, run).await.unwrap().unwrap().unwrap();

        let iface = report.interface.as_ref().unwrap();
        assert_eq!(iface.name(), "tun5");
        assert_eq!(iface.kind(), InterfaceKind::Tun);
        assert_eq!(iface.mtu(), 1500);
        assert_eq!(iface.address().to_string(), "10.253.0.1/30");
        assert_eq!(report.address.to_string(), "10.253.0.1/30");
        assert!(report.peer.is_none());
        assert!(report.forwarding.is_none());
        assert_eq!(report.exit_code(), EXIT_OK);
    }

    #[tokio::test]
    async fn test_config_failure_is_setup_error() {
        let tun = Arc::new(MockTun::default());
        let lifecycle = Lifecycle::new();
        let session = mock_session(
            config(false, "127.0.0.1:9"),
            &tun,
            RecordingConfigurator::failing_at(ConfigStep::SetMtu),
            &lifecycle,
        );

        let err = session.run().await.unwrap_err();

        assert!(err.is_setup_error());
        assert_eq!(err.exit_code(), EXIT_FAILURE);
        assert!(matches!(lifecycle.reason(), Some(CancelReason::SetupFailed(_))));
    }

    #[tokio::test]
    async fn test_unavailable_device_stops_before_configuring() {
        let lifecycle = Lifecycle::new();
        let manager = InterfaceManager::new(MockDeviceFactory::unavailable(), RecordingConfigurator::new());
        let session = Session::new(config(true, "127.0.0.1:0"), manager, lifecycle.clone());

        let err = session.run().await.unwrap_err();

        assert!(matches!(err, NodeError::Setup(ref e) if e.is_device_unavailable()));
        assert!(session.manager().configurator().calls().is_empty());
        assert!(session.listen_addr().borrow().is_none());
    }

    #[tokio::test]
    async fn test_dial_failure_is_setup_error() {
        // Reserve a port, then free it so nothing listens there
        let port = TunnelListener::bind("127.0.0.1:0").await.unwrap().local_addr().port();

        let tun = Arc::new(MockTun::default());
        let lifecycle = Lifecycle::new();
        let session = mock_session(
            config(false, &format!("127.0.0.1:{port}")),
            &tun,
            RecordingConfigurator::new(),
            &lifecycle,
        );

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, NodeError::Setup(TransportError::DialFailed { .. })));
        // Interface was configured before the dial
        assert_eq!(session.manager().configurator().calls().len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let tun = Arc::new(MockTun::default());
        let lifecycle = Lifecycle::new();
        lifecycle.cancel(CancelReason::Signal("SIGQUIT"));

        let session = mock_session(config(true, "127.0.0.1:0"), &tun, RecordingConfigurator::new(), &lifecycle);
        let report = session.run().await.unwrap();

        assert!(report.interface.is_none());
        assert_eq!(report.reason, Some(CancelReason::Signal("SIGQUIT")));
        assert_eq!(report.exit_code(), EXIT_OK);
    }

    #[test]
    fn test_report_exit_code() {
        let mut report = SessionReport {
            role: Role::Initiator,
            interface: None,
            address: InterfaceAddress::new(Ipv4Addr::new(10, 253, 0, 2), 30),
            peer: None,
            forwarding: None,
            reason: Some(CancelReason::PeerClosed),
        };
        assert_eq!(report.exit_code(), EXIT_OK);

        report.reason = Some(CancelReason::PumpFailed("reset".into()));
        assert_eq!(report.exit_code(), EXIT_FAILURE);
    }
}
