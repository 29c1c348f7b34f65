// ============================================
// File: crates/tunpair-transport/src/tcp.rs
// ============================================
//! # TCP Transport Establisher
//!
//! ## Creation Reason
//! Produces the single duplex connection between the two tunnel ends:
//! the initiator dials, the responder listens and accepts exactly one peer.
//!
//! ## Main Functionality
//! - `dial`: resolve `host:port`, connect to the first address that answers
//! - `TunnelListener::bind`: resolve and bind with SO_REUSEADDR
//! - `TunnelListener::accept_one`: accept one peer and drop the listener
//! - `TcpConnection::into_framed`: split into frame reader/writer halves
//!
//! ## Design Choices
//! - One attempt only: no retry, no timeout
//! - TCP_NODELAY on every stream, packets should not wait for Nagle
//! - SO_REUSEADDR for quick rebinding after restart
//!
//! ## ⚠️ Important Note for Next Developer
//! - `accept_one` consumes the listener; a second peer gets connection
//!   refused
//! - Callers race `dial` and `accept_one` against shutdown themselves
//!
//! ## Last Modified
//! v0.1.0 - Initial TCP establisher

use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tracing::{debug, info, warn};

use tunpair_core::protocol::FrameCodec;

use crate::error::{Result, TransportError};
use crate::framed::{FrameReader, FrameWriter};

// ============================================
// Constants
// ============================================

/// Listen backlog. Only one peer is ever accepted.
const LISTEN_BACKLOG: i32 = 16;

// ============================================
// Resolution
// ============================================

async fn resolve(endpoint: &str) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = lookup_host(endpoint)
        .await
        .map_err(|_| TransportError::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(TransportError::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
        });
    }

    Ok(addrs)
}

// ============================================
// Dial
// ============================================

/// Connects to `endpoint` (`host:port`).
///
/// Every resolved address is tried in order; the first that connects wins.
///
/// # Errors
/// Returns `DialFailed` if resolution fails or no address accepts.
pub async fn dial(endpoint: &str) -> Result<TcpConnection> {
    let addrs = resolve(endpoint)
        .await
        .map_err(|e| TransportError::dial_failed(endpoint, e))?;

    let mut last_err = None;
    for addr in addrs {
        debug!("Connecting to {}", addr);
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                let conn = TcpConnection::from_stream(stream)?;
                info!(peer = %conn.peer_addr(), "Connected");
                return Ok(conn);
            }
            Err(e) => {
                warn!("Connect to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(match last_err {
        Some(e) => TransportError::dial_failed(endpoint, e),
        None => TransportError::dial_failed(endpoint, "no addresses to try"),
    })
}

// ============================================
// TunnelListener
// ============================================

/// Listening socket that hands out exactly one connection.
#[derive(Debug)]
pub struct TunnelListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TunnelListener {
    /// Binds to `endpoint` (`host:port`).
    ///
    /// # Socket Options
    /// - `SO_REUSEADDR`: Enabled for quick rebinding
    /// - Non-blocking: Required for async operations
    ///
    /// # Errors
    /// Returns `ListenFailed` if resolution fails or no address can be bound.
    pub async fn bind(endpoint: &str) -> Result<Self> {
        let addrs = resolve(endpoint)
            .await
            .map_err(|e| TransportError::listen_failed(endpoint, e))?;

        let mut last_err = None;
        for addr in addrs {
            match Self::bind_addr(addr) {
                Ok(listener) => return Ok(listener),
                Err(e) => {
                    warn!("Listen on {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) => TransportError::listen_failed(endpoint, e),
            None => TransportError::listen_failed(endpoint, "no addresses to try"),
        })
    }

    /// Binds to a resolved socket address.
    ///
    /// # Errors
    /// Returns `Io` describing the failing socket call.
    pub fn bind_addr(addr: SocketAddr) -> Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| TransportError::io("creating TCP socket", e))?;

        socket
            .set_reuse_address(true)
            .map_err(|e| TransportError::io("setting SO_REUSEADDR", e))?;

        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::io("setting non-blocking", e))?;

        socket
            .bind(&addr.into())
            .map_err(|e| TransportError::io(format!("binding {addr}"), e))?;

        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| TransportError::io("listening", e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| TransportError::io("converting to Tokio listener", e))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::io("getting local address", e))?;

        info!("Listening on {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts one peer. The listener is closed on return.
    ///
    /// # Errors
    /// Returns `AcceptFailed` if accept fails.
    pub async fn accept_one(self) -> Result<TcpConnection> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::AcceptFailed {
                reason: e.to_string(),
            })?;

        debug!("Closing listener on {}", self.local_addr);
        drop(self.listener);

        let conn = TcpConnection::from_stream(stream)?;
        info!(%peer, "Accepted peer");
        Ok(conn)
    }
}

// ============================================
// TcpConnection
// ============================================

/// Established connection to the peer.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
}

impl TcpConnection {
    /// Wraps a connected stream and enables TCP_NODELAY.
    ///
    /// # Errors
    /// Returns `Io` if socket options or addresses cannot be read.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream
            .set_nodelay(true)
            .map_err(|e| TransportError::io("setting TCP_NODELAY", e))?;

        let peer_addr = stream
            .peer_addr()
            .map_err(|e| TransportError::io("getting peer address", e))?;
        let local_addr = stream
            .local_addr()
            .map_err(|e| TransportError::io("getting local address", e))?;

        Ok(Self {
            stream,
            peer_addr,
            local_addr,
        })
    }

    /// Returns the peer's address.
    #[must_use]
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns our end's address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Splits into owned frame reader and writer halves.
    #[must_use]
    pub fn into_framed(
        self,
        codec: FrameCodec,
    ) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        let (read, write) = self.stream.into_split();
        (FrameReader::new(read, codec), FrameWriter::new(write, codec))
    }
}

// ============================================
// Tests
// ============================================
