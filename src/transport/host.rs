//! Socket provided by the embedding host.
//!
//! For environments where the platform owns the real socket (a browser
//! bridge, an FFI shell, a simulator) the host receives one [`HostPeer`]
//! per constructed socket. The peer reports what the platform observes
//! (open, inbound frames, close) and yields what the client asked for
//! (outbound frames, close requests).
//!
//! # Example
//!
//! ```ignore
//! let (connector, mut listener) = HostConnector::new();
//! let manager = ConnectionManager::new(connector);
//!
//! tokio::spawn(async move {
//!     while let Some(mut peer) = listener.accept().await {
//!         peer.open();
//!         while let Some(frame) = peer.recv().await {
//!             match frame {
//!                 HostFrame::Data(payload) => { peer.message(payload); }
//!                 HostFrame::Close { code, reason } => { peer.close(code.into(), &reason); }
//!             }
//!         }
//!     }
//! });
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::TransportError;
use crate::protocol::{CloseInfo, Payload};

use super::{
    Connector, EventSender, Opened, ReadyState, Transport, TransportEvent, TransportResult,
    validate_url,
};

// ============================================================================
// Types
// ============================================================================

/// Lifecycle state shared between the client handle and the peer.
#[derive(Debug)]
struct SocketState {
    ready: ReadyState,
    close_requested: bool,
}

type SharedState = Arc<Mutex<SocketState>>;

// ============================================================================
// HostFrame
// ============================================================================

/// Request from the client side that the host must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostFrame {
    /// Write this data frame to the platform socket.
    Data(Payload),
    /// Close the platform socket with this code and reason.
    Close {
        /// Close code requested by the client.
        code: u16,
        /// Reason requested by the client.
        reason: String,
    },
}

// ============================================================================
// HostConnector
// ============================================================================

/// Connector handing each constructed socket to the host.
#[derive(Debug, Clone)]
pub struct HostConnector {
    peers: mpsc::UnboundedSender<HostPeer>,
}

/// Host side receiving one [`HostPeer`] per constructed socket.
#[derive(Debug)]
pub struct HostListener {
    peers: mpsc::UnboundedReceiver<HostPeer>,
}

impl HostConnector {
    /// Creates a connector and the listener the host drives sockets from.
    #[must_use]
    pub fn new() -> (Self, HostListener) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        (Self { peers: peers_tx }, HostListener { peers: peers_rx })
    }
}

impl Connector for HostConnector {
    fn open(&self, url: &str) -> TransportResult<Opened> {
        let url = validate_url(url)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let state: SharedState = Arc::new(Mutex::new(SocketState {
            ready: ReadyState::Connecting,
            close_requested: false,
        }));

        let peer = HostPeer {
            url,
            events: event_tx,
            frames: frame_rx,
            state: Arc::clone(&state),
        };

        self.peers
            .send(peer)
            .map_err(|_| TransportError::new("Host socket provider is not listening"))?;

        Ok(Opened {
            transport: Arc::new(HostTransport {
                frames: frame_tx,
                state,
            }),
            events: event_rx,
        })
    }
}

impl HostListener {
    /// Waits for the next constructed socket.
    ///
    /// Returns `None` once every [`HostConnector`] clone is dropped.
    pub async fn accept(&mut self) -> Option<HostPeer> {
        self.peers.recv().await
    }

    /// Returns a constructed socket if one is pending.
    pub fn try_accept(&mut self) -> Option<HostPeer> {
        self.peers.try_recv().ok()
    }
}

// ============================================================================
// HostTransport
// ============================================================================

/// Client-side handle of a host socket.
struct HostTransport {
    frames: mpsc::UnboundedSender<HostFrame>,
    state: SharedState,
}

impl Transport for HostTransport {
    fn send(&self, payload: Payload) -> TransportResult<()> {
        let ready = self.state.lock().ready;
        if ready != ReadyState::Open {
            return Err(ready.not_open_error());
        }

        self.frames
            .send(HostFrame::Data(payload))
            .map_err(|_| ReadyState::Closed.not_open_error())
    }

    fn close(&self, code: u16, reason: &str) -> TransportResult<()> {
        let mut state = self.state.lock();
        match state.ready {
            ReadyState::Closing | ReadyState::Closed => Ok(()),
            ReadyState::Connecting | ReadyState::Open => {
                state.ready = ReadyState::Closing;
                state.close_requested = true;
                self.frames
                    .send(HostFrame::Close {
                        code,
                        reason: reason.to_owned(),
                    })
                    .map_err(|_| TransportError::new("Host socket is gone"))
            }
        }
    }

    fn ready_state(&self) -> ReadyState {
        self.state.lock().ready
    }
}

// ============================================================================
// HostPeer
// ============================================================================

/// Host side of one socket.
///
/// Every reporting method returns whether the event was delivered; events
/// that are impossible in the current state are dropped. Dropping the peer
/// before reporting a close reports an abnormal closure (1006).
#[derive(Debug)]
pub struct HostPeer {
    url: Url,
    events: EventSender,
    frames: mpsc::UnboundedReceiver<HostFrame>,
    state: SharedState,
}

impl HostPeer {
    /// Returns the URL the client asked for.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the socket state.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.state.lock().ready
    }

    /// Reports that the platform socket opened.
    ///
    /// Ignored unless the socket is still connecting; a socket closed while
    /// connecting never opens.
    pub fn open(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.ready != ReadyState::Connecting {
                warn!(url = %self.url, state = %state.ready, "Ignoring open report");
                return false;
            }
            state.ready = ReadyState::Open;
        }

        debug!(url = %self.url, "Host socket open");
        self.events.send(TransportEvent::Open).is_ok()
    }

    /// Reports an inbound data frame.
    ///
    /// Delivered in any state before the close report, including before open.
    pub fn message(&self, payload: impl Into<Payload>) -> bool {
        if self.ready_state() == ReadyState::Closed {
            warn!(url = %self.url, "Ignoring inbound frame after close");
            return false;
        }

        let payload = payload.into();
        trace!(url = %self.url, len = payload.len(), "Host frame received");
        self.events.send(TransportEvent::Message(payload)).is_ok()
    }

    /// Reports an inbound text frame.
    pub fn text(&self, text: impl Into<String>) -> bool {
        self.message(Payload::Text(text.into()))
    }

    /// Reports an inbound binary frame.
    pub fn binary(&self, data: impl Into<Vec<u8>>) -> bool {
        self.message(Payload::Binary(data.into()))
    }

    /// Reports that the platform socket closed. Only the first report counts.
    pub fn close(&self, code: i64, reason: &str) -> bool {
        let initiated_locally = {
            let mut state = self.state.lock();
            if state.ready == ReadyState::Closed {
                return false;
            }
            state.ready = ReadyState::Closed;
            state.close_requested
        };

        let mut info = CloseInfo::new(code, reason);
        info.initiated_locally = initiated_locally;

        debug!(url = %self.url, code, "Host socket closed");
        self.events.send(TransportEvent::Close(info)).is_ok()
    }

    /// Waits for the next outbound frame or close request.
    ///
    /// Returns `None` once the client handle is gone.
    pub async fn recv(&mut self) -> Option<HostFrame> {
        self.frames.recv().await
    }

    /// Returns an outbound frame or close request if one is pending.
    pub fn try_recv(&mut self) -> Option<HostFrame> {
        self.frames.try_recv().ok()
    }
}

impl Drop for HostPeer {
    fn drop(&mut self) {
        if self.ready_state() != ReadyState::Closed {
            debug!(url = %self.url, "Host peer dropped before close");
            self.close(crate::protocol::CloseCode::Abnormal.code(), "");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
