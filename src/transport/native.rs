//! tokio-tungstenite client socket.
//!
//! Each constructed socket owns one I/O task that:
//!
//! - Runs the opening handshake (abortable by a close request)
//! - Forwards inbound data frames as [`TransportEvent::Message`]
//! - Writes outbound frames queued by [`Transport::send`]
//! - Completes the closing handshake and emits the terminal close event

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use crate::error::TransportError;
use crate::protocol::{CloseCode, CloseInfo, Payload};

use super::options::NativeOptions;
use super::{
    Connector, EventSender, Opened, ReadyState, Transport, TransportEvent, TransportResult,
    validate_url,
};

// ============================================================================
// Types
// ============================================================================

/// Connected client stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Ready state shared between the handle and the I/O task.
type SharedState = Arc<Mutex<ReadyState>>;

/// Commands for the I/O task.
enum SocketCommand {
    /// Write a data frame.
    Frame(Payload),
    /// Start the closing handshake.
    Close { code: u16, reason: String },
}

// ============================================================================
// NativeConnector
// ============================================================================

/// Connector producing tokio-tungstenite sockets.
///
/// Must be used from within a tokio runtime; constructing a socket outside
/// one is reported as a constructor failure.
#[derive(Debug, Clone, Default)]
pub struct NativeConnector {
    options: NativeOptions,
}

impl NativeConnector {
    /// Creates a connector with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector with the given options.
    #[inline]
    #[must_use]
    pub fn with_options(options: NativeOptions) -> Self {
        Self { options }
    }

    /// Returns the connector options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &NativeOptions {
        &self.options
    }
}

impl Connector for NativeConnector {
    fn open(&self, url: &str) -> TransportResult<Opened> {
        let url = validate_url(url)?;
        let request = url.as_str().into_client_request()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::new(e.to_string()))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let state: SharedState = Arc::new(Mutex::new(ReadyState::Connecting));

        runtime.spawn(run_socket(
            request,
            self.options.clone(),
            command_rx,
            event_tx,
            Arc::clone(&state),
        ));

        debug!(%url, "Native socket constructed");

        Ok(Opened {
            transport: Arc::new(NativeTransport { command_tx, state }),
            events: event_rx,
        })
    }
}

// ============================================================================
// NativeTransport
// ============================================================================

/// Command handle of a native socket.
struct NativeTransport {
    command_tx: mpsc::UnboundedSender<SocketCommand>,
    state: SharedState,
}

impl Transport for NativeTransport {
    fn send(&self, payload: Payload) -> TransportResult<()> {
        let state = *self.state.lock();
        if state != ReadyState::Open {
            return Err(state.not_open_error());
        }

        self.command_tx
            .send(SocketCommand::Frame(payload))
            .map_err(|_| ReadyState::Closed.not_open_error())
    }

    fn close(&self, code: u16, reason: &str) -> TransportResult<()> {
        let mut state = self.state.lock();
        match *state {
            ReadyState::Closing | ReadyState::Closed => Ok(()),
            ReadyState::Connecting | ReadyState::Open => {
                *state = ReadyState::Closing;
                self.command_tx
                    .send(SocketCommand::Close {
                        code,
                        reason: reason.to_owned(),
                    })
                    .map_err(|_| TransportError::new("WebSocket I/O task has stopped"))
            }
        }
    }

    fn ready_state(&self) -> ReadyState {
        *self.state.lock()
    }
}

// ============================================================================
// I/O Task
// ============================================================================

/// Drives one socket from handshake to close.
async fn run_socket(
    request: Request,
    options: NativeOptions,
    mut command_rx: mpsc::UnboundedReceiver<SocketCommand>,
    events: EventSender,
    state: SharedState,
) {
    let uri = request.uri().to_string();

    let stream = tokio::select! {
        result = handshake(request, &options) => match result {
            Ok(stream) => stream,
            Err(message) => {
                debug!(%uri, error = %message, "WebSocket handshake failed");
                finish(&state, &events, CloseInfo::new(CloseCode::Abnormal.code(), message));
                return;
            }
        },

        // Only a close request (or a dropped handle) can arrive while connecting
        _ = command_rx.recv() => {
            debug!(%uri, "Socket closed before the handshake completed");
            finish(&state, &events, CloseInfo::abnormal().locally_initiated());
            return;
        }
    };

    let aborted = {
        let mut guard = state.lock();
        if *guard == ReadyState::Connecting {
            *guard = ReadyState::Open;
            false
        } else {
            true
        }
    };

    if aborted {
        debug!(%uri, "Close requested during handshake, dropping stream");
        let mut stream = stream;
        let _ = stream.close(None).await;
        finish(&state, &events, CloseInfo::abnormal().locally_initiated());
        return;
    }

    debug!(%uri, "WebSocket open");
    let _ = events.send(TransportEvent::Open);

    let info = run_open(stream, &options, &mut command_rx, &events).await;
    finish(&state, &events, info);

    debug!(%uri, "Socket task terminated");
}

/// Opening handshake with the configured deadline.
async fn handshake(request: Request, options: &NativeOptions) -> Result<WsStream, String> {
    let connect = tokio_tungstenite::connect_async_with_config(
        request,
        Some(options.websocket_config()),
        options.disable_nagle,
    );

    let result = match options.connect_timeout {
        Some(deadline) => timeout(deadline, connect).await.map_err(|_| {
            format!("Opening handshake timed out after {}ms", deadline.as_millis())
        })?,
        None => connect.await,
    };

    result
        .map(|(stream, _response)| stream)
        .map_err(|e| e.to_string())
}

/// Event loop of an open socket. Returns the close details.
async fn run_open(
    stream: WsStream,
    options: &NativeOptions,
    command_rx: &mut mpsc::UnboundedReceiver<SocketCommand>,
    events: &EventSender,
) -> CloseInfo {
    let (mut ws_write, mut ws_read) = stream.split();
    let mut close_deadline: Option<Instant> = None;

    let info = loop {
        tokio::select! {
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "Text frame received");
                        let payload = Payload::Text(text.as_str().to_owned());
                        let _ = events.send(TransportEvent::Message(payload));
                    }

                    Some(Ok(Message::Binary(data))) => {
                        trace!(len = data.len(), "Binary frame received");
                        let payload = Payload::Binary(data.to_vec());
                        let _ = events.send(TransportEvent::Message(payload));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        let info = match frame {
                            Some(frame) => CloseInfo::new(
                                i64::from(u16::from(frame.code)),
                                frame.reason.as_str(),
                            ),
                            None => CloseInfo::new(CloseCode::NoStatus.code(), ""),
                        };
                        debug!(code = info.code, "Close frame received");
                        // Flushes the queued close reply
                        let _ = ws_write.close().await;
                        break info;
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        break CloseInfo::new(CloseCode::Abnormal.code(), e.to_string());
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break CloseInfo::abnormal();
                    }

                    // Ping/Pong are answered by tungstenite; raw frames are not surfaced
                    Some(Ok(_)) => {}
                }
            }

            command = command_rx.recv(), if close_deadline.is_none() => {
                match command {
                    Some(SocketCommand::Frame(payload)) => {
                        let len = payload.len();
                        if let Err(e) = ws_write.send(to_message(payload)).await {
                            warn!(error = %e, "Failed to write frame");
                            break CloseInfo::new(CloseCode::Abnormal.code(), e.to_string());
                        }
                        trace!(len, "Frame sent");
                    }

                    Some(SocketCommand::Close { code, reason }) => {
                        debug!(code, "Starting closing handshake");
                        let frame = CloseFrame {
                            code: WsCloseCode::from(code),
                            reason: reason.into(),
                        };
                        if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
                            warn!(error = %e, "Failed to write close frame");
                            break CloseInfo::new(CloseCode::Abnormal.code(), e.to_string());
                        }
                        close_deadline = Some(Instant::now() + options.close_timeout);
                    }

                    None => {
                        debug!("Transport handle dropped, closing");
                        let _ = ws_write.send(Message::Close(None)).await;
                        close_deadline = Some(Instant::now() + options.close_timeout);
                    }
                }
            }

            _ = sleep_until(close_deadline.unwrap_or_else(Instant::now)),
                if close_deadline.is_some() =>
            {
                warn!(
                    timeout_ms = options.close_timeout.as_millis() as u64,
                    "Peer did not answer the close frame"
                );
                break CloseInfo::abnormal();
            }
        }
    };

    if close_deadline.is_some() {
        info.locally_initiated()
    } else {
        info
    }
}

/// Marks the socket closed and emits the terminal event.
fn finish(state: &SharedState, events: &EventSender, info: CloseInfo) {
    *state.lock() = ReadyState::Closed;
    let _ = events.send(TransportEvent::Close(info));
}

/// Converts an outbound payload into a tungstenite message.
fn to_message(payload: Payload) -> Message {
    match payload {
        Payload::Text(text) => Message::Text(text.into()),
        Payload::Binary(data) => Message::Binary(data.into()),
    }
}

// ============================================================================
// Tests
// ============================================================================
