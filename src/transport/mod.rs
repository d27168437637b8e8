//! WebSocket transport layer.
//!
//! This module defines the capability every socket backend provides and
//! the two backends shipped with the crate.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐   Connector::open   ┌──────────────────────────┐
//! │ ConnectionManager │────────────────────►│ NativeConnector          │
//! │                   │                     │  (tokio-tungstenite)     │
//! │  lifecycle task   │◄── TransportEvent ──│ HostConnector            │
//! │                   │                     │  (platform socket/peer)  │
//! │  Connection       │──── Transport ─────►│                          │
//! └───────────────────┘   send / close      └──────────────────────────┘
//! ```
//!
//! # Contract
//!
//! - [`Connector::open`] constructs a socket synchronously. A failure here
//!   is a constructor-level failure and nothing else happens.
//! - Events arrive on the returned receiver in emission order: at most one
//!   [`TransportEvent::Open`], any number of messages, and a terminal
//!   [`TransportEvent::Close`].
//! - [`Transport::send`] and [`Transport::close`] never block; they fail
//!   synchronously when the socket is in the wrong state.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `host` | Socket driven by the embedding host |
//! | `native` | tokio-tungstenite client socket |
//! | `options` | Native backend options |

// ============================================================================
// Submodules
// ============================================================================

/// Socket provided and driven by the embedding host.
pub mod host;

/// Native tokio-tungstenite socket.
pub mod native;

/// Native backend configuration.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use host::{HostConnector, HostFrame, HostListener, HostPeer};
pub use native::NativeConnector;
pub use options::NativeOptions;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

use crate::error::TransportError;
use crate::protocol::{CloseInfo, Payload};

// ============================================================================
// Types
// ============================================================================

/// Receiving half of a transport's event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Sending half of a transport's event stream.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Result of a transport primitive.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

// ============================================================================
// TransportEvent
// ============================================================================

/// Event emitted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket finished its opening handshake.
    Open,
    /// An inbound data frame.
    Message(Payload),
    /// The socket closed. Terminal.
    Close(CloseInfo),
}

// ============================================================================
// ReadyState
// ============================================================================

/// Socket state, numbered like the WebSocket API `readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReadyState {
    /// Handshake in progress.
    Connecting = 0,
    /// Open and able to carry frames.
    Open = 1,
    /// Close requested, waiting for the close event.
    Closing = 2,
    /// Closed.
    Closed = 3,
}

impl ReadyState {
    /// Returns the upper-case state name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        }
    }

    /// Returns the error reported when sending in this state.
    #[must_use]
    pub fn not_open_error(self) -> TransportError {
        TransportError::new(format!(
            "WebSocket is not open: readyState {} ({})",
            self as u8,
            self.as_str()
        ))
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Transport
// ============================================================================

/// A constructed socket.
///
/// Implementations are driven by their backend; the handle only exposes
/// the non-blocking commands.
pub trait Transport: Send + Sync + 'static {
    /// Queues a data frame.
    ///
    /// # Errors
    ///
    /// Fails unless the socket is [`ReadyState::Open`].
    fn send(&self, payload: Payload) -> TransportResult<()>;

    /// Requests a close with the given code and reason.
    ///
    /// Requesting a close on a closing or closed socket is a no-op.
    ///
    /// # Errors
    ///
    /// Fails when the backend can no longer accept the request.
    fn close(&self, code: u16, reason: &str) -> TransportResult<()>;

    /// Returns the current socket state.
    fn ready_state(&self) -> ReadyState;
}

// ============================================================================
// Connector
// ============================================================================

/// A constructed socket together with its event stream.
pub struct Opened {
    /// Command handle.
    pub transport: Arc<dyn Transport>,
    /// Events in emission order.
    pub events: EventReceiver,
}

impl fmt::Debug for Opened {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opened")
            .field("ready_state", &self.transport.ready_state())
            .finish_non_exhaustive()
    }
}

/// Factory constructing sockets for a URL.
pub trait Connector: Send + Sync + 'static {
    /// Constructs a socket for `url`.
    ///
    /// # Errors
    ///
    /// Returns the constructor failure (malformed URL, unsupported scheme,
    /// platform error). No event is ever emitted for a failed construction.
    fn open(&self, url: &str) -> TransportResult<Opened>;
}

// ============================================================================
// URL Validation
// ============================================================================

/// Parses and validates a WebSocket URL.
///
/// # Errors
///
/// Fails for unparsable URLs, schemes other than `ws`/`wss`, and URLs
/// carrying a fragment.
pub fn validate_url(url: &str) -> TransportResult<Url> {
    let parsed = Url::parse(url)?;

    match parsed.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(TransportError::new(format!(
                "The URL's scheme must be either 'ws' or 'wss'. '{other}' is not allowed."
            )));
        }
    }

    if parsed.fragment().is_some() {
        return Err(TransportError::new(format!(
            "The URL contains a fragment identifier ('{url}'). \
             Fragment identifiers are not allowed in WebSocket URLs."
        )));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(TransportError::new(format!("The URL has no host: '{url}'")));
    }

    Ok(parsed)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_state_numbers() {
        assert_eq!(ReadyState::Connecting as u8, 0);
        assert_eq!(ReadyState::Open as u8, 1);
        assert_eq!(ReadyState::Closing as u8, 2);
        assert_eq!(ReadyState::Closed as u8, 3);
    }

    #[test]
    fn test_not_open_error() {
        let err = ReadyState::Closed.not_open_error();
        assert_eq!(err.message, "WebSocket is not open: readyState 3 (CLOSED)");
    }

    #[test]
    fn test_validate_url_accepts_ws_and_wss() {
        assert!(validate_url("ws://localhost:9000/path").is_ok());
        assert!(validate_url("wss://example.com").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_scheme() {
        let err = validate_url("http://example.com").unwrap_err();
        assert!(err.message.contains("'http' is not allowed"));
    }

    #[test]
    fn test_validate_url_rejects_fragment() {
        let err = validate_url("ws://example.com/#frag").unwrap_err();
        assert!(err.message.contains("fragment"));
    }

    #[test]
    fn test_validate_url_rejects_garbage() {
        assert!(validate_url("").is_err());
        assert!(validate_url("not a url").is_err());
    }
}
