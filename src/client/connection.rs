//! Connection handle.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{CloseCode, Payload};
use crate::transport::{ReadyState, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Close code used by [`Connection::disconnect`].
const NORMAL_CLOSURE: u16 = 1000;

/// Largest close reason that fits a control frame (125 bytes minus the code).
const MAX_CLOSE_REASON_BYTES: usize = 123;

// ============================================================================
// Connection
// ============================================================================

/// Handle to an established connection.
///
/// Cloning is cheap; all clones refer to the same socket. The open flag is
/// written only by the connection's lifecycle task.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    id: ConnectionId,
    url: String,
    transport: Arc<dyn Transport>,
    is_open: AtomicBool,
}

impl Connection {
    /// Creates a handle for a freshly constructed transport.
    pub(crate) fn new(
        id: ConnectionId,
        url: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                id,
                url: url.into(),
                transport,
                is_open: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the connection ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    /// Returns the URL the connection was created for.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Returns `true` between the open event and the close event.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.is_open.load(Ordering::Acquire)
    }

    /// Returns the transport's socket state.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.inner.transport.ready_state()
    }

    /// Sends a data frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Send`] with the transport's message when the socket
    /// is not open.
    pub fn send(&self, payload: impl Into<Payload>) -> Result<()> {
        let payload = payload.into();
        let len = payload.len();

        self.inner
            .transport
            .send(payload)
            .map_err(|e| Error::send(e.message))?;

        trace!(connection = %self.inner.id, len, "Frame queued");
        Ok(())
    }

    /// Requests a normal (1000) closure.
    ///
    /// The open flag is not touched here: it flips when the close event
    /// arrives, which also invokes the closed handler. Calling this again
    /// while closing is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disconnect`] if the transport rejects the request.
    pub fn disconnect(&self) -> Result<()> {
        self.request_close(NORMAL_CLOSURE, "")
    }

    /// Requests a closure with a specific code and reason.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disconnect`] if `code` may not appear in a close
    /// frame, if `reason` exceeds 123 bytes, or if the transport rejects
    /// the request.
    pub fn close_with(&self, code: u16, reason: &str) -> Result<()> {
        if !CloseCode::from(code).is_sendable() {
            return Err(Error::disconnect(format!(
                "Close code {code} cannot be sent in a close frame"
            )));
        }

        if reason.len() > MAX_CLOSE_REASON_BYTES {
            return Err(Error::disconnect(format!(
                "Close reason is {} bytes, at most {MAX_CLOSE_REASON_BYTES} allowed",
                reason.len()
            )));
        }

        self.request_close(code, reason)
    }

    fn request_close(&self, code: u16, reason: &str) -> Result<()> {
        self.inner
            .transport
            .close(code, reason)
            .map_err(|e| Error::disconnect(e.message))?;

        debug!(connection = %self.inner.id, code, "Close requested");
        Ok(())
    }

    /// Sets the open flag. Lifecycle task only.
    pub(crate) fn set_open(&self, open: bool) {
        self.inner.is_open.store(open, Ordering::Release);
    }

    /// Returns the transport. Lifecycle task only.
    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("url", &self.inner.url)
            .field("is_open", &self.is_open())
            .field("ready_state", &self.ready_state())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    use crate::error::TransportError;
    use crate::transport::TransportResult;

    /// Transport recording calls, failing when `fail` is set.
    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<Payload>>,
        closes: Mutex<Vec<(u16, String)>>,
        fail: bool,
    }

    impl Transport for Recording {
        fn send(&self, payload: Payload) -> TransportResult<()> {
            if self.fail {
                return Err(TransportError::new("socket gone"));
            }
            self.sent.lock().push(payload);
            Ok(())
        }

        fn close(&self, code: u16, reason: &str) -> TransportResult<()> {
            if self.fail {
                return Err(TransportError::new("already closed"));
            }
            self.closes.lock().push((code, reason.to_owned()));
            Ok(())
        }

        fn ready_state(&self) -> ReadyState {
            ReadyState::Open
        }
    }

    fn connection(fail: bool) -> (Connection, Arc<Recording>) {
        let transport = Arc::new(Recording {
            fail,
            ..Default::default()
        });
        let connection = Connection::new(ConnectionId::generate(), "ws://host", transport.clone());
        (connection, transport)
    }

    #[test]
    fn test_starts_closed() {
        let (connection, _) = connection(false);
        assert!(!connection.is_open());
        assert_eq!(connection.url(), "ws://host");
        assert_eq!(connection.ready_state(), ReadyState::Open);
    }

    #[test]
    fn test_send_forwards() {
        let (connection, transport) = connection(false);
        connection.send("hello").expect("send");
        connection.send(vec![1u8, 2]).expect("send");
        assert_eq!(
            *transport.sent.lock(),
            vec![Payload::from("hello"), Payload::from(vec![1u8, 2])]
        );
    }

    #[test]
    fn test_send_failure_carries_message() {
        let (connection, _) = connection(true);
        let err = connection.send("hello").unwrap_err();
        assert!(matches!(err, Error::Send { .. }));
        assert_eq!(err.message(), "socket gone");
    }

    #[test]
    fn test_disconnect_does_not_touch_open_flag() {
        let (connection, transport) = connection(false);
        connection.set_open(true);
        connection.disconnect().expect("disconnect");
        assert!(connection.is_open());
        assert_eq!(*transport.closes.lock(), vec![(1000, String::new())]);
    }

    #[test]
    fn test_disconnect_failure_reported() {
        let (connection, _) = connection(true);
        connection.set_open(true);
        let err = connection.disconnect().unwrap_err();
        assert!(matches!(err, Error::Disconnect { .. }));
        assert_eq!(err.message(), "already closed");
        assert!(connection.is_open());
    }

    #[test]
    fn test_close_with_validates() {
        let (connection, transport) = connection(false);

        assert!(connection.close_with(1006, "").is_err());
        assert!(connection.close_with(4000, &"x".repeat(124)).is_err());
        connection.close_with(4000, "app shutdown").expect("close");

        assert_eq!(*transport.closes.lock(), vec![(4000, "app shutdown".to_owned())]);
    }

    #[test]
    fn test_clones_share_state() {
        let (connection, _) = connection(false);
        let clone = connection.clone();
        connection.set_open(true);
        assert!(clone.is_open());
        assert_eq!(clone.id(), connection.id());
    }
}
