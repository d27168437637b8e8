//! Per-connection lifecycle task.
//!
//! The task consumes transport events in order and is the only code that
//! invokes caller handlers or writes the open flag.
//!
//! # State Machine
//!
//! ```text
//!              Open                      Close
//! Connecting ───────► Open (resolve Ok) ───────► Closed (on_closed)
//!     │
//!     │ Close
//!     └─────────────► Closed (resolve Err: ClosedBeforeOpen)
//! ```
//!
//! The result is resolved exactly once. A second open event, or any event
//! after close, is ignored.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::CloseInfo;
use crate::transport::{EventReceiver, TransportEvent};

use super::connection::Connection;
use super::listeners::{ClosedHandler, FailedHandler, MessageHandler, OpenHandler};

// ============================================================================
// Resolver
// ============================================================================

/// Where the outcome of a connect attempt is delivered.
pub(crate) enum Resolver {
    /// Awaited by [`ConnectionManager::connect`](super::ConnectionManager::connect).
    Result(oneshot::Sender<Result<Connection>>),
    /// Listener-style delivery for [`ConnectionManager::attach`](super::ConnectionManager::attach).
    Listeners {
        on_open: Option<OpenHandler>,
        on_failed: Option<FailedHandler>,
    },
}

impl Resolver {
    /// Delivers the open connection.
    ///
    /// Returns the connection back if nobody is waiting for it anymore.
    fn open(self, connection: Connection) -> Option<Connection> {
        match self {
            Self::Result(tx) => match tx.send(Ok(connection)) {
                Ok(()) => None,
                Err(Ok(connection)) => Some(connection),
                Err(Err(_)) => None,
            },
            Self::Listeners { on_open, .. } => {
                if let Some(handler) = on_open {
                    handler(connection);
                }
                None
            }
        }
    }

    fn fail(self, err: Error) {
        match self {
            Self::Result(tx) => {
                let _ = tx.send(Err(err));
            }
            Self::Listeners { on_failed, .. } => {
                if let Some(handler) = on_failed {
                    handler(err);
                }
            }
        }
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// State owned by the lifecycle task.
pub(crate) struct Lifecycle {
    connection: Connection,
    events: EventReceiver,
    resolver: Option<Resolver>,
    on_message: Option<MessageHandler>,
    on_closed: Option<ClosedHandler>,
}

impl Lifecycle {
    pub(crate) fn new(
        connection: Connection,
        events: EventReceiver,
        resolver: Resolver,
        on_message: Option<MessageHandler>,
        on_closed: Option<ClosedHandler>,
    ) -> Self {
        Self {
            connection,
            events,
            resolver: Some(resolver),
            on_message,
            on_closed,
        }
    }

    /// Dispatches events until the terminal close.
    pub(crate) async fn run(mut self) {
        loop {
            let event = match self.events.recv().await {
                Some(event) => event,
                None => {
                    debug!(connection = %self.connection.id(), "Event stream ended without close");
                    TransportEvent::Close(CloseInfo::abnormal())
                }
            };

            match event {
                TransportEvent::Open => self.handle_open(),
                TransportEvent::Message(payload) => {
                    trace!(
                        connection = %self.connection.id(),
                        len = payload.len(),
                        "Message received"
                    );
                    if let Some(handler) = self.on_message.as_mut() {
                        handler(payload);
                    }
                }
                TransportEvent::Close(info) => {
                    self.handle_close(info);
                    break;
                }
            }
        }

        debug!(connection = %self.connection.id(), "Lifecycle task terminated");
    }

    fn handle_open(&mut self) {
        let id = self.connection.id();

        let Some(resolver) = self.resolver.take() else {
            warn!(connection = %id, "Ignoring duplicate open event");
            return;
        };

        self.connection.set_open(true);
        debug!(connection = %id, url = %self.connection.url(), "Connection open");

        if resolver.open(self.connection.clone()).is_some() {
            self.abandon();
        }
    }

    /// Releases a connection whose connect call went away before open.
    fn abandon(&mut self) {
        let id = self.connection.id();
        debug!(connection = %id, "Connect abandoned before open, closing transport");

        self.connection.set_open(false);
        self.on_message = None;
        self.on_closed = None;
        if let Err(e) = self.connection.transport().close(1000, "") {
            warn!(connection = %id, error = %e, "Failed to close abandoned transport");
        }
    }

    fn handle_close(&mut self, info: CloseInfo) {
        let id = self.connection.id();

        if self.connection.is_open() {
            self.connection.set_open(false);
            debug!(
                connection = %id,
                code = info.code,
                locally = info.initiated_locally,
                "Connection closed"
            );
            if let Some(handler) = self.on_closed.take() {
                handler(info);
            }
            return;
        }

        match self.resolver.take() {
            Some(resolver) => {
                debug!(connection = %id, code = info.code, "Connection closed before open");
                resolver.fail(Error::closed_before_open(info.code, info.reason));
            }
            None => {
                debug!(connection = %id, code = info.code, "Abandoned connection closed");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
