//! Caller handlers.
//!
//! Handlers are invoked only by a connection's lifecycle task, one at a
//! time and in transport event order.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::Error;
use crate::protocol::{CloseInfo, Payload};

use super::connection::Connection;

// ============================================================================
// Types
// ============================================================================

/// Called for every inbound frame.
pub type MessageHandler = Box<dyn FnMut(Payload) + Send>;

/// Called at most once, when an open connection closes.
pub type ClosedHandler = Box<dyn FnOnce(CloseInfo) + Send>;

/// Called at most once, when the connection opens.
pub type OpenHandler = Box<dyn FnOnce(Connection) + Send>;

/// Called at most once, when the connection closes before opening.
pub type FailedHandler = Box<dyn FnOnce(Error) + Send>;

// ============================================================================
// Listeners
// ============================================================================

/// Handlers for [`ConnectionManager::attach`](super::ConnectionManager::attach).
///
/// Unset handlers do nothing.
///
/// # Example
///
/// ```ignore
/// let listeners = Listeners::new()
///     .on_open(|connection| { let _ = connection.send("hello"); })
///     .on_message(|payload| println!("{payload:?}"))
///     .on_closed(|info| println!("closed: {}", info.description()))
///     .on_failed(|err| eprintln!("{err}"));
/// ```
#[derive(Default)]
pub struct Listeners {
    pub(crate) on_open: Option<OpenHandler>,
    pub(crate) on_message: Option<MessageHandler>,
    pub(crate) on_closed: Option<ClosedHandler>,
    pub(crate) on_failed: Option<FailedHandler>,
}

impl Listeners {
    /// Creates an empty set of listeners.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the open handler.
    #[must_use]
    pub fn on_open(mut self, handler: impl FnOnce(Connection) + Send + 'static) -> Self {
        self.on_open = Some(Box::new(handler));
        self
    }

    /// Sets the message handler.
    #[must_use]
    pub fn on_message(mut self, handler: impl FnMut(Payload) + Send + 'static) -> Self {
        self.on_message = Some(Box::new(handler));
        self
    }

    /// Sets the closed handler.
    #[must_use]
    pub fn on_closed(mut self, handler: impl FnOnce(CloseInfo) + Send + 'static) -> Self {
        self.on_closed = Some(Box::new(handler));
        self
    }

    /// Sets the failure handler.
    #[must_use]
    pub fn on_failed(mut self, handler: impl FnOnce(Error) + Send + 'static) -> Self {
        self.on_failed = Some(Box::new(handler));
        self
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("on_open", &self.on_open.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_closed", &self.on_closed.is_some())
            .field("on_failed", &self.on_failed.is_some())
            .finish()
    }
}
