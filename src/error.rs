//! Error types for wslink.
//!
//! This module defines the errors reported by the connection manager
//! and by transport backends.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use wslink::{ConnectionManager, Result};
//!
//! async fn example(manager: &ConnectionManager) -> Result<()> {
//!     let connection = manager.connect("ws://localhost:9000", |_| {}, |_| {}).await?;
//!     connection.send("hello")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connect | [`Error::Connect`], [`Error::ClosedBeforeOpen`], [`Error::ConnectionClosed`] |
//! | Commands | [`Error::Send`], [`Error::Disconnect`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::protocol::close::classify;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the manager builder is given an unusable setup.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connect Errors
    // ========================================================================
    /// Transport construction failed.
    ///
    /// Carries the underlying transport message verbatim. No listener is
    /// registered and no handler fires for the attempt.
    #[error("Connection failed: {message}")]
    Connect {
        /// Message reported by the transport.
        message: String,
    },

    /// The transport closed before it ever opened.
    #[error("Connection closed before open (code {code}): {description}")]
    ClosedBeforeOpen {
        /// Close code reported by the transport.
        code: i64,
        /// Reason text reported by the peer, possibly empty.
        reason: String,
        /// Classified description of `code`.
        description: String,
    },

    /// The lifecycle task went away without resolving the connect attempt.
    ///
    /// Only happens when the runtime shuts down mid-connect.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Command Errors
    // ========================================================================
    /// The transport rejected an outbound frame.
    #[error("Send failed: {message}")]
    Send {
        /// Message reported by the transport.
        message: String,
    },

    /// The transport rejected a close request.
    #[error("Disconnect failed: {message}")]
    Disconnect {
        /// Message reported by the transport.
        message: String,
    },
}

// ============================================================================
// TransportError
// ============================================================================

/// Failure reported synchronously by a transport primitive.
///
/// Mirrors an exception thrown by a platform socket: only the message text
/// survives, and the connection manager wraps it into an [`enum@Error`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    /// Message text of the failure.
    pub message: String,
}

impl TransportError {
    /// Creates a transport error with the given message.
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<WsError> for TransportError {
    fn from(err: WsError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        Self::new(err.to_string())
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connect error.
    #[inline]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Creates a closed-before-open error, classifying `code`.
    #[inline]
    pub fn closed_before_open(code: i64, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let description = classify(code, &reason);
        Self::ClosedBeforeOpen {
            code,
            reason,
            description,
        }
    }

    /// Creates a send error.
    #[inline]
    pub fn send(message: impl Into<String>) -> Self {
        Self::Send {
            message: message.into(),
        }
    }

    /// Creates a disconnect error.
    #[inline]
    pub fn disconnect(message: impl Into<String>) -> Self {
        Self::Disconnect {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Accessors
// ============================================================================

impl Error {
    /// Returns the underlying failure text without the category prefix.
    ///
    /// For a construction failure this is exactly the transport's message;
    /// for a closure before open it is the classified close description.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Config { message }
            | Self::Connect { message }
            | Self::Send { message }
            | Self::Disconnect { message } => message.clone(),
            Self::ClosedBeforeOpen { description, .. } => description.clone(),
            Self::ConnectionClosed => self.to_string(),
        }
    }

    /// Returns the close code if this error came from a closure.
    #[inline]
    #[must_use]
    pub fn close_code(&self) -> Option<i64> {
        match self {
            Self::ClosedBeforeOpen { code, .. } => Some(*code),
            _ => None,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the connect attempt never produced an open socket.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::ClosedBeforeOpen { .. }
                | Self::ConnectionClosed
        )
    }

    /// Returns `true` if the transport closed before opening.
    #[inline]
    #[must_use]
    pub fn is_closed_before_open(&self) -> bool {
        matches!(self, Self::ClosedBeforeOpen { .. })
    }

    /// Returns `true` if this is a send or disconnect failure.
    #[inline]
    #[must_use]
    pub fn is_command_error(&self) -> bool {
        matches!(self, Self::Send { .. } | Self::Disconnect { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
