//! Native backend options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use wslink::NativeOptions;
//!
//! let options = NativeOptions::new()
//!     .with_connect_timeout(Duration::from_secs(10))
//!     .with_max_message_size(16 << 20);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default time allowed for the opening handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time to wait for the peer's close frame after a local close.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// NativeOptions
// ============================================================================

/// Configuration of the tokio-tungstenite backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeOptions {
    /// Handshake deadline. `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,

    /// Deadline for the peer's close frame after a local close request.
    pub close_timeout: Duration,

    /// Largest inbound message accepted. `None` keeps tungstenite's default.
    pub max_message_size: Option<usize>,

    /// Set `TCP_NODELAY` on the socket.
    pub disable_nagle: bool,
}

impl Default for NativeOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl NativeOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            max_message_size: None,
            disable_nagle: false,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl NativeOptions {
    /// Sets the handshake deadline.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Waits for the handshake without a deadline.
    #[inline]
    #[must_use]
    pub fn without_connect_timeout(mut self) -> Self {
        self.connect_timeout = None;
        self
    }

    /// Sets the close frame deadline.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Sets the largest inbound message accepted, in bytes.
    #[inline]
    #[must_use]
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = Some(bytes);
        self
    }

    /// Enables `TCP_NODELAY`.
    #[inline]
    #[must_use]
    pub fn with_nodelay(mut self) -> Self {
        self.disable_nagle = true;
        self
    }
}

// ============================================================================
// Validation & Conversion
// ============================================================================

impl NativeOptions {
    /// Checks the options for values that can never work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for zero timeouts or a zero message size.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("connect_timeout must be greater than zero"));
        }

        if self.close_timeout.is_zero() {
            return Err(Error::config("close_timeout must be greater than zero"));
        }

        if self.max_message_size == Some(0) {
            return Err(Error::config("max_message_size must be greater than zero"));
        }

        Ok(())
    }

    /// Builds the tungstenite protocol configuration.
    #[must_use]
    pub(crate) fn websocket_config(&self) -> WebSocketConfig {
        let config = WebSocketConfig::default();
        match self.max_message_size {
            Some(size) => config.max_message_size(Some(size)),
            None => config,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
