//! wslink - WebSocket client lifecycle with pluggable socket backends.
//!
//! This library opens WebSocket connections, waits for them to open,
//! dispatches inbound frames to caller handlers and reports how each
//! connection closed.
//!
//! # Architecture
//!
//! - **Manager**: [`ConnectionManager`] constructs transports through a
//!   [`Connector`] selected at build time
//! - **Backends**: [`NativeConnector`] (tokio-tungstenite) or
//!   [`HostConnector`] (socket owned by an embedding host)
//! - **Lifecycle**: one task per connection consumes transport events in
//!   order and is the only caller of handlers
//!
//! Key design principles:
//!
//! - A connect attempt resolves exactly once: open or closed-before-open
//! - `on_closed` fires at most once and only after a successful open
//! - Every closure carries a code and a human-readable reason
//!
//! # Quick Start
//!
//! ```no_run
//! use wslink::{ConnectionManager, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = ConnectionManager::builder().native().build()?;
//!
//!     let connection = manager
//!         .connect(
//!             "wss://echo.example.com",
//!             |payload| println!("message: {payload:?}"),
//!             |info| println!("closed {}: {}", info.code, info.description()),
//!         )
//!         .await?;
//!
//!     connection.send("hello")?;
//!     connection.disconnect()?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`ConnectionManager`], [`Connection`], [`Listeners`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Payload, close info and close code classification |
//! | [`transport`] | Backend trait seam and both backends |

// ============================================================================
// Modules
// ============================================================================

/// Connection manager, connection handle and handlers.
///
/// Use [`ConnectionManager::builder()`] to select a backend.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Payload and closure types.
///
/// Includes the close reason classifier.
pub mod protocol;

/// Socket backends.
///
/// [`Connector`] and [`Transport`] are the seam new backends implement.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Backend, Connection, ConnectionManager, Listeners, ManagerBuilder};

// Error types
pub use error::{Error, Result, TransportError};

// Identifier types
pub use identifiers::ConnectionId;

// Protocol types
pub use protocol::{CloseCode, CloseInfo, Payload, classify};

// Transport types
pub use transport::{
    Connector, HostConnector, HostFrame, HostListener, HostPeer, NativeConnector, NativeOptions,
    Opened, ReadyState, Transport, TransportEvent,
};
