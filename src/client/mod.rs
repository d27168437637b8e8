//! Client surface: connection manager, connection handle and handlers.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | [`Connection`] handle (send, disconnect, open flag) |
//! | `lifecycle` | Per-connection task dispatching transport events |
//! | `listeners` | Handler types and [`Listeners`] |
//! | `manager` | [`ConnectionManager`] and [`ManagerBuilder`] |

// ============================================================================
// Submodules
// ============================================================================

/// Connection handle.
pub mod connection;

/// Per-connection lifecycle task.
mod lifecycle;

/// Caller handlers.
pub mod listeners;

/// Connection manager and builder.
pub mod manager;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use listeners::{ClosedHandler, FailedHandler, Listeners, MessageHandler, OpenHandler};
pub use manager::{Backend, ConnectionManager, ManagerBuilder};
