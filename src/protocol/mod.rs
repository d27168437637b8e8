//! Frame and closure types shared by every backend.
//!
//! # Overview
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Payload`] | Opaque text or binary frame |
//! | [`CloseInfo`] | Code and reason of an observed closure |
//! | [`CloseCode`] | Typed RFC 6455 status code |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `close` | Close codes and the close reason classifier |
//! | `message` | Payload and close detail types |

// ============================================================================
// Submodules
// ============================================================================

/// Close codes and close reason classification.
pub mod close;

/// Payload and close detail types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use close::{CloseCode, UNKNOWN_REASON, classify};
pub use message::{CloseInfo, Payload};
