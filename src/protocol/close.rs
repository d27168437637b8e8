//! Close codes and close reason classification.
//!
//! Maps the status codes of RFC 6455 §7.4.1 to fixed diagnostic strings.
//! The table is a compatibility contract with every WebSocket peer, so the
//! meanings must not drift.
//!
//! # Codes
//!
//! | Code | Variant |
//! |------|---------|
//! | 1000 | [`CloseCode::Normal`] |
//! | 1001 | [`CloseCode::Away`] |
//! | 1002 | [`CloseCode::Protocol`] |
//! | 1003 | [`CloseCode::Unsupported`] |
//! | 1004 | [`CloseCode::Reserved`] |
//! | 1005 | [`CloseCode::NoStatus`] |
//! | 1006 | [`CloseCode::Abnormal`] |
//! | 1007 | [`CloseCode::Invalid`] |
//! | 1008 | [`CloseCode::Policy`] |
//! | 1009 | [`CloseCode::TooBig`] |
//! | 1010 | [`CloseCode::Extension`] |
//! | 1011 | [`CloseCode::Error`] |
//! | 1015 | [`CloseCode::Tls`] |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Description returned for codes outside the standardized table.
pub const UNKNOWN_REASON: &str = "Unknown reason";

const NORMAL: &str = "Normal closure, meaning that the purpose for which the connection was established has been fulfilled.";
const AWAY: &str = "An endpoint is \"going away\", such as a server going down or a browser having navigated away from a page.";
const PROTOCOL: &str = "An endpoint is terminating the connection due to a protocol error.";
const UNSUPPORTED: &str = "An endpoint is terminating the connection because it has received a type of data it cannot accept (e.g., an endpoint that understands only text data MAY send this if it receives a binary message).";
const RESERVED: &str = "Reserved. The specific meaning might be defined in the future.";
const NO_STATUS: &str = "No status code was actually present.";
const ABNORMAL: &str = "The connection was closed abnormally, e.g., without sending or receiving a Close control frame.";
const INVALID: &str = "An endpoint is terminating the connection because it has received data within a message that was not consistent with the type of the message (e.g., non-UTF-8 data within a text message).";
const POLICY: &str = "An endpoint is terminating the connection because it has received a message that \"violates its policy\". This reason is given either if there is no other suitable reason, or if there is a need to hide specific details about the policy.";
const TOO_BIG: &str = "An endpoint is terminating the connection because it has received a message that is too big for it to process.";
const EXTENSION: &str = "An endpoint (client) is terminating the connection because it has expected the server to negotiate one or more extension, but the server didn't return them in the response message of the WebSocket handshake. Specifically, the extensions that are needed are: ";
const ERROR: &str = "A server is terminating the connection because it encountered an unexpected condition that prevented it from fulfilling the request.";
const TLS: &str = "The connection was closed due to a failure to perform a TLS handshake (e.g., the server certificate can't be verified).";

// ============================================================================
// classify
// ============================================================================

/// Describes why a connection closed.
///
/// Total and pure: every integer yields a string and identical inputs yield
/// identical outputs. `reason` is only consulted for code 1010, where it
/// names the extensions the client required and is appended verbatim.
///
/// # Example
///
/// ```
/// use wslink::protocol::close::classify;
///
/// assert!(classify(1000, "").starts_with("Normal closure"));
/// assert!(classify(1010, "foo,bar").ends_with("foo,bar"));
/// assert_eq!(classify(-1, ""), "Unknown reason");
/// ```
#[must_use]
pub fn classify(code: i64, reason: &str) -> String {
    CloseCode::from_code(code).describe(reason)
}

// ============================================================================
// CloseCode
// ============================================================================

/// Typed view over a close status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloseCode {
    /// 1000: purpose fulfilled.
    Normal,
    /// 1001: endpoint going away.
    Away,
    /// 1002: protocol error.
    Protocol,
    /// 1003: unacceptable data type.
    Unsupported,
    /// 1004: reserved.
    Reserved,
    /// 1005: no status code present.
    NoStatus,
    /// 1006: closed without a close frame.
    Abnormal,
    /// 1007: data inconsistent with message type.
    Invalid,
    /// 1008: policy violation.
    Policy,
    /// 1009: message too big.
    TooBig,
    /// 1010: required extensions not negotiated.
    Extension,
    /// 1011: unexpected server condition.
    Error,
    /// 1015: TLS handshake failure.
    Tls,
    /// Any code outside the table.
    Other(i64),
}

impl CloseCode {
    /// Creates a close code from its numeric value.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::Away,
            1002 => Self::Protocol,
            1003 => Self::Unsupported,
            1004 => Self::Reserved,
            1005 => Self::NoStatus,
            1006 => Self::Abnormal,
            1007 => Self::Invalid,
            1008 => Self::Policy,
            1009 => Self::TooBig,
            1010 => Self::Extension,
            1011 => Self::Error,
            1015 => Self::Tls,
            other => Self::Other(other),
        }
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Normal => 1000,
            Self::Away => 1001,
            Self::Protocol => 1002,
            Self::Unsupported => 1003,
            Self::Reserved => 1004,
            Self::NoStatus => 1005,
            Self::Abnormal => 1006,
            Self::Invalid => 1007,
            Self::Policy => 1008,
            Self::TooBig => 1009,
            Self::Extension => 1010,
            Self::Error => 1011,
            Self::Tls => 1015,
            Self::Other(code) => *code,
        }
    }

    /// Returns `true` for codes listed in the standardized table.
    #[inline]
    #[must_use]
    pub const fn is_standard(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Returns `true` if an endpoint may put this code in a close frame.
    ///
    /// 1004, 1005, 1006 and 1015 are reserved for local reporting.
    #[must_use]
    pub const fn is_sendable(&self) -> bool {
        match self {
            Self::Reserved | Self::NoStatus | Self::Abnormal | Self::Tls => false,
            Self::Other(code) => matches!(*code, 1012..=1014 | 3000..=4999),
            _ => true,
        }
    }

    /// Returns the fixed description for this code.
    ///
    /// `reason` is appended only for [`CloseCode::Extension`].
    #[must_use]
    pub fn describe(&self, reason: &str) -> String {
        let text = match self {
            Self::Normal => NORMAL,
            Self::Away => AWAY,
            Self::Protocol => PROTOCOL,
            Self::Unsupported => UNSUPPORTED,
            Self::Reserved => RESERVED,
            Self::NoStatus => NO_STATUS,
            Self::Abnormal => ABNORMAL,
            Self::Invalid => INVALID,
            Self::Policy => POLICY,
            Self::TooBig => TOO_BIG,
            Self::Extension => return format!("{EXTENSION}{reason}"),
            Self::Error => ERROR,
            Self::Tls => TLS,
            Self::Other(_) => UNKNOWN_REASON,
        };
        text.to_owned()
    }
}

impl From<i64> for CloseCode {
    fn from(code: i64) -> Self {
        Self::from_code(code)
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self::from_code(i64::from(code))
    }
}

impl From<CloseCode> for i64 {
    fn from(code: CloseCode) -> Self {
        code.code()
    }
}

// ============================================================================
// Tests
// ============================================================================
