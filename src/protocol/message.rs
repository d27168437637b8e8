//! Frame payloads and close details.
//!
//! Payloads are opaque: the crate never parses them, it only moves them
//! between the caller and the transport.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use super::close::{CloseCode, classify};

// ============================================================================
// Payload
// ============================================================================

/// A single WebSocket data frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum Payload {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl Payload {
    /// Returns the text content, if this is a text frame.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Returns the raw bytes of the frame.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(data) => data,
        }
    }

    /// Returns the frame length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` if the frame carries no data.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(data)
    }
}

impl From<&[u8]> for Payload {
    fn from(data: &[u8]) -> Self {
        Self::Binary(data.to_vec())
    }
}

// ============================================================================
// CloseInfo
// ============================================================================

/// Details of an observed closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseInfo {
    /// Close status code.
    pub code: i64,
    /// Reason text sent by the peer, possibly empty.
    pub reason: String,
    /// Whether a local disconnect was requested before the close arrived.
    pub initiated_locally: bool,
}

impl CloseInfo {
    /// Creates close details for a remote-initiated closure.
    #[inline]
    #[must_use]
    pub fn new(code: i64, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            initiated_locally: false,
        }
    }

    /// Creates close details for a closure without a close frame (1006).
    #[inline]
    #[must_use]
    pub fn abnormal() -> Self {
        Self::new(CloseCode::Abnormal.code(), "")
    }

    /// Marks the closure as requested by the local side.
    #[inline]
    #[must_use]
    pub fn locally_initiated(mut self) -> Self {
        self.initiated_locally = true;
        self
    }

    /// Returns the typed close code.
    #[inline]
    #[must_use]
    pub fn close_code(&self) -> CloseCode {
        CloseCode::from_code(self.code)
    }

    /// Returns the classified description of this closure.
    #[inline]
    #[must_use]
    pub fn description(&self) -> String {
        classify(self.code, &self.reason)
    }

    /// Returns `true` for a normal (1000) closure.
    #[inline]
    #[must_use]
    pub fn is_normal(&self) -> bool {
        self.close_code() == CloseCode::Normal
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_text() {
        let payload = Payload::from("hello");
        assert_eq!(payload.as_text(), Some("hello"));
        assert_eq!(payload.len(), 5);
        assert!(!payload.is_empty());
    }

    #[test]
    fn test_payload_from_bytes() {
        let payload = Payload::from(vec![1u8, 2, 3]);
        assert_eq!(payload.as_text(), None);
        assert_eq!(payload.as_bytes(), &[1, 2, 3]);
        assert!(Payload::from(&b""[..]).is_empty());
    }

    #[test]
    fn test_payload_serde_shape() {
        let json = serde_json::to_value(Payload::from("hi")).expect("serialize");
        assert_eq!(json, serde_json::json!({ "kind": "text", "data": "hi" }));
    }

    #[test]
    fn test_close_info_description() {
        let info = CloseInfo::new(1010, "permessage-deflate");
        assert_eq!(info.close_code(), CloseCode::Extension);
        assert!(info.description().ends_with("permessage-deflate"));
        assert!(!info.initiated_locally);
    }

    #[test]
    fn test_close_info_abnormal() {
        let info = CloseInfo::abnormal();
        assert_eq!(info.code, 1006);
        assert!(info.reason.is_empty());
        assert!(!info.is_normal());
    }

    #[test]
    fn test_close_info_locally_initiated() {
        let info = CloseInfo::new(1000, "bye").locally_initiated();
        assert!(info.initiated_locally);
        assert!(info.is_normal());

        let json = serde_json::to_value(&info).expect("serialize");
        assert_eq!(json["initiatedLocally"], serde_json::json!(true));
    }
}
