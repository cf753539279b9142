//! Chat transport seam.
//!
//! The pipeline only ever needs two outbound operations: send a text reply
//! and send a "typing" notification. [`Transport`] captures exactly that so
//! the Telegram adapter in [`telegram`] and the recording stubs used in tests
//! are interchangeable.

pub mod telegram;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use telegram::TelegramTransport;

/// Opaque identifier of a chat/session, supplied by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl ConversationId {
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A failed outbound transport operation.
#[derive(Debug, Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Outbound operations the pipeline performs against the chat platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &str;

    /// Deliver a text message to the conversation.
    async fn send_text(&self, conversation: ConversationId, text: &str)
        -> Result<(), TransportError>;

    /// Show a "typing" / "processing" indicator in the conversation.
    async fn send_typing(&self, conversation: ConversationId) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_id_display_and_from() {
        let id = ConversationId::from(-100123);
        assert_eq!(id.to_string(), "-100123");
        assert_eq!(id.as_i64(), -100123);
    }

    #[test]
    fn test_conversation_id_serde_transparent() {
        let json = serde_json::to_string(&ConversationId(42)).unwrap();
        assert_eq!(json, "42");
        let back: ConversationId = serde_json::from_str("42").unwrap();
        assert_eq!(back, ConversationId(42));
    }

    #[test]
    fn test_transport_error_keeps_source() {
        use std::error::Error as _;
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err = TransportError::with_source("send failed", io);
        assert_eq!(err.to_string(), "transport error: send failed");
        assert!(err.source().is_some());
    }
}
