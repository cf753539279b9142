//! Append-only transcript of inbound and outbound messages.
//!
//! The pipeline only writes; nothing in this crate updates or deletes a
//! record. [`postgres::PgTranscriptStore`] is the production store and
//! [`memory::MemoryTranscriptStore`] is the fallback when no database is
//! configured.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::ConversationId;

pub use memory::MemoryTranscriptStore;
pub use postgres::PgTranscriptStore;

/// Whether a record is the user's message or the generated reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbound => f.write_str("inbound"),
            Self::Outbound => f.write_str("outbound"),
        }
    }
}

/// One persisted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub conversation: ConversationId,
    pub direction: Direction,
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

impl TranscriptRecord {
    pub fn new(conversation: ConversationId, direction: Direction, text: &str) -> Self {
        Self {
            conversation,
            direction,
            text: text.to_string(),
            recorded_at: Utc::now(),
        }
    }
}

/// A transcript write failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("transcript store unavailable: {0}")]
    Unavailable(String),
}

/// Write-only transcript store. Each call is committed independently.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Store name for logs.
    fn name(&self) -> &str;

    /// Append the user's message.
    async fn record_inbound(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<(), PersistenceError>;

    /// Append the generated reply.
    async fn record_outbound(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<(), PersistenceError>;
}
