//! PostgreSQL transcript store.
//!
//! Schema (created on startup, never migrated):
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS messages (
//!     id SERIAL PRIMARY KEY,
//!     chat_id BIGINT NOT NULL,
//!     user_message TEXT,
//!     ai_response TEXT,
//!     timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! )
//! ```
//!
//! Inbound rows fill `user_message`, outbound rows fill `ai_response`.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use super::{PersistenceError, TranscriptStore};
use crate::config::DatabaseConfig;
use crate::transport::ConversationId;

const CREATE_MESSAGES_TABLE: &str = "CREATE TABLE IF NOT EXISTS messages (
    id SERIAL PRIMARY KEY,
    chat_id BIGINT NOT NULL,
    user_message TEXT,
    ai_response TEXT,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

const INSERT_USER_MESSAGE: &str = "INSERT INTO messages (chat_id, user_message) VALUES ($1, $2)";

const INSERT_AI_RESPONSE: &str = "INSERT INTO messages (chat_id, ai_response) VALUES ($1, $2)";

/// Connection-pooled transcript store. Each write acquires and releases its
/// own connection.
#[derive(Debug, Clone)]
pub struct PgTranscriptStore {
    pool: PgPool,
}

impl PgTranscriptStore {
    /// Open a pool for `config.url`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, PersistenceError> {
        let url = config
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| PersistenceError::Unavailable("database.url is not set".into()))?;

        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(url)
            .await?;

        info!(
            min = config.min_connections,
            max = config.max_connections,
            "Connected to transcript database"
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `messages` table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), PersistenceError> {
        sqlx::query(CREATE_MESSAGES_TABLE)
            .execute(&self.pool)
            .await?;
        debug!("messages table ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TranscriptStore for PgTranscriptStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn record_inbound(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<(), PersistenceError> {
        sqlx::query(INSERT_USER_MESSAGE)
            .bind(conversation.as_i64())
            .bind(text)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_outbound(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<(), PersistenceError> {
        sqlx::query(INSERT_AI_RESPONSE)
            .bind(conversation.as_i64())
            .bind(text)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
