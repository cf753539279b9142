//! Per-message pipeline: cache, transcript, backend, reply.
//!
//! ```text
//! RECEIVED ─▶ CACHE_CHECKED ─┬─▶ CACHE_HIT ─────────────────────────────────────────▶ REPLIED
//!                            └─▶ CACHE_MISS ─▶ PERSISTED_INBOUND ─▶ GENERATING
//!                                  ─▶ PERSISTED_OUTBOUND ─▶ CACHED ─────────────────▶ REPLIED
//! any reply that cannot be delivered ───────────────────────────────────────────────▶ FAILED
//! ```
//!
//! On a miss the typing indicator runs from before the inbound write until
//! after the cache store, and is always stopped before the reply (or the
//! apology) goes out.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::backend::{Backend, BackendError, BackendErrorKind};
use crate::cache::{CacheKey, ResponseCache};
use crate::presence::PresenceSignaler;
use crate::transcript::{PersistenceError, TranscriptStore};
use crate::transport::{ConversationId, Transport};

/// Reply sent when a message could not be answered.
pub const APOLOGY: &str =
    "I'm sorry, but I encountered an error while processing your message. Please try again later.";

/// Reply to `/start`.
pub const GREETING: &str = "Hello! I am your AI assistant. How can I help you today?";

/// One inbound message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub conversation: ConversationId,
    /// `None` for non-text updates (stickers, photos, service messages).
    pub text: Option<String>,
}

impl InboundMessage {
    pub fn text(conversation: ConversationId, text: impl Into<String>) -> Self {
        Self {
            conversation,
            text: Some(text.into()),
        }
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No usable text; nothing was sent.
    Ignored,
    /// Answered from the cache without calling the backend.
    CacheHit,
    /// Answered with a freshly generated reply.
    Replied,
    /// A backend or transcript failure was answered with [`APOLOGY`].
    Recovered,
    /// No reply could be delivered.
    Failed,
}

/// A failure on the cache-miss path that is answered with an apology.
#[derive(Debug, Error)]
pub enum Failure {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("transcript write failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl Failure {
    /// Every failure here still lets the pipeline construct a reply.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Backend(_) | Self::Persistence(_) => true,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Backend(_) => "backend",
            Self::Persistence(_) => "persistence",
        }
    }
}

/// Handles inbound messages. Cheap to share behind an `Arc`; every call to
/// [`MessagePipeline::handle`] is independent.
pub struct MessagePipeline {
    cache: Arc<ResponseCache>,
    backend: Arc<dyn Backend>,
    transcripts: Arc<dyn TranscriptStore>,
    transport: Arc<dyn Transport>,
    presence: PresenceSignaler,
}

impl MessagePipeline {
    pub fn new(
        cache: Arc<ResponseCache>,
        backend: Arc<dyn Backend>,
        transcripts: Arc<dyn TranscriptStore>,
        transport: Arc<dyn Transport>,
        presence_interval: Duration,
    ) -> Self {
        let presence = PresenceSignaler::new(Arc::clone(&transport), presence_interval);
        Self {
            cache,
            backend,
            transcripts,
            transport,
            presence,
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn presence(&self) -> &PresenceSignaler {
        &self.presence
    }

    /// Run one message through the pipeline.
    pub async fn handle(&self, inbound: InboundMessage) -> Outcome {
        let span = info_span!("message", chat_id = %inbound.conversation);
        self.handle_inner(inbound).instrument(span).await
    }

    /// Answer `/start`.
    pub async fn greet(&self, conversation: ConversationId) -> Outcome {
        debug!(chat_id = %conversation, "Start command received");
        self.deliver(conversation, GREETING, Outcome::Replied).await
    }

    async fn handle_inner(&self, inbound: InboundMessage) -> Outcome {
        let conversation = inbound.conversation;
        let text = match inbound.text.filter(|t| !t.trim().is_empty()) {
            Some(text) => text,
            None => {
                warn!("Update has no text, ignoring");
                return Outcome::Ignored;
            }
        };

        let key = CacheKey::new(conversation, text.as_str());
        if let Some(cached) = self.cache.lookup(&key) {
            info!(key = %key.fingerprint(), "Found response in cache");
            return self.deliver(conversation, &cached, Outcome::CacheHit).await;
        }

        info!(key = %key.fingerprint(), "Processing message");
        let presence = self.presence.start(conversation);
        let result = self.resolve_miss(conversation, &text, key).await;
        presence.finish().await;

        match result {
            Ok(reply) => self.deliver(conversation, &reply, Outcome::Replied).await,
            Err(failure) => {
                error!(
                    kind = failure.label(),
                    recoverable = failure.is_recoverable(),
                    "Error handling message: {failure}"
                );
                self.deliver(conversation, APOLOGY, Outcome::Recovered).await
            }
        }
    }

    /// Inbound write, generation, outbound write, cache store, in that order.
    async fn resolve_miss(
        &self,
        conversation: ConversationId,
        text: &str,
        key: CacheKey,
    ) -> Result<String, Failure> {
        self.transcripts.record_inbound(conversation, text).await?;

        let reply = self.backend.generate(text).await?;
        if reply.trim().is_empty() {
            return Err(BackendError::new(
                BackendErrorKind::MalformedResponse,
                "backend returned an empty reply",
            )
            .into());
        }
        info!(
            backend = self.backend.name(),
            chars = reply.chars().count(),
            "AI response received"
        );

        self.transcripts.record_outbound(conversation, &reply).await?;
        self.cache.store(key, reply.clone());
        Ok(reply)
    }

    async fn deliver(&self, conversation: ConversationId, text: &str, outcome: Outcome) -> Outcome {
        match self.transport.send_text(conversation, text).await {
            Ok(()) => {
                debug!(?outcome, "Reply sent to user");
                outcome
            }
            Err(e) => {
                error!(channel = self.transport.name(), "Failed to deliver reply: {e}");
                Outcome::Failed
            }
        }
    }
}

impl std::fmt::Debug for MessagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePipeline")
            .field("backend", &self.backend.name())
            .field("transcripts", &self.transcripts.name())
            .field("transport", &self.transport.name())
            .field("presence", &self.presence)
            .finish()
    }
}
