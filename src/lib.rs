//! relaybot - relays Telegram messages to a chat completions backend.
//!
//! The crate is organised around [`pipeline::MessagePipeline`], which takes one
//! inbound message through the cache, the transcript store, the backend and
//! back out to the transport while a typing indicator runs alongside.
//!
//! ```text
//! transport ──▶ pipeline ──▶ cache (hit) ─────────────────────────▶ reply
//!                   │
//!                   └──▶ presence ─┬─ transcript ─ backend ─ transcript ─ cache ─▶ reply
//!                                  └─ "typing" every 3s until cancelled
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod presence;
pub mod transcript;
pub mod transport;

pub use backend::{Backend, BackendError, OpenAiBackend};
pub use cache::{CacheKey, ResponseCache};
pub use config::Config;
pub use error::{RelayError, Result};
pub use pipeline::{InboundMessage, MessagePipeline, Outcome};
pub use presence::{PresenceHandle, PresenceSignaler};
pub use transcript::{TranscriptRecord, TranscriptStore};
pub use transport::{ConversationId, Transport};
