//! Generation backend abstraction.
//!
//! A backend turns one prompt into one reply. Whatever goes wrong on the way
//! (network, auth, HTTP status, malformed body) comes back as a single
//! [`BackendError`] so callers handle one failure shape.

pub mod openai;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAiBackend;

/// System prompt sent with every request.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Fixed sampling parameters. Not runtime-configurable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

pub const GENERATION_PARAMS: GenerationParams = GenerationParams {
    temperature: 0.7,
    max_tokens: 1000,
    top_p: 1.0,
};

/// Broad category of a backend failure, for logs and metrics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Connection, DNS, TLS or timeout.
    Network,
    /// 401 / 403.
    Auth,
    /// Any other non-success status, or an error object in the body.
    Api,
    /// The body could not be parsed or carried no reply text.
    MalformedResponse,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Auth => "auth",
            Self::Api => "api",
            Self::MalformedResponse => "malformed response",
        };
        f.write_str(s)
    }
}

/// The generation call failed.
#[derive(Debug, Error)]
#[error("Error getting AI response ({kind}): {message}")]
pub struct BackendError {
    kind: BackendErrorKind,
    message: String,
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> BackendErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

/// A text generation backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Generate a reply for `prompt`. No retries.
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}
