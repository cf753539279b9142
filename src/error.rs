//! Crate-level error type for startup, configuration and CLI paths.
//!
//! Per-message failures have their own types ([`crate::backend::BackendError`],
//! [`crate::transcript::PersistenceError`], [`crate::transport::TransportError`])
//! so the pipeline can classify them; they convert into [`RelayError`] when
//! they escape to a caller that only needs to report them.

use thiserror::Error;

use crate::backend::BackendError;
use crate::transcript::PersistenceError;
use crate::transport::TransportError;

/// Errors surfaced outside the per-message pipeline.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The generation backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The transcript store failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The chat transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias using [`RelayError`].
pub type Result<T> = std::result::Result<T, RelayError>;
