//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set. Otherwise the configured level applies to this
//! crate and noisy transport libraries are held at `warn`.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::Result;

/// Library targets held at `warn` unless `RUST_LOG` says otherwise.
pub const NOISY_MODULES: &[&str] = &[
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
    "sqlx",
    "teloxide",
];

/// Build the filter directives for `level` with noise suppression.
pub fn filter_directives(level: &str) -> String {
    let mut directives = String::from(level);
    for module in NOISY_MODULES {
        directives.push_str(&format!(",{}=warn", module));
    }
    directives
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(level)))
}

/// Install the global subscriber: stdout in the configured format, plus an
/// optional plain-text file.
///
/// Calling this twice is harmless; the second subscriber is ignored.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry()
        .with(build_filter(&config.level))
        .with(file_layer);

    match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true);
            let _ = subscriber.with(fmt_layer).try_init();
        }
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(true);
            let _ = subscriber.with(fmt_layer).try_init();
        }
    }

    tracing::debug!(
        level = %config.level,
        format = ?config.format,
        file = ?config.file,
        "Logging initialized"
    );
    Ok(())
}
