//! Configuration: JSON file with environment overrides.
//!
//! Lookup order for each value: built-in default, then
//! `~/.relaybot/config.json` (or `--config <path>`), then environment
//! variables (a `.env` file in the working directory is loaded first).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{CacheLimits, CacheReadPolicy};
use crate::error::{RelayError, Result};

/// Default chat completions endpoint.
pub const DEFAULT_BASE_URL: &str = "https://models.inference.ai.azure.com";

/// Default model id.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    pub backend: BackendConfig,
    pub cache: CacheConfig,
    pub presence: PresenceConfig,
    pub logging: LoggingConfig,
}

/// Telegram bot credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: Option<String>,
}

/// Transcript database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL URL. When unset the transcript is kept in memory.
    pub url: Option<String>,
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            min_connections: 5,
            max_connections: 20,
            acquire_timeout_secs: 30,
        }
    }
}

/// Generation backend endpoint. Sampling parameters are fixed in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Upper bound on one generation call, including connect and body read.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

/// Response cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub session_capacity: usize,
    pub session_ttl_secs: u64,
    pub global_capacity: usize,
    pub read_policy: CacheReadPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let limits = CacheLimits::default();
        Self {
            session_capacity: limits.session_capacity,
            session_ttl_secs: limits.session_ttl_secs,
            global_capacity: limits.global_capacity,
            read_policy: CacheReadPolicy::default(),
        }
    }
}

impl CacheConfig {
    pub fn limits(&self) -> CacheLimits {
        CacheLimits {
            session_capacity: self.session_capacity,
            session_ttl_secs: self.session_ttl_secs,
            global_capacity: self.global_capacity,
        }
    }
}

/// Typing indicator cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub interval_ms: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self { interval_ms: 3000 }
    }
}

impl PresenceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(RelayError::Config(format!("unknown log format '{}'", other))),
        }
    }
}

/// Logging output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Optional plain-text log file, written alongside stdout.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// `~/.relaybot`
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".relaybot")
    }

    /// `~/.relaybot/config.json`
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load config from `path` (or the default path) and apply environment
    /// overrides.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(p) => Self::load_from_path(p)?,
            None => {
                let default_path = Self::path();
                if default_path.exists() {
                    Self::load_from_path(&default_path)?
                } else {
                    debug!(path = %default_path.display(), "No config file, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env_with(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse a JSON config file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Apply environment overrides using `get` as the variable lookup.
    pub fn apply_env_with<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| get(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.token = Some(v);
        }
        if let Some(v) = get("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = get("RELAYBOT_API_KEY").or_else(|| get("GITHUB_TOKEN")) {
            self.backend.api_key = Some(v);
        }
        if let Some(v) = get("AI_BASE_URL") {
            self.backend.base_url = v;
        }
        if let Some(v) = get("RELAYBOT_MODEL") {
            self.backend.model = v;
        }
        if let Some(v) = get("RELAYBOT_LOG_FORMAT") {
            match v.parse::<LogFormat>() {
                Ok(format) => self.logging.format = format,
                Err(e) => debug!("Ignoring RELAYBOT_LOG_FORMAT: {}", e),
            }
        }
        if let Some(v) = get("RELAYBOT_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(v));
        }
    }

    /// Check everything `relaybot run` needs.
    pub fn validate_for_run(&self) -> Result<()> {
        if self.telegram_token().is_none() {
            return Err(RelayError::Config(
                "telegram.token is not set (or TELEGRAM_BOT_TOKEN)".into(),
            ));
        }
        self.validate_backend()
    }

    /// Check everything a backend call needs.
    pub fn validate_backend(&self) -> Result<()> {
        if self
            .backend
            .api_key
            .as_deref()
            .map_or(true, |k| k.trim().is_empty())
        {
            return Err(RelayError::Config(
                "backend.api_key is not set (or GITHUB_TOKEN / RELAYBOT_API_KEY)".into(),
            ));
        }
        if self.backend.timeout_secs == 0 {
            return Err(RelayError::Config("backend.timeout_secs must be > 0".into()));
        }
        if self.database.max_connections == 0
            || self.database.min_connections > self.database.max_connections
        {
            return Err(RelayError::Config(
                "database pool bounds are invalid (need 0 < min <= max)".into(),
            ));
        }
        Ok(())
    }

    pub fn telegram_token(&self) -> Option<&str> {
        self.telegram
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }

    /// Copy with secrets replaced, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let mask = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some("[REDACTED]".to_string());
            }
        };
        mask(&mut copy.telegram.token);
        mask(&mut copy.backend.api_key);
        mask(&mut copy.database.url);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let cfg = Config::default();
        assert!(cfg.telegram.token.is_none());
        assert_eq!(cfg.database.min_connections, 5);
        assert_eq!(cfg.database.max_connections, 20);
        assert_eq!(cfg.backend.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.backend.model, "gpt-4o");
        assert_eq!(cfg.backend.timeout_secs, 120);
        assert_eq!(cfg.cache.session_capacity, 10_000);
        assert_eq!(cfg.cache.session_ttl_secs, 3600);
        assert_eq!(cfg.cache.global_capacity, 1_000);
        assert_eq!(cfg.cache.read_policy, CacheReadPolicy::GlobalOnly);
        assert_eq!(cfg.presence.interval(), Duration::from_secs(3));
        assert_eq!(cfg.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_config_deserialize_partial() {
        let json = r#"{"backend": {"model": "gpt-4o-mini"}, "cache": {"read_policy": "freshest"}}"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.backend.model, "gpt-4o-mini");
        assert_eq!(cfg.backend.base_url, DEFAULT_BASE_URL); // default
        assert_eq!(cfg.cache.read_policy, CacheReadPolicy::Freshest);
        assert_eq!(cfg.cache.global_capacity, 1_000); // default
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = Config::default();
        cfg.apply_env_with(env(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "postgres://localhost/relay"),
            ("GITHUB_TOKEN", "ghp_x"),
            ("AI_BASE_URL", "http://localhost:8080"),
            ("RELAYBOT_LOG_FORMAT", "json"),
        ]));
        assert_eq!(cfg.telegram_token(), Some("123:abc"));
        assert_eq!(cfg.database.url.as_deref(), Some("postgres://localhost/relay"));
        assert_eq!(cfg.backend.api_key.as_deref(), Some("ghp_x"));
        assert_eq!(cfg.backend.base_url, "http://localhost:8080");
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_relaybot_api_key_wins_over_github_token() {
        let mut cfg = Config::default();
        cfg.apply_env_with(env(&[("GITHUB_TOKEN", "gh"), ("RELAYBOT_API_KEY", "rb")]));
        assert_eq!(cfg.backend.api_key.as_deref(), Some("rb"));
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut cfg = Config::default();
        cfg.telegram.token = Some("from-file".into());
        cfg.apply_env_with(env(&[("TELEGRAM_BOT_TOKEN", "  ")]));
        assert_eq!(cfg.telegram_token(), Some("from-file"));
    }

    #[test]
    fn test_validate_for_run() {
        let mut cfg = Config::default();
        assert!(matches!(cfg.validate_for_run(), Err(RelayError::Config(_))));
        cfg.telegram.token = Some("t".into());
        assert!(cfg.validate_for_run().is_err(), "api key still missing");
        cfg.backend.api_key = Some("k".into());
        assert!(cfg.validate_for_run().is_ok());
        cfg.database.min_connections = 50;
        assert!(cfg.validate_for_run().is_err());
    }

    #[test]
    fn test_load_from_path_and_missing_explicit_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"presence": {"interval_ms": 500}}"#).unwrap();
        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.presence.interval(), Duration::from_millis(500));

        let missing = tmp.path().join("nope.json");
        assert!(matches!(
            Config::load_from_path(&missing),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let mut cfg = Config::default();
        cfg.telegram.token = Some("secret-token".into());
        cfg.backend.api_key = Some("secret-key".into());
        let shown = serde_json::to_string(&cfg.redacted()).unwrap();
        assert!(!shown.contains("secret-token"));
        assert!(!shown.contains("secret-key"));
        assert!(shown.contains("[REDACTED]"));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
