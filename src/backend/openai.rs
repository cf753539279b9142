//! OpenAI-compatible chat completions backend.
//!
//! Works against any endpoint that speaks `POST /chat/completions`
//! (GitHub Models / Azure inference by default).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::BackendConfig;

use super::{Backend, BackendError, BackendErrorKind, GENERATION_PARAMS, SYSTEM_PROMPT};

/// Chat completions client.
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiBackend {
    /// Build a client from config. The request timeout bounds every call.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let api_key = config.api_key.clone().unwrap_or_default();
        Self::new(
            &config.base_url,
            &api_key,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            BackendError::new(BackendErrorKind::Network, "failed to build HTTP client")
                .with_source(e)
        })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the request body for a single user turn.
    pub fn build_request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": GENERATION_PARAMS.temperature,
            "max_tokens": GENERATION_PARAMS.max_tokens,
            "top_p": GENERATION_PARAMS.top_p,
        })
    }

    /// Extract the first choice's message content. Blank content counts as
    /// no content.
    pub fn extract_text(response: &Value) -> Option<String> {
        response["choices"][0]["message"]["content"]
            .as_str()
            .filter(|text| !text.trim().is_empty())
            .map(String::from)
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn classify_request_error(e: reqwest::Error) -> BackendError {
        let kind = if e.is_decode() {
            BackendErrorKind::MalformedResponse
        } else {
            BackendErrorKind::Network
        };
        BackendError::new(kind, format!("request failed: {}", e)).with_source(e)
    }

    fn status_error(status: u16, body: &str) -> BackendError {
        let kind = match status {
            401 | 403 => BackendErrorKind::Auth,
            _ => BackendErrorKind::Api,
        };
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or_else(|| body.to_string());
        BackendError::new(kind, format!("HTTP {}: {}", status, message)).with_status(status)
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let body = self.build_request_body(prompt);
        debug!(model = %self.model, "Chat completions request");

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Self::classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status.as_u16(), &error_text));
        }

        let json: Value = response.json().await.map_err(|e| {
            BackendError::new(
                BackendErrorKind::MalformedResponse,
                format!("failed to parse response: {}", e),
            )
            .with_source(e)
        })?;

        if let Some(message) = json["error"]["message"].as_str() {
            return Err(BackendError::new(BackendErrorKind::Api, message));
        }

        Self::extract_text(&json).ok_or_else(|| {
            BackendError::new(
                BackendErrorKind::MalformedResponse,
                "response carried no message content",
            )
        })
    }
}
