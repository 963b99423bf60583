//! AI backends that turn failure reasons into explanations.
//!
//! The explanation pipeline only sees the [`AiBackend`] trait. Providers
//! speak their own HTTP APIs and translate an HTTP 429 into
//! [`AiError::QuotaExhausted`] at the point the response is read, so callers
//! never inspect error text.

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicBackend;
pub use openai::OpenAiBackend;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// User agent for backend requests
const USER_AGENT: &str = concat!("kube-doctor/", env!("CARGO_PKG_VERSION"));

/// Request timeout for completions
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that can occur when talking to an AI backend
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned an error response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Backend refused the request because the quota is used up
    #[error("Exhausted API quota")]
    QuotaExhausted,

    #[error("{0} backend is not configured, run `kube-doctor auth --backend {0}`")]
    NotConfigured(BackendKind),

    /// Response did not have the expected shape
    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Unknown AI backend: {0}")]
    UnknownBackend(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    OpenAi,
    Anthropic,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::OpenAi, BackendKind::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Anthropic => "anthropic",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "gpt-4o-mini",
            BackendKind::Anthropic => "claude-3-5-haiku-latest",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "OPENAI_API_KEY",
            BackendKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AiError::UnknownBackend(s.to_string()))
    }
}

/// A completion provider.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Provider name, for logs and messages.
    fn name(&self) -> &str;

    /// Set the credential and the language answers should be written in.
    fn configure(&mut self, credential: &str, language: &str) -> Result<(), AiError>;

    /// Send one prompt and return the completion text.
    async fn get_completion(&self, prompt: &str) -> Result<String, AiError>;
}

/// Build an unconfigured backend for `kind`.
pub fn create_backend(
    kind: BackendKind,
    model: Option<String>,
) -> Result<Box<dyn AiBackend>, AiError> {
    Ok(match kind {
        BackendKind::OpenAi => Box::new(OpenAiBackend::new(model)?),
        BackendKind::Anthropic => Box::new(AnthropicBackend::new(model)?),
    })
}

pub(crate) fn http_client() -> Result<Client, AiError> {
    Ok(Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Map a non-success response to an error.
pub(crate) fn error_for_status(status: u16, body: &str) -> AiError {
    if status == 429 {
        return AiError::QuotaExhausted;
    }

    // Both providers wrap failures as {"error": {"message": ...}}
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());

    AiError::Api { status, message }
}

/// Read a response, mapping error statuses.
pub(crate) async fn read_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AiError> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status.as_u16(), &body))
    }
}

/// System instruction shared by the providers.
pub(crate) fn system_prompt(language: &str) -> String {
    format!(
        "You are a Kubernetes expert helping an operator fix a broken cluster. Answer in {}.",
        language
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("openai".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
        assert_eq!(
            "Anthropic".parse::<BackendKind>().unwrap(),
            BackendKind::Anthropic
        );
        assert!(matches!(
            "llama".parse::<BackendKind>(),
            Err(AiError::UnknownBackend(name)) if name == "llama"
        ));
    }

    #[test]
    fn test_429_is_quota_exhausted() {
        assert!(matches!(
            error_for_status(429, "{\"error\":{\"message\":\"You exceeded your current quota\"}}"),
            AiError::QuotaExhausted
        ));
    }

    #[test]
    fn test_other_statuses_keep_provider_message() {
        match error_for_status(401, "{\"error\":{\"message\":\"Incorrect API key provided\"}}") {
            AiError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {}", other),
        }

        match error_for_status(502, "Bad Gateway") {
            AiError::Api { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_backend_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&BackendKind::OpenAi).unwrap(),
            "\"openai\""
        );
        assert_eq!(
            serde_json::from_str::<BackendKind>("\"anthropic\"").unwrap(),
            BackendKind::Anthropic
        );
    }
}
