//! Anthropic Messages API backend.

use super::{AiBackend, AiError, BackendKind, http_client, read_response, system_prompt};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    language: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicBackend {
    /// Backend against `ANTHROPIC_BASE_URL`, or the public API.
    pub fn new(model: Option<String>) -> Result<Self, AiError> {
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(base_url, model)
    }

    pub fn with_base_url(base_url: impl Into<String>, model: Option<String>) -> Result<Self, AiError> {
        Ok(Self {
            http_client: http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.unwrap_or_else(|| BackendKind::Anthropic.default_model().to_string()),
            api_key: None,
            language: "english".to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Concatenate the text blocks of a reply.
fn completion_text(response: MessagesResponse) -> Result<String, AiError> {
    let text = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");

    let text = text.trim();
    if text.is_empty() {
        return Err(AiError::Parse("response contained no text".to_string()));
    }
    Ok(text.to_string())
}

#[async_trait]
impl AiBackend for AnthropicBackend {
    fn name(&self) -> &str {
        BackendKind::Anthropic.as_str()
    }

    fn configure(&mut self, credential: &str, language: &str) -> Result<(), AiError> {
        if credential.trim().is_empty() {
            return Err(AiError::NotConfigured(BackendKind::Anthropic));
        }
        self.api_key = Some(credential.trim().to_string());
        self.language = language.to_string();
        Ok(())
    }

    async fn get_completion(&self, prompt: &str) -> Result<String, AiError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AiError::NotConfigured(BackendKind::Anthropic))?;

        let system = system_prompt(&self.language);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: &system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!("{}/v1/messages", self.base_url);
        debug!("POST {} (model {})", url, self.model);

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        completion_text(read_response(response).await?)
    }
}
