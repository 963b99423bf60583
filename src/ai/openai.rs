//! OpenAI Chat Completions backend.

use super::{AiBackend, AiError, BackendKind, http_client, read_response, system_prompt};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    language: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiBackend {
    /// Backend against `OPENAI_BASE_URL`, or the public API.
    pub fn new(model: Option<String>) -> Result<Self, AiError> {
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(base_url, model)
    }

    pub fn with_base_url(base_url: impl Into<String>, model: Option<String>) -> Result<Self, AiError> {
        Ok(Self {
            http_client: http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.unwrap_or_else(|| BackendKind::OpenAi.default_model().to_string()),
            api_key: None,
            language: "english".to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(&'a self, system: &'a str, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        }
    }
}

fn completion_text(response: ChatResponse) -> Result<String, AiError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| AiError::Parse("response contained no completion".to_string()))
}

#[async_trait]
impl AiBackend for OpenAiBackend {
    fn name(&self) -> &str {
        BackendKind::OpenAi.as_str()
    }

    fn configure(&mut self, credential: &str, language: &str) -> Result<(), AiError> {
        if credential.trim().is_empty() {
            return Err(AiError::NotConfigured(BackendKind::OpenAi));
        }
        self.api_key = Some(credential.trim().to_string());
        self.language = language.to_string();
        Ok(())
    }

    async fn get_completion(&self, prompt: &str) -> Result<String, AiError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AiError::NotConfigured(BackendKind::OpenAi))?;

        let system = system_prompt(&self.language);
        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {} (model {})", url, self.model);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.request(&system, prompt))
            .send()
            .await?;

        completion_text(read_response(response).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let backend = OpenAiBackend::with_base_url("http://localhost:1/v1/", None).unwrap();
        assert_eq!(backend.base_url, "http://localhost:1/v1");
        assert_eq!(backend.model(), "gpt-4o-mini");

        let body = serde_json::to_value(backend.request("be brief", "why?")).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "why?");
    }

    #[test]
    fn test_completion_text() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "  Error: x\nSolution: y \n" } }]
        }))
        .unwrap();
        assert_eq!(completion_text(response).unwrap(), "Error: x\nSolution: y");

        let empty: ChatResponse = serde_json::from_value(serde_json::json!({ "choices": [] })).unwrap();
        assert!(matches!(completion_text(empty), Err(AiError::Parse(_))));
    }

    #[tokio::test]
    async fn test_unconfigured_backend_refuses() {
        let backend = OpenAiBackend::with_base_url("http://localhost:1", None).unwrap();
        assert!(matches!(
            backend.get_completion("hi").await,
            Err(AiError::NotConfigured(BackendKind::OpenAi))
        ));
    }

    #[test]
    fn test_configure_rejects_blank_key() {
        let mut backend = OpenAiBackend::with_base_url("http://localhost:1", None).unwrap();
        assert!(backend.configure("  ", "english").is_err());
        assert!(backend.configure("sk-test", "german").is_ok());
        assert_eq!(backend.language, "german");
    }
}
