use crate::ai::BackendKind;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai: AiConfig,
    pub analysis: AnalysisDefaults,
}

/// AI backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Default backend (openai or anthropic)
    pub backend: BackendKind,
    /// Language explanations are written in
    #[serde(default = "default_language")]
    pub language: String,
    /// Model override; each backend has its own default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,
}

/// Defaults for `analyze`, overridden by its flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisDefaults {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

fn default_language() -> String {
    "english".to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            language: default_language(),
            model: None,
            openai_api_key: None,
            anthropic_api_key: None,
        }
    }
}

impl AiConfig {
    /// Key stored in the config file for `kind`.
    pub fn stored_key(&self, kind: BackendKind) -> Option<&str> {
        match kind {
            BackendKind::OpenAi => self.openai_api_key.as_deref(),
            BackendKind::Anthropic => self.anthropic_api_key.as_deref(),
        }
        .filter(|key| !key.is_empty())
    }

    /// Key for `kind`: the backend's environment variable wins over the file.
    pub fn api_key(&self, kind: BackendKind) -> Option<String> {
        std::env::var(kind.api_key_env())
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.stored_key(kind).map(str::to_string))
    }

    pub fn set_api_key(&mut self, kind: BackendKind, key: String) {
        match kind {
            BackendKind::OpenAi => self.openai_api_key = Some(key),
            BackendKind::Anthropic => self.anthropic_api_key = Some(key),
        }
    }
}
