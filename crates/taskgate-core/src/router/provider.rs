//! The single interface every inference provider implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::RouterResult;

/// Requested response format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// A fully resolved request for one provider attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub content: String,
}

/// An inference provider.
///
/// Implementations report failures as `RouterError::ProviderUnavailable` or
/// `RouterError::ProviderError`; the router adds timeouts.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Stable provider id referenced by route bindings (e.g. `"openai"`).
    fn id(&self) -> &str;

    /// Whether the provider holds usable credentials.
    fn is_configured(&self) -> bool;

    async fn complete(&self, request: CompletionRequest) -> RouterResult<CompletionResponse>;
}

/// Provider credentials, read from the environment only.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: Option<String>,
}

impl ProviderCredentials {
    /// Reads `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `ANTHROPIC_API_KEY`,
    /// `ANTHROPIC_BASE_URL`. Empty values count as unset.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL"),
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            anthropic_base_url: var("ANTHROPIC_BASE_URL"),
        }
    }
}
