//! OpenAI chat-completions provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{RouterError, RouterResult};
use super::provider::{CompletionProvider, CompletionRequest, CompletionResponse, ResponseFormat};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const PROVIDER_ID: &str = "openai";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormatParam {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatParam>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("taskgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: CompletionRequest) -> RouterResult<CompletionResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RouterError::ProviderUnavailable {
                provider: PROVIDER_ID.to_string(),
            })?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: match request.response_format {
                ResponseFormat::Json => Some(ResponseFormatParam {
                    kind: "json_object",
                }),
                ResponseFormat::Text => None,
            },
        };

        debug!(model = %request.model, "sending OpenAI chat completion");

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RouterError::provider(PROVIDER_ID, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RouterError::provider(
                PROVIDER_ID,
                format!("API error {status}: {error_text}"),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RouterError::provider(PROVIDER_ID, format!("malformed response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RouterError::provider(PROVIDER_ID, "no choices in response"))?;

        Ok(CompletionResponse { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_requires_non_blank_key() {
        assert!(!OpenAiProvider::new(None, None).is_configured());
        assert!(!OpenAiProvider::new(Some("  ".into()), None).is_configured());
        assert!(OpenAiProvider::new(Some("sk-test".into()), None).is_configured());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let p = OpenAiProvider::new(None, Some("http://localhost:8080/".into()));
        assert_eq!(p.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_unconfigured_complete_is_unavailable() {
        let p = OpenAiProvider::new(None, None);
        let err = p
            .complete(CompletionRequest {
                model: "gpt-4o".into(),
                system_prompt: None,
                prompt: "hi".into(),
                temperature: 0.0,
                max_tokens: 8,
                response_format: ResponseFormat::Text,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::ProviderUnavailable { .. }));
    }
}
