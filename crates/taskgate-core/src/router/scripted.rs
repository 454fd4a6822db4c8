//! Deterministic in-process provider for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::error::{RouterError, RouterResult};
use super::provider::{CompletionProvider, CompletionRequest, CompletionResponse};

/// One scripted outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    Content(String),
    Fail(String),
}

/// A `CompletionProvider` that replays scripted outcomes.
///
/// Queued replies (see [`ScriptedProvider::then`]) are consumed first; once the
/// queue is empty every call gets the default reply. Every request is recorded.
pub struct ScriptedProvider {
    id: String,
    configured: bool,
    default_reply: ScriptedReply,
    queued: Mutex<VecDeque<ScriptedReply>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn build(id: impl Into<String>, configured: bool, default_reply: ScriptedReply) -> Self {
        Self {
            id: id.into(),
            configured,
            default_reply,
            queued: Mutex::new(VecDeque::new()),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `content`.
    pub fn replying(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::build(id, true, ScriptedReply::Content(content.into()))
    }

    /// Always fails with a `ProviderError`.
    pub fn failing(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(id, true, ScriptedReply::Fail(message.into()))
    }

    /// Reports no credentials; the router never contacts it.
    pub fn unconfigured(id: impl Into<String>) -> Self {
        Self::build(id, false, ScriptedReply::Fail("unconfigured".into()))
    }

    /// Queue a one-shot reply ahead of the default.
    pub fn then(self, reply: ScriptedReply) -> Self {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(reply);
        }
        self
    }

    /// Sleep this long before answering (uses the tokio clock).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> ScriptedReply {
        self.queued
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn complete(&self, request: CompletionRequest) -> RouterResult<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if !self.configured {
            return Err(RouterError::ProviderUnavailable {
                provider: self.id.clone(),
            });
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.next_reply() {
            ScriptedReply::Content(content) => Ok(CompletionResponse { content }),
            ScriptedReply::Fail(message) => Err(RouterError::provider(&self.id, message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::provider::ResponseFormat;

    fn req() -> CompletionRequest {
        CompletionRequest {
            model: "m".into(),
            system_prompt: None,
            prompt: "p".into(),
            temperature: 0.0,
            max_tokens: 16,
            response_format: ResponseFormat::Text,
        }
    }

    #[tokio::test]
    async fn test_queued_replies_precede_default() {
        let p = ScriptedProvider::replying("s", "steady").then(ScriptedReply::Fail("boom".into()));
        assert!(p.complete(req()).await.is_err());
        assert_eq!(p.complete(req()).await.unwrap().content, "steady");
        assert_eq!(p.calls(), 2);
        assert_eq!(p.requests().len(), 2);
    }
}
