//! Error types for the model router.

/// Errors produced by inference providers and the router.
///
/// `ProviderUnavailable`, `ProviderTimeout`, and `ProviderError` describe a
/// single attempt and are consumed inside the fallback walk. Callers of
/// `ModelRouter::call` only ever see `AllProvidersFailed` (or
/// `ResponseNotJson` from `call_json`).
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    #[error("provider {provider} has no credentials configured")]
    ProviderUnavailable { provider: String },

    #[error("provider {provider} timed out after {timeout_ms}ms")]
    ProviderTimeout { provider: String, timeout_ms: u64 },

    #[error("provider {provider} failed: {message}")]
    ProviderError { provider: String, message: String },

    #[error("all {attempts} provider(s) failed for route {route}; last error: {last}")]
    AllProvidersFailed {
        route: String,
        attempts: usize,
        #[source]
        last: Box<RouterError>,
    },

    #[error("response is not JSON: {snippet}")]
    ResponseNotJson { snippet: String },
}

/// Result type for router operations.
pub type RouterResult<T> = std::result::Result<T, RouterError>;

impl RouterError {
    /// Build a `ProviderError` from any displayable failure.
    pub fn provider(provider: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ProviderError {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// The last attempt's error when this is `AllProvidersFailed`.
    pub fn last_attempt(&self) -> Option<&RouterError> {
        match self {
            Self::AllProvidersFailed { last, .. } => Some(last),
            _ => None,
        }
    }
}
