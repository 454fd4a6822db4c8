//! Model router: abstract routes to interchangeable inference providers.
//!
//! Every call resolves a [`Route`] to a provider and model, consults the
//! read-through cache, and walks the route's fallback chain sequentially until
//! one provider answers within its timeout.

pub mod anthropic;
pub mod cache;
pub mod error;
pub mod json;
pub mod model_router;
pub mod openai;
pub mod provider;
pub mod route;
pub mod scripted;

pub use anthropic::AnthropicProvider;
pub use cache::{cache_key, CachedResponse, MemoryResponseCache, ResponseCache};
pub use error::{RouterError, RouterResult};
pub use json::parse_json_content;
pub use model_router::{
    CallOptions, CallResult, JsonCallResult, ModelRouter, ModelRouterBuilder, RouterSettings,
};
pub use openai::OpenAiProvider;
pub use provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, ProviderCredentials, ResponseFormat,
};
pub use route::{default_bindings, default_fallback_chains, effective_chain, Route, RouteBinding};
pub use scripted::{ScriptedProvider, ScriptedReply};
