//! Route resolution, caching, timeouts, and the sequential fallback walk.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::anthropic::AnthropicProvider;
use super::cache::{cache_key, CachedResponse, MemoryResponseCache, ResponseCache};
use super::error::{RouterError, RouterResult};
use super::json::parse_json_content;
use super::openai::OpenAiProvider;
use super::provider::{
    CompletionProvider, CompletionRequest, ProviderCredentials, ResponseFormat,
};
use super::route::{
    default_bindings, default_fallback_chains, effective_chain, Route, RouteBinding,
};
use crate::config::{ConfigError, RouterConfig};
use crate::metrics::METRICS;
use crate::obs;

/// Options for a single router call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    pub route: Route,
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// `None` uses the router default.
    pub temperature: Option<f32>,
    /// `None` uses the router default.
    pub max_tokens: Option<u32>,
    pub response_format: ResponseFormat,
    /// Per-attempt timeout; `None` uses the router default.
    pub timeout: Option<Duration>,
    pub use_cache: bool,
    /// Replaces the route's configured chain for this call.
    pub fallback_chain: Option<Vec<Route>>,
}

impl CallOptions {
    pub fn new(route: Route, prompt: impl Into<String>) -> Self {
        Self {
            route,
            prompt: prompt.into(),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
            response_format: ResponseFormat::Text,
            timeout: None,
            use_cache: true,
            fallback_chain: None,
        }
    }

    pub fn system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn no_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn fallback_chain(mut self, chain: Vec<Route>) -> Self {
        self.fallback_chain = Some(chain);
        self
    }
}

/// Outcome of a successful call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallResult {
    pub content: String,
    pub provider: String,
    pub model: String,
    /// The route that produced the content, also on a cache hit.
    pub route: Route,
    pub cached: bool,
    pub latency_ms: u64,
}

/// Outcome of `call_json`: the parsed object plus the call metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonCallResult {
    pub data: Value,
    #[serde(flatten)]
    pub call: CallResult,
}

/// Router-wide defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterSettings {
    pub cache_ttl: Duration,
    pub default_temperature: f32,
    pub default_max_tokens: u32,
    pub default_timeout: Duration,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            default_temperature: 0.2,
            default_max_tokens: 1024,
            default_timeout: Duration::from_millis(15_000),
        }
    }
}

/// Maps abstract routes to injected providers.
///
/// Constructed explicitly; there is no process-wide client state.
pub struct ModelRouter {
    providers: HashMap<String, Arc<dyn CompletionProvider>>,
    bindings: BTreeMap<Route, RouteBinding>,
    chains: BTreeMap<Route, Vec<Route>>,
    cache: Arc<dyn ResponseCache>,
    settings: RouterSettings,
}

impl ModelRouter {
    pub fn builder() -> ModelRouterBuilder {
        ModelRouterBuilder::default()
    }

    /// Build the production router: OpenAI and Anthropic clients from
    /// `credentials`, bindings and chains from `config`.
    pub fn from_config(
        config: &RouterConfig,
        credentials: ProviderCredentials,
    ) -> Result<Self, ConfigError> {
        let openai = OpenAiProvider::new(credentials.openai_api_key, credentials.openai_base_url);
        let anthropic =
            AnthropicProvider::new(credentials.anthropic_api_key, credentials.anthropic_base_url);

        let mut builder = Self::builder()
            .provider(Arc::new(openai))
            .provider(Arc::new(anthropic))
            .cache(Arc::new(MemoryResponseCache::new(config.cache_max_entries)))
            .settings(config.settings());
        for (route, binding) in config.resolved_bindings()? {
            builder = builder.bind(route, binding);
        }
        for (route, chain) in config.resolved_fallback_chains()? {
            builder = builder.fallback_chain(route, chain);
        }
        Ok(builder.build())
    }

    /// True iff at least one registered provider holds credentials.
    pub fn is_configured(&self) -> bool {
        self.providers.values().any(|p| p.is_configured())
    }

    /// True iff `route` is bound to a registered, configured provider.
    pub fn is_route_configured(&self, route: Route) -> bool {
        self.bindings
            .get(&route)
            .and_then(|b| self.providers.get(&b.provider))
            .is_some_and(|p| p.is_configured())
    }

    pub fn bindings(&self) -> &BTreeMap<Route, RouteBinding> {
        &self.bindings
    }

    /// The configured fallback chain for `route` (without the route itself).
    pub fn chain_for(&self, route: Route) -> &[Route] {
        self.chains.get(&route).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Execute a call with caching and the ordered fallback walk.
    ///
    /// Each chain entry is attempted at most once, sequentially, each within
    /// its own timeout. Only exhaustion of the whole chain is an error.
    pub async fn call(&self, options: CallOptions) -> RouterResult<CallResult> {
        let started = Instant::now();
        let origin = self.bindings.get(&options.route).cloned();

        let key = match (&origin, options.use_cache) {
            (Some(binding), true) => Some(cache_key(
                options.system_prompt.as_deref(),
                &options.prompt,
                &binding.model,
            )),
            _ => None,
        };

        if let Some(key) = &key {
            if let Some(hit) = self.cache.get(key).await {
                METRICS.inc_cache_hits();
                obs::emit_cache_hit(options.route.as_str(), key);
                let result = CallResult {
                    content: hit.content,
                    provider: hit.provider,
                    model: hit.model,
                    route: hit.route,
                    cached: true,
                    latency_ms: started.elapsed().as_millis() as u64,
                };
                obs::emit_call_completed(
                    options.route.as_str(),
                    &result.provider,
                    &result.model,
                    result.latency_ms,
                    true,
                );
                return Ok(result);
            }
        }

        let configured_chain = options
            .fallback_chain
            .as_deref()
            .unwrap_or_else(|| self.chain_for(options.route));
        let chain = effective_chain(options.route, configured_chain);

        let mut last_error = None;
        let mut attempts = 0;
        for route in chain {
            attempts += 1;
            METRICS.inc_provider_attempts();
            match self.attempt(route, &options).await {
                Ok((content, binding)) => {
                    if let Some(key) = &key {
                        let entry = CachedResponse {
                            content: content.clone(),
                            provider: binding.provider.clone(),
                            model: binding.model.clone(),
                            route,
                        };
                        self.cache.set(key, entry, self.settings.cache_ttl).await;
                    }
                    let result = CallResult {
                        content,
                        provider: binding.provider,
                        model: binding.model,
                        route,
                        cached: false,
                        latency_ms: started.elapsed().as_millis() as u64,
                    };
                    obs::emit_call_completed(
                        options.route.as_str(),
                        &result.provider,
                        &result.model,
                        result.latency_ms,
                        false,
                    );
                    return Ok(result);
                }
                Err(err) => {
                    METRICS.inc_provider_failures();
                    let provider = match &err {
                        RouterError::ProviderUnavailable { provider }
                        | RouterError::ProviderTimeout { provider, .. }
                        | RouterError::ProviderError { provider, .. } => provider.clone(),
                        _ => String::from("unknown"),
                    };
                    obs::emit_attempt_failed(route.as_str(), &provider, &err);
                    last_error = Some(err);
                }
            }
        }

        Err(RouterError::AllProvidersFailed {
            route: options.route.to_string(),
            attempts,
            last: Box::new(last_error.unwrap_or_else(|| RouterError::ProviderUnavailable {
                provider: String::from("none"),
            })),
        })
    }

    /// `call` with JSON response format, then lenient JSON parsing.
    pub async fn call_json(&self, options: CallOptions) -> RouterResult<JsonCallResult> {
        let call = self.call(options.json()).await?;
        let data = parse_json_content(&call.content)?;
        Ok(JsonCallResult { data, call })
    }

    /// One provider attempt for `route`. Unbound routes and unconfigured
    /// providers fail without contacting anything.
    async fn attempt(
        &self,
        route: Route,
        options: &CallOptions,
    ) -> RouterResult<(String, RouteBinding)> {
        let binding = self
            .bindings
            .get(&route)
            .ok_or_else(|| RouterError::ProviderUnavailable {
                provider: format!("unbound route {route}"),
            })?;
        let provider = self
            .providers
            .get(&binding.provider)
            .filter(|p| p.is_configured())
            .ok_or_else(|| RouterError::ProviderUnavailable {
                provider: binding.provider.clone(),
            })?;

        let request = CompletionRequest {
            model: binding.model.clone(),
            system_prompt: options.system_prompt.clone(),
            prompt: options.prompt.clone(),
            temperature: options
                .temperature
                .unwrap_or(self.settings.default_temperature),
            max_tokens: options
                .max_tokens
                .unwrap_or(self.settings.default_max_tokens),
            response_format: options.response_format,
        };
        let timeout = options.timeout.unwrap_or(self.settings.default_timeout);

        debug!(route = %route, provider = %binding.provider, model = %binding.model, "provider attempt");

        match tokio::time::timeout(timeout, provider.complete(request)).await {
            Ok(Ok(response)) => Ok((response.content, binding.clone())),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(RouterError::ProviderTimeout {
                provider: binding.provider.clone(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

/// Builder for [`ModelRouter`]. Starts from the default bindings and chains,
/// an in-memory cache, and no providers.
pub struct ModelRouterBuilder {
    providers: HashMap<String, Arc<dyn CompletionProvider>>,
    bindings: BTreeMap<Route, RouteBinding>,
    chains: BTreeMap<Route, Vec<Route>>,
    cache: Option<Arc<dyn ResponseCache>>,
    settings: RouterSettings,
}

impl Default for ModelRouterBuilder {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            bindings: default_bindings(),
            chains: default_fallback_chains(),
            cache: None,
            settings: RouterSettings::default(),
        }
    }
}

impl ModelRouterBuilder {
    /// Register a provider under its `id()`. A later registration with the
    /// same id replaces the earlier one.
    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.providers.insert(provider.id().to_string(), provider);
        self
    }

    pub fn bind(mut self, route: Route, binding: RouteBinding) -> Self {
        self.bindings.insert(route, binding);
        self
    }

    pub fn fallback_chain(mut self, route: Route, chain: Vec<Route>) -> Self {
        self.chains.insert(route, chain);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn settings(mut self, settings: RouterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> ModelRouter {
        ModelRouter {
            providers: self.providers,
            bindings: self.bindings,
            chains: self.chains,
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(MemoryResponseCache::new(1024))),
            settings: self.settings,
        }
    }
}
