//! Pipeline configuration loaded from TOML.
//!
//! Every section and field has a default, so an empty file (or no file) is a
//! valid configuration. Provider credentials are never read from here; see
//! [`crate::router::ProviderCredentials::from_env`].

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::PricingBounds;
use crate::router::{
    default_bindings, default_fallback_chains, Route, RouteBinding, RouterSettings,
};
use crate::synthesis::SynthesisConfig;

/// Maximum accepted config file size in bytes.
const MAX_CONFIG_FILE_SIZE: u64 = 256 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Router section: defaults plus overrides of the static route tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub default_temperature: f32,
    pub default_max_tokens: u32,
    pub default_timeout_ms: u64,
    /// Route name → binding. Routes not listed keep their default binding.
    pub routes: BTreeMap<String, RouteBinding>,
    /// Route name → ordered fallback routes. Routes not listed keep their
    /// default chain.
    pub fallback_chains: BTreeMap<String, Vec<Route>>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            cache_max_entries: 1024,
            default_temperature: 0.2,
            default_max_tokens: 1024,
            default_timeout_ms: 15_000,
            routes: BTreeMap::new(),
            fallback_chains: BTreeMap::new(),
        }
    }
}

fn parse_route(name: &str) -> Result<Route, ConfigError> {
    name.parse::<Route>().map_err(ConfigError::Invalid)
}

impl RouterConfig {
    pub fn settings(&self) -> RouterSettings {
        RouterSettings {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            default_temperature: self.default_temperature,
            default_max_tokens: self.default_max_tokens,
            default_timeout: Duration::from_millis(self.default_timeout_ms),
        }
    }

    /// Default bindings overlaid with configured ones.
    pub fn resolved_bindings(&self) -> Result<BTreeMap<Route, RouteBinding>, ConfigError> {
        let mut bindings = default_bindings();
        for (name, binding) in &self.routes {
            bindings.insert(parse_route(name)?, binding.clone());
        }
        Ok(bindings)
    }

    /// Default chains overlaid with configured ones.
    pub fn resolved_fallback_chains(&self) -> Result<BTreeMap<Route, Vec<Route>>, ConfigError> {
        let mut chains = default_fallback_chains();
        for (name, chain) in &self.fallback_chains {
            chains.insert(parse_route(name)?, chain.clone());
        }
        Ok(chains)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "router.default_timeout_ms must be positive".to_string(),
            ));
        }
        if !self.default_temperature.is_finite() || self.default_temperature < 0.0 {
            return Err(ConfigError::Invalid(
                "router.default_temperature must be a non-negative number".to_string(),
            ));
        }
        let bindings = self.resolved_bindings()?;
        for (route, binding) in &bindings {
            if binding.provider.trim().is_empty() || binding.model.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "route {route} needs both provider and model"
                )));
            }
        }
        for (route, chain) in self.resolved_fallback_chains()? {
            if let Some(missing) = chain.iter().find(|r| !bindings.contains_key(r)) {
                return Err(ConfigError::Invalid(format!(
                    "fallback chain for {route} references unbound route {missing}"
                )));
            }
        }
        Ok(())
    }
}

/// Floors for advisory domains (ranking, evidence questions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryBounds {
    pub min_confidence: f64,
    pub min_rationale_chars: usize,
}

impl Default for AdvisoryBounds {
    fn default() -> Self {
        Self {
            min_confidence: 0.40,
            min_rationale_chars: 10,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub router: RouterConfig,
    pub synthesis: SynthesisConfig,
    pub pricing: PricingBounds,
    pub advisory: AdvisoryBounds,
}

impl PipelineConfig {
    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        let size = std::fs::metadata(path).map_err(io_err)?.len();
        if size > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "config file exceeds {MAX_CONFIG_FILE_SIZE} bytes"
            )));
        }
        let content = std::fs::read_to_string(path).map_err(io_err)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.router.validate()?;
        self.synthesis
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;

        let p = &self.pricing;
        if p.min_price_cents < 0 || p.min_price_cents > p.max_price_cents {
            return Err(ConfigError::Invalid(format!(
                "pricing bounds are inverted: min {} > max {}",
                p.min_price_cents, p.max_price_cents
            )));
        }
        if p.budget_below_cents > p.standard_below_cents {
            return Err(ConfigError::Invalid(
                "pricing.budget_below_cents exceeds standard_below_cents".to_string(),
            ));
        }
        let fee_rate_ok = (0.0..1.0).contains(&p.platform_fee_rate);
        let tolerance_ok = p.fee_tolerance_pct >= 0.0;
        if !fee_rate_ok || !tolerance_ok {
            return Err(ConfigError::Invalid(
                "pricing fee rate must be within [0, 1) and tolerance non-negative".to_string(),
            ));
        }
        for (name, floor) in [
            ("pricing.min_confidence", p.min_confidence),
            ("advisory.min_confidence", self.advisory.min_confidence),
        ] {
            if !(0.0..=1.0).contains(&floor) {
                return Err(ConfigError::Invalid(format!("{name} must lie within [0, 1]")));
            }
        }
        Ok(())
    }
}
