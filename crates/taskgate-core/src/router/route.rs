//! Abstract routes and their static provider bindings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Abstract call purpose, decoupling call sites from a specific vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Primary,
    Fast,
    Reasoning,
    Backup,
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Primary, Route::Fast, Route::Reasoning, Route::Backup];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fast => "fast",
            Self::Reasoning => "reasoning",
            Self::Backup => "backup",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown route: {s}"))
    }
}

/// Provider id + model id a route resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteBinding {
    pub provider: String,
    pub model: String,
}

impl RouteBinding {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// Default route bindings.
pub fn default_bindings() -> BTreeMap<Route, RouteBinding> {
    BTreeMap::from([
        (Route::Primary, RouteBinding::new("openai", "gpt-4o")),
        (Route::Fast, RouteBinding::new("openai", "gpt-4o-mini")),
        (
            Route::Reasoning,
            RouteBinding::new("anthropic", "claude-3-5-sonnet-latest"),
        ),
        (
            Route::Backup,
            RouteBinding::new("anthropic", "claude-3-5-haiku-latest"),
        ),
    ])
}

/// Default per-route fallback chains.
pub fn default_fallback_chains() -> BTreeMap<Route, Vec<Route>> {
    BTreeMap::from([
        (Route::Primary, vec![Route::Backup, Route::Fast]),
        (Route::Fast, vec![Route::Primary, Route::Backup]),
        (Route::Reasoning, vec![Route::Primary, Route::Backup]),
        (Route::Backup, vec![Route::Fast]),
    ])
}

/// The routes attempted for `route`, in order: the route itself, then each
/// chain entry once. The originating route never reappears in the chain.
pub fn effective_chain(route: Route, chain: &[Route]) -> Vec<Route> {
    let mut out = vec![route];
    for entry in chain {
        if !out.contains(entry) {
            out.push(*entry);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_from_str_round_trip() {
        for route in Route::ALL {
            assert_eq!(route.as_str().parse::<Route>().unwrap(), route);
        }
        assert!("turbo".parse::<Route>().is_err());
    }

    #[test]
    fn test_effective_chain_drops_origin_and_duplicates() {
        let chain = effective_chain(
            Route::Primary,
            &[Route::Backup, Route::Primary, Route::Fast, Route::Backup],
        );
        assert_eq!(chain, vec![Route::Primary, Route::Backup, Route::Fast]);
    }

    #[test]
    fn test_default_chains_never_contain_their_route() {
        for (route, chain) in default_fallback_chains() {
            assert!(!chain.contains(&route), "{route} chain contains itself");
        }
    }

    #[test]
    fn test_every_route_has_default_binding() {
        let bindings = default_bindings();
        for route in Route::ALL {
            assert!(bindings.contains_key(&route));
        }
    }
}
