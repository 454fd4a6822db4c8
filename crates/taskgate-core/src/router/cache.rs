//! Read-through response cache.
//!
//! The router is the only writer. Concurrent misses on the same key may both
//! reach a provider; the later `set` wins. Entries remember the binding that
//! produced them, which is not necessarily the binding the key was derived
//! from when a fallback answered.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::route::Route;

/// Deterministic cache key: lowercase hex SHA-256 of the JSON encoding of
/// `(system_prompt, prompt, model)`.
pub fn cache_key(system_prompt: Option<&str>, prompt: &str, model: &str) -> String {
    // A tuple of strings always serializes; the fallback keeps the key total.
    let encoded = serde_json::to_vec(&(system_prompt, prompt, model))
        .unwrap_or_else(|_| format!("{system_prompt:?}\u{0}{prompt}\u{0}{model}").into_bytes());
    hex::encode(Sha256::digest(&encoded))
}

/// A cached completion and the route binding that answered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub route: Route,
}

/// Key-value cache with per-entry TTL.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedResponse>;
    async fn set(&self, key: &str, value: CachedResponse, ttl: Duration);
}

struct CacheEntry {
    value: CachedResponse,
    expires_at: Instant,
}

/// In-process cache bounded by entry count.
pub struct MemoryResponseCache {
    store: RwLock<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl MemoryResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl ResponseCache for MemoryResponseCache {
    async fn get(&self, key: &str) -> Option<CachedResponse> {
        {
            let store = self.store.read().await;
            match store.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired
        self.store.write().await.remove(key);
        debug!(key = key, "cache entry expired");
        None
    }

    async fn set(&self, key: &str, value: CachedResponse, ttl: Duration) {
        if self.max_entries == 0 {
            return;
        }
        let now = Instant::now();
        let mut store = self.store.write().await;
        if store.len() >= self.max_entries && !store.contains_key(key) {
            store.retain(|_, entry| entry.expires_at > now);
            if store.len() >= self.max_entries {
                let soonest = store
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(evict) = soonest {
                    store.remove(&evict);
                    debug!(key = %evict, "cache evicted entry");
                }
            }
        }
        store.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(content: &str) -> CachedResponse {
        CachedResponse {
            content: content.to_string(),
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            route: Route::Fast,
        }
    }

    fn content(found: Option<CachedResponse>) -> Option<String> {
        found.map(|r| r.content)
    }

    #[test]
    fn test_cache_key_is_deterministic_and_field_sensitive() {
        let a = cache_key(Some("sys"), "prompt", "gpt-4o");
        assert_eq!(a, cache_key(Some("sys"), "prompt", "gpt-4o"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        assert_ne!(a, cache_key(None, "prompt", "gpt-4o"));
        assert_ne!(a, cache_key(Some("sys"), "prompt", "gpt-4o-mini"));
        // Field boundaries are unambiguous.
        assert_ne!(
            cache_key(Some("ab"), "c", "m"),
            cache_key(Some("a"), "bc", "m")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = MemoryResponseCache::new(8);
        cache.set("k", entry("v"), Duration::from_secs(10)).await;
        assert_eq!(content(cache.get("k").await).as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("k").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_soonest_expiring() {
        let cache = MemoryResponseCache::new(2);
        cache.set("short", entry("1"), Duration::from_secs(5)).await;
        cache.set("long", entry("2"), Duration::from_secs(500)).await;
        cache.set("new", entry("3"), Duration::from_secs(50)).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("short").await, None);
        assert_eq!(content(cache.get("long").await).as_deref(), Some("2"));
        assert_eq!(content(cache.get("new").await).as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_zero_capacity_disables_storage() {
        let cache = MemoryResponseCache::new(0);
        cache.set("k", entry("v"), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, None);
    }
}
