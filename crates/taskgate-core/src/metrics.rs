//! Global atomic counters for decision-pipeline observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at process shutdown or on a timer).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Atomic counters with no allocation or locking.
pub struct Metrics {
    provider_attempts: AtomicU64,
    provider_failures: AtomicU64,
    cache_hits: AtomicU64,
    fallbacks_used: AtomicU64,
    model_responses_rejected: AtomicU64,
    audit_appends: AtomicU64,
    audit_write_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            provider_attempts: AtomicU64::new(0),
            provider_failures: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            fallbacks_used: AtomicU64::new(0),
            model_responses_rejected: AtomicU64::new(0),
            audit_appends: AtomicU64::new(0),
            audit_write_failures: AtomicU64::new(0),
        }
    }

    /// A provider in a fallback chain was attempted.
    pub fn inc_provider_attempts(&self) {
        self.provider_attempts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "provider_attempts", "counter incremented");
    }

    /// A provider attempt failed (timeout, error, or unavailable).
    pub fn inc_provider_failures(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "provider_failures", "counter incremented");
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cache_hits", "counter incremented");
    }

    /// The deterministic fallback engine produced an output.
    pub fn inc_fallbacks(&self) {
        self.fallbacks_used.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fallbacks_used", "counter incremented");
    }

    /// A model response failed schema validation and was discarded.
    pub fn inc_model_rejections(&self) {
        self.model_responses_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "model_responses_rejected", "counter incremented");
    }

    pub fn inc_audit_appends(&self) {
        self.audit_appends.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "audit_appends", "counter incremented");
    }

    pub fn inc_audit_write_failures(&self) {
        self.audit_write_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "audit_write_failures", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            provider_attempts = self.provider_attempts(),
            provider_failures = self.provider_failures(),
            cache_hits = self.cache_hits(),
            fallbacks_used = self.fallbacks_used(),
            model_responses_rejected = self.model_responses_rejected(),
            audit_appends = self.audit_appends(),
            audit_write_failures = self.audit_write_failures(),
        );
    }

    pub fn provider_attempts(&self) -> u64 {
        self.provider_attempts.load(Ordering::Relaxed)
    }

    pub fn provider_failures(&self) -> u64 {
        self.provider_failures.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn fallbacks_used(&self) -> u64 {
        self.fallbacks_used.load(Ordering::Relaxed)
    }

    pub fn model_responses_rejected(&self) -> u64 {
        self.model_responses_rejected.load(Ordering::Relaxed)
    }

    pub fn audit_appends(&self) -> u64 {
        self.audit_appends.load(Ordering::Relaxed)
    }

    pub fn audit_write_failures(&self) -> u64 {
        self.audit_write_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.provider_attempts.store(0, Ordering::Relaxed);
        self.provider_failures.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.fallbacks_used.store(0, Ordering::Relaxed);
        self.model_responses_rejected.store(0, Ordering::Relaxed);
        self.audit_appends.store(0, Ordering::Relaxed);
        self.audit_write_failures.store(0, Ordering::Relaxed);
    }
}
