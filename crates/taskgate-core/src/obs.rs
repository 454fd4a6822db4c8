//! Structured observability hooks for decision-pipeline events.
//!
//! This module provides:
//! - Decision-scoped tracing spans via the `DecisionSpan` RAII guard
//! - One emission function per lifecycle event, each with a stable `event` name
//!
//! Events are emitted at `info!` level except failures, which are `warn!`.
//! Filter with `RUST_LOG`; pass `--json` to the CLI for JSON output.

use tracing::{debug, info, warn};

/// RAII guard that enters a decision-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = DecisionSpan::enter("pricing", "task-123");
/// // all tracing calls are now tagged with domain and subject_id
/// ```
pub struct DecisionSpan {
    _span: tracing::span::EnteredSpan,
}

impl DecisionSpan {
    /// Create and enter a span tagged with the decision domain and subject.
    pub fn enter(domain: &str, subject_id: &str) -> Self {
        Self {
            _span: decision_span(domain, subject_id).entered(),
        }
    }
}

/// Decision-scoped span for async work; attach with `tracing::Instrument`.
pub fn decision_span(domain: &str, subject_id: &str) -> tracing::Span {
    tracing::info_span!("taskgate.decision", domain = %domain, subject_id = %subject_id)
}

/// Emit event: a router call completed successfully.
pub fn emit_call_completed(route: &str, provider: &str, model: &str, latency_ms: u64, cached: bool) {
    info!(
        event = "router.call_completed",
        route = %route,
        provider = %provider,
        model = %model,
        latency_ms = latency_ms,
        cached = cached,
    );
}

/// Emit event: a read-through cache hit, no provider contacted.
pub fn emit_cache_hit(route: &str, key: &str) {
    debug!(event = "router.cache_hit", route = %route, key = %key);
}

/// Emit event: one provider attempt failed; the chain continues.
pub fn emit_attempt_failed(route: &str, provider: &str, error: &dyn std::fmt::Display) {
    warn!(event = "router.attempt_failed", route = %route, provider = %provider, error = %error);
}

/// Emit event: the deterministic fallback produced the output for a capability.
pub fn emit_fallback_invoked(capability: &str, reason: &str) {
    info!(event = "fallback.invoked", capability = %capability, reason = %reason);
}

/// Emit event: a model response was discarded after schema validation.
pub fn emit_model_response_rejected(capability: &str, violations: &[String]) {
    warn!(
        event = "model.response_rejected",
        capability = %capability,
        violations = %violations.join("; "),
    );
}

/// Emit event: a proposal was checked by the deterministic validator.
pub fn emit_proposal_validated(domain: &str, valid: bool, violations: usize, corrections: usize) {
    info!(
        event = "proposal.validated",
        domain = %domain,
        valid = valid,
        violations = violations,
        corrections = corrections,
    );
}

/// Emit event: a verdict was synthesized from signal domains.
pub fn emit_verdict_synthesized(verdict: &str, risk_score: f64, available_domains: usize, source: &str) {
    info!(
        event = "verdict.synthesized",
        verdict = %verdict,
        risk_score = risk_score,
        available_domains = available_domains,
        source = %source,
    );
}

/// Emit event: an audit record was persisted.
pub fn emit_audit_appended(audit_id: &str, domain: &str) {
    debug!(event = "audit.appended", audit_id = %audit_id, domain = %domain);
}

/// Emit event: an audit write failed (warning level). The decision is unaffected.
pub fn emit_audit_write_failed(audit_id: &str, domain: &str, error: &dyn std::fmt::Display) {
    warn!(event = "audit.write_failed", audit_id = %audit_id, domain = %domain, error = %error);
}

/// Emit event: a decision payload could not be encoded for its audit record.
pub fn emit_audit_payload_unserializable(
    domain: &str,
    subject_id: &str,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event = "audit.payload_unserializable",
        domain = %domain,
        subject_id = %subject_id,
        error = %error
    );
}
