//! Deterministic fallback engine.
//!
//! One pure, offline function per model-backed capability. Each takes the
//! same input the model path receives and returns the same shape, with
//! confidence capped at [`FALLBACK_CONFIDENCE_CAP`] so downstream gates lean
//! toward manual review.

mod pricing;
mod questions;
mod ranking;

pub use pricing::pricing_hint;
pub use questions::evidence_questions;
pub use ranking::rank_candidates;

use crate::synthesis::{deterministic_verdict, SignalSet, SynthesisConfig, SynthesisError, Verdict, VerdictSource};

/// Upper bound on the confidence of any fallback output.
pub const FALLBACK_CONFIDENCE_CAP: f64 = 0.60;

/// Weighted-aggregate verdict with capped confidence.
pub fn synthesize_verdict(
    signals: &SignalSet,
    config: &SynthesisConfig,
) -> Result<Verdict, SynthesisError> {
    deterministic_verdict(
        signals,
        config,
        Some(FALLBACK_CONFIDENCE_CAP),
        VerdictSource::Fallback {
            reason: "deterministic fallback".to_string(),
        },
    )
}
