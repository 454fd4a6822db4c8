//! Non-binding proposals produced by a model or by the deterministic fallback.

use serde::{Deserialize, Serialize};

/// Clamp a confidence value into `[0, 1]`. Non-finite input becomes `0.0`.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Where a proposal came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposalSource {
    Model {
        provider: String,
        model: String,
        cached: bool,
    },
    Deterministic,
}

impl ProposalSource {
    pub fn is_model(&self) -> bool {
        matches!(self, Self::Model { .. })
    }
}

/// A structured suggestion that must pass a deterministic check before it
/// may affect system state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal<P> {
    pub payload: P,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub reasoning: String,
    pub source: ProposalSource,
}

impl<P> Proposal<P> {
    pub fn new(
        payload: P,
        confidence: f64,
        reasoning: impl Into<String>,
        source: ProposalSource,
    ) -> Self {
        Self {
            payload,
            confidence: clamp_confidence(confidence),
            reasoning: reasoning.into(),
            source,
        }
    }

    /// Proposal produced by the offline fallback engine.
    pub fn deterministic(payload: P, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self::new(payload, confidence, reasoning, ProposalSource::Deterministic)
    }

    /// Replace the payload, keeping confidence, reasoning, and source.
    pub fn map<Q>(self, f: impl FnOnce(P) -> Q) -> Proposal<Q> {
        Proposal {
            payload: f(self.payload),
            confidence: self.confidence,
            reasoning: self.reasoning,
            source: self.source,
        }
    }
}

impl<P: Serialize> Proposal<P> {
    /// Convert into the JSON form the validator operates on.
    pub fn to_json(&self) -> serde_json::Result<Proposal<serde_json::Value>> {
        Ok(Proposal {
            payload: serde_json::to_value(&self.payload)?,
            confidence: self.confidence,
            reasoning: self.reasoning.clone(),
            source: self.source.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(clamp_confidence(1.4), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(f64::INFINITY), 0.0);
        assert_eq!(clamp_confidence(0.42), 0.42);

        let p = Proposal::deterministic((), 3.0, "x");
        assert_eq!(p.confidence, 1.0);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let p = Proposal::deterministic(2_i64, 0.5, "because").map(|v| v * 10);
        assert_eq!(p.payload, 20);
        assert_eq!(p.reasoning, "because");
        assert_eq!(p.source, ProposalSource::Deterministic);
    }
}
