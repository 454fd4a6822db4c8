//! Verdict output types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::signals::SignalDomain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictKind {
    Approve,
    ManualReview,
    Reject,
}

impl VerdictKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::ManualReview => "MANUAL_REVIEW",
            Self::Reject => "REJECT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "APPROVE" => Some(Self::Approve),
            "MANUAL_REVIEW" => Some(Self::ManualReview),
            "REJECT" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn recommended_action(self) -> &'static str {
        match self {
            Self::Approve => "proceed: identity checks passed",
            Self::ManualReview => "hold for manual review before granting access",
            Self::Reject => "block the account and escalate to trust and safety",
        }
    }
}

impl std::fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One domain's contribution: its risk and effective (renormalized) weight,
/// or the unavailable sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComponentScore {
    Scored { risk: f64, weight: f64 },
    Unavailable,
}

impl ComponentScore {
    pub fn risk(&self) -> Option<f64> {
        match self {
            Self::Scored { risk, .. } => Some(*risk),
            Self::Unavailable => None,
        }
    }
}

/// Which path produced the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerdictSource {
    /// Weighted aggregator, full confidence range.
    Deterministic,
    /// Schema-validated model synthesis.
    Model {
        provider: String,
        model: String,
        cached: bool,
    },
    /// Weighted aggregator after the model path was skipped or failed;
    /// confidence is capped.
    Fallback { reason: String },
}

impl VerdictSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::Model { .. } => "model",
            Self::Fallback { .. } => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub subject_id: String,
    pub verdict: VerdictKind,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub risk_score: f64,
    pub components: BTreeMap<SignalDomain, ComponentScore>,
    /// A domain's internal check failed ("looks risky").
    pub risk_flags: Vec<String>,
    /// A domain supplied no data ("uncertain").
    pub availability_flags: Vec<String>,
    pub recommended_action: String,
    pub reasoning: String,
    pub source: VerdictSource,
}

impl Verdict {
    /// Risk flags followed by availability flags.
    pub fn flags(&self) -> Vec<String> {
        self.risk_flags
            .iter()
            .chain(self.availability_flags.iter())
            .cloned()
            .collect()
    }

    pub fn available_domains(&self) -> usize {
        self.components
            .values()
            .filter(|c| matches!(c, ComponentScore::Scored { .. }))
            .count()
    }
}
