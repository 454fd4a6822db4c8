//! Deterministic proposal validation.
//!
//! A [`ValidatorProfile`] is the per-domain rule set. [`evaluate`] applies it
//! without side effects; [`ProposalValidator::validate`] also appends the
//! audit record. Validation failure is a value, never an error.

mod engine;
mod rules;

pub use engine::{evaluate, ProposalValidationFailed, ProposalValidator, ValidationResult};
pub use rules::{get_path, set_path, ClassBand, Correction, ValidationRule, Violation};

use serde::{Deserialize, Serialize};

use crate::domain::PricingBounds;

/// Named rule set for one decision domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorProfile {
    pub domain: String,
    pub rules: Vec<ValidationRule>,
}

impl ValidatorProfile {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Price hints: tier derived from price, price within bounds, fee within
    /// tolerance of the platform rate, confidence floor, rationale length.
    pub fn pricing(bounds: &PricingBounds) -> Self {
        Self::new("pricing")
            .with_rule(ValidationRule::Classification {
                field: "price_tier".into(),
                source: "price_cents".into(),
                bands: vec![
                    ClassBand::below("budget", bounds.budget_below_cents as f64),
                    ClassBand::below("standard", bounds.standard_below_cents as f64),
                    ClassBand::rest("premium"),
                ],
            })
            .with_rule(ValidationRule::Range {
                field: "price_cents".into(),
                min: Some(bounds.min_price_cents as f64),
                max: Some(bounds.max_price_cents as f64),
            })
            .with_rule(ValidationRule::Range {
                field: "platform_fee_cents".into(),
                min: Some(0.0),
                max: None,
            })
            .with_rule(ValidationRule::Tolerance {
                field: "platform_fee_cents".into(),
                source: "price_cents".into(),
                factor: bounds.platform_fee_rate,
                tolerance_pct: bounds.fee_tolerance_pct,
            })
            .with_rule(ValidationRule::MinConfidence {
                min: bounds.min_confidence,
            })
            .with_rule(ValidationRule::MinRationale {
                min_chars: bounds.min_rationale_chars,
            })
    }

    /// Confidence floor and rationale length only, for domains whose payload
    /// shape is enforced by its type.
    pub fn advisory(domain: impl Into<String>, min_confidence: f64, min_rationale_chars: usize) -> Self {
        Self::new(domain)
            .with_rule(ValidationRule::MinConfidence {
                min: min_confidence,
            })
            .with_rule(ValidationRule::MinRationale {
                min_chars: min_rationale_chars,
            })
    }
}
