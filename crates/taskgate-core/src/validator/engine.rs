//! Rule evaluation and the audited validator.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taskgate_store::{AuditId, AuditRecord, AuthorityLevel, SubjectRef};

use super::rules::{classify, get_path, number_at, set_path, Correction, ValidationRule, Violation};
use super::ValidatorProfile;
use crate::audit::DecisionAuditLog;
use crate::domain::Proposal;
use crate::obs;

const AGENT: &str = "proposal_validator";

/// Outcome of validating one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub domain: String,
    pub valid: bool,
    /// Hard failures in rule order.
    pub violations: Vec<Violation>,
    pub corrections: Vec<Correction>,
    /// The proposal after auto-correction; `None` when nothing was corrected.
    pub corrected: Option<Proposal<Value>>,
}

/// Returned, never raised, when a proposal fails deterministic validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalValidationFailed {
    pub domain: String,
    pub violations: Vec<Violation>,
}

impl std::fmt::Display for ProposalValidationFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let codes: Vec<&str> = self.violations.iter().map(|v| v.code.as_str()).collect();
        write!(f, "{} proposal failed validation: {}", self.domain, codes.join(", "))
    }
}

impl ValidationResult {
    /// The proposal to apply (corrected if needed), or the failure to branch on.
    pub fn accepted_proposal(
        &self,
        original: &Proposal<Value>,
    ) -> Result<Proposal<Value>, ProposalValidationFailed> {
        if self.valid {
            Ok(self.corrected.clone().unwrap_or_else(|| original.clone()))
        } else {
            Err(ProposalValidationFailed {
                domain: self.domain.clone(),
                violations: self.violations.clone(),
            })
        }
    }

    pub fn violation_codes(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.code.as_str()).collect()
    }
}

/// Apply a profile's rules. Pure: no audit, no state.
///
/// Classification rules run first and correct the payload; every other rule
/// then sees the corrected payload. Violations are reported in rule order
/// regardless of which pass found them.
pub fn evaluate(profile: &ValidatorProfile, proposal: &Proposal<Value>) -> ValidationResult {
    let mut payload = proposal.payload.clone();
    let mut violations: Vec<(usize, Violation)> = Vec::new();
    let mut corrections = Vec::new();

    for (index, rule) in profile.rules.iter().enumerate() {
        let mut found: Vec<Violation> = Vec::new();
        if let ValidationRule::Classification {
            field,
            source,
            bands,
        } = rule
        {
            match number_at(&payload, source) {
                Ok(value) => match classify(bands, value) {
                    Some(label) => {
                        let current = get_path(&payload, field).cloned().unwrap_or(Value::Null);
                        if current.as_str() != Some(label) {
                            let to = Value::String(label.to_string());
                            if set_path(&mut payload, field, to.clone()) {
                                corrections.push(Correction {
                                    field: field.clone(),
                                    from: current,
                                    to,
                                });
                            } else {
                                found.push(Violation::new(
                                    "uncorrectable",
                                    Some(field.as_str()),
                                    format!("{field} cannot be set on this payload"),
                                ));
                            }
                        }
                    }
                    None => found.push(Violation::new(
                        "unclassifiable",
                        Some(source.as_str()),
                        format!("{source} = {value} matches no band for {field}"),
                    )),
                },
                Err(v) => found.push(v),
            }
        }
        violations.extend(found.into_iter().map(|v| (index, v)));
    }

    for (index, rule) in profile.rules.iter().enumerate() {
        if !rule.is_classification() {
            let mut found: Vec<Violation> = Vec::new();
            check_rule(rule, &payload, proposal, &mut found);
            violations.extend(found.into_iter().map(|v| (index, v)));
        }
    }
    // Stable: violations of one rule keep their relative order.
    violations.sort_by_key(|(index, _)| *index);
    let violations: Vec<Violation> = violations.into_iter().map(|(_, v)| v).collect();

    let corrected = (!corrections.is_empty()).then(|| Proposal {
        payload,
        confidence: proposal.confidence,
        reasoning: proposal.reasoning.clone(),
        source: proposal.source.clone(),
    });

    ValidationResult {
        domain: profile.domain.clone(),
        valid: violations.is_empty(),
        violations,
        corrections,
        corrected,
    }
}

fn check_rule(
    rule: &ValidationRule,
    payload: &Value,
    proposal: &Proposal<Value>,
    violations: &mut Vec<Violation>,
) {
    match rule {
        ValidationRule::Range { field, min, max } => match number_at(payload, field) {
            Ok(value) => {
                if let Some(min) = min.filter(|m| value < *m) {
                    violations.push(Violation::new(
                        "below_min",
                        Some(field.as_str()),
                        format!("{field} = {value} is below the minimum {min}"),
                    ));
                }
                if let Some(max) = max.filter(|m| value > *m) {
                    violations.push(Violation::new(
                        "above_max",
                        Some(field.as_str()),
                        format!("{field} = {value} exceeds the maximum {max}"),
                    ));
                }
            }
            Err(v) => violations.push(v),
        },
        ValidationRule::Tolerance {
            field,
            source,
            factor,
            tolerance_pct,
        } => match (number_at(payload, field), number_at(payload, source)) {
            (Ok(value), Ok(base)) => {
                let expected = base * factor;
                let allowed = expected.abs() * tolerance_pct / 100.0;
                if (value - expected).abs() > allowed {
                    violations.push(Violation::new(
                        "tolerance_exceeded",
                        Some(field.as_str()),
                        format!(
                            "{field} = {value} deviates from {expected:.2} ({source} x {factor}) by more than {tolerance_pct}%"
                        ),
                    ));
                }
            }
            (Err(v), _) | (_, Err(v)) => violations.push(v),
        },
        ValidationRule::MinConfidence { min } => {
            if proposal.confidence.is_nan() || proposal.confidence < *min {
                violations.push(Violation::new(
                    "low_confidence",
                    None,
                    format!(
                        "confidence {:.2} is below the required {:.2}; escalate for review",
                        proposal.confidence, min
                    ),
                ));
            }
        }
        ValidationRule::MinRationale { min_chars } => {
            let len = proposal.reasoning.trim().chars().count();
            if len < *min_chars {
                violations.push(Violation::new(
                    "rationale_too_short",
                    None,
                    format!("reasoning has {len} characters, at least {min_chars} required"),
                ));
            }
        }
        // Applied in the correction pass.
        ValidationRule::Classification { .. } => {}
    }
}

/// Validator for one domain that records every outcome in the audit log.
#[derive(Clone)]
pub struct ProposalValidator {
    profile: ValidatorProfile,
    audit: DecisionAuditLog,
    agent: &'static str,
}

impl ProposalValidator {
    pub fn new(profile: ValidatorProfile, audit: DecisionAuditLog) -> Self {
        Self {
            profile,
            audit,
            agent: AGENT,
        }
    }

    /// Attribute audit records to `agent` instead of the validator itself.
    pub fn with_agent(mut self, agent: &'static str) -> Self {
        self.agent = agent;
        self
    }

    pub fn profile(&self) -> &ValidatorProfile {
        &self.profile
    }

    /// Evaluate and append exactly one audit record. Never mutates domain
    /// state: the caller applies or discards the (possibly corrected) proposal.
    pub fn validate(&self, subject: SubjectRef, proposal: &Proposal<Value>) -> ValidationResult {
        self.validate_recorded(subject, proposal).0
    }

    /// `validate` for a typed proposal.
    pub fn validate_typed<P: Serialize>(
        &self,
        subject: SubjectRef,
        proposal: &Proposal<P>,
    ) -> ValidationResult {
        self.validate_recorded(subject, proposal).0
    }

    /// `validate_typed`, also returning the id of the audit record.
    ///
    /// A payload that cannot be encoded as JSON is invalid and still audited.
    pub fn validate_recorded<P: Serialize>(
        &self,
        subject: SubjectRef,
        proposal: &Proposal<P>,
    ) -> (ValidationResult, AuditId) {
        let (json_proposal, result) = match proposal.to_json() {
            Ok(json_proposal) => {
                let result = evaluate(&self.profile, &json_proposal);
                (json_proposal, result)
            }
            Err(err) => {
                let placeholder = Proposal {
                    payload: Value::Null,
                    confidence: proposal.confidence,
                    reasoning: proposal.reasoning.clone(),
                    source: proposal.source.clone(),
                };
                let result = ValidationResult {
                    domain: self.profile.domain.clone(),
                    valid: false,
                    violations: vec![Violation::new(
                        "unserializable",
                        None,
                        format!("payload could not be encoded: {err}"),
                    )],
                    corrections: Vec::new(),
                    corrected: None,
                };
                (placeholder, result)
            }
        };
        obs::emit_proposal_validated(
            &self.profile.domain,
            result.valid,
            result.violations.len(),
            result.corrections.len(),
        );
        let audit_id = self.record(subject, &json_proposal, &result);
        (result, audit_id)
    }

    fn record(
        &self,
        subject: SubjectRef,
        proposal: &Proposal<Value>,
        result: &ValidationResult,
    ) -> AuditId {
        self.audit.append(AuditRecord::decision(
            self.agent,
            self.profile.domain.clone(),
            subject,
            json!({
                "proposal": proposal,
                "violations": result.violations,
                "corrections": result.corrections,
            }),
            Some(proposal.confidence),
            proposal.reasoning.clone(),
            Some(result.valid),
            AuthorityLevel::DeterministicGate,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricingBounds;

    fn pricing(payload: Value, confidence: f64, reasoning: &str) -> Proposal<Value> {
        Proposal::deterministic(payload, confidence, reasoning)
    }

    #[test]
    fn test_price_above_max_is_not_corrected() {
        let profile = ValidatorProfile::pricing(&PricingBounds::default());
        let result = evaluate(
            &profile,
            &pricing(
                json!({"price_cents": 100_000, "platform_fee_cents": 15_000, "price_tier": "premium"}),
                0.9,
                "large multi-day renovation job",
            ),
        );
        assert!(!result.valid);
        assert_eq!(result.violation_codes(), vec!["above_max"]);
        assert!(result.corrections.is_empty());
        assert!(result.corrected.is_none());
    }

    #[test]
    fn test_tier_mismatch_is_corrected_then_passes() {
        let profile = ValidatorProfile::pricing(&PricingBounds::default());
        let proposal = pricing(
            json!({"price_cents": 12_000, "platform_fee_cents": 1_800, "price_tier": "budget"}),
            0.8,
            "two hours of handyman work at market rate",
        );
        let result = evaluate(&profile, &proposal);
        assert!(result.valid, "{:?}", result.violations);
        assert_eq!(result.corrections.len(), 1);
        assert_eq!(result.corrections[0].to, json!("standard"));

        let accepted = result.accepted_proposal(&proposal).unwrap();
        assert_eq!(accepted.payload["price_tier"], "standard");
        let again = evaluate(&profile, &accepted);
        assert!(again.valid);
        assert!(again.corrections.is_empty());
    }

    #[test]
    fn test_low_confidence_and_short_rationale_fail() {
        let profile = ValidatorProfile::pricing(&PricingBounds::default());
        let result = evaluate(
            &profile,
            &pricing(
                json!({"price_cents": 3_000, "platform_fee_cents": 450, "price_tier": "budget"}),
                0.3,
                "cheap",
            ),
        );
        assert_eq!(
            result.violation_codes(),
            vec!["low_confidence", "rationale_too_short"]
        );
        let err = result
            .accepted_proposal(&pricing(json!({}), 0.3, "cheap"))
            .unwrap_err();
        assert!(err.to_string().contains("low_confidence"));
    }

    #[test]
    fn test_fee_outside_tolerance() {
        let profile = ValidatorProfile::pricing(&PricingBounds::default());
        let result = evaluate(
            &profile,
            &pricing(
                json!({"price_cents": 10_000, "platform_fee_cents": 2_000, "price_tier": "standard"}),
                0.9,
                "standard cleaning rate for three hours",
            ),
        );
        assert_eq!(result.violation_codes(), vec!["tolerance_exceeded"]);
    }

    #[test]
    fn test_missing_and_non_numeric_fields() {
        let profile = ValidatorProfile::pricing(&PricingBounds::default());
        let result = evaluate(
            &profile,
            &pricing(json!({"price_cents": "lots"}), 0.9, "a long enough reasoning text"),
        );
        assert!(!result.valid);
        assert!(result.violation_codes().contains(&"not_numeric"));
        assert!(result.violation_codes().contains(&"missing_field"));
    }

    #[test]
    fn test_nan_confidence_fails_gate() {
        let profile = ValidatorProfile::advisory("ranking", 0.5, 0);
        let mut proposal = pricing(json!({}), 0.9, "");
        proposal.confidence = f64::NAN;
        assert_eq!(evaluate(&profile, &proposal).violation_codes(), vec!["low_confidence"]);
    }
}
