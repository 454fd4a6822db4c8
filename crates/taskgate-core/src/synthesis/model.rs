//! Model-assisted holistic synthesis: prompt construction and strict schema
//! validation of the reply. A reply with any violation is discarded whole.

use serde_json::{json, Value};

use super::aggregate::Aggregate;
use super::settings::SynthesisConfig;
use super::signals::SignalSet;
use super::verdict::{Verdict, VerdictKind, VerdictSource};
use crate::domain::clamp_confidence;
use crate::router::CallResult;

pub(crate) const SYSTEM_PROMPT: &str = "You are a fraud-risk analyst for a gig-task marketplace. \
Given identity verification signals, return a JSON object with keys: \
verdict (one of APPROVE, MANUAL_REVIEW, REJECT), confidence (0-1), \
risk_score (0-1), reasoning (string), flags (array of short snake_case strings). \
Domains marked unavailable carry no information; do not treat them as passing or failing.";

pub(crate) fn build_prompt(signals: &SignalSet, config: &SynthesisConfig) -> String {
    let body = json!({
        "signals": signals,
        "thresholds": {
            "approve_below": config.approve_below,
            "reject_above": config.reject_above,
            "min_available_domains": config.min_available_domains,
        },
    });
    format!("Assess this applicant:\n{body}")
}

/// A model reply that passed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ModelVerdict {
    pub verdict: VerdictKind,
    pub confidence: f64,
    pub risk_score: f64,
    pub reasoning: String,
    pub flags: Vec<String>,
}

fn unit_number(obj: &serde_json::Map<String, Value>, key: &str, violations: &mut Vec<String>) -> f64 {
    match obj.get(key) {
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if (0.0..=1.0).contains(&v) => v,
            _ => {
                violations.push(format!("{key} must be a number within [0, 1]"));
                0.0
            }
        },
        Some(_) => {
            violations.push(format!("{key} must be a number"));
            0.0
        }
        None => {
            violations.push(format!("{key} is required"));
            0.0
        }
    }
}

/// Check required fields, enum membership, and types.
pub(crate) fn parse_model_verdict(value: &Value) -> Result<ModelVerdict, Vec<String>> {
    let Some(obj) = value.as_object() else {
        return Err(vec!["response must be a JSON object".to_string()]);
    };
    let mut violations = Vec::new();

    let verdict = match obj.get("verdict") {
        Some(Value::String(s)) => VerdictKind::parse(s).or_else(|| {
            violations.push(format!("verdict {s:?} is not one of APPROVE, MANUAL_REVIEW, REJECT"));
            None
        }),
        Some(_) => {
            violations.push("verdict must be a string".to_string());
            None
        }
        None => {
            violations.push("verdict is required".to_string());
            None
        }
    };

    let confidence = unit_number(obj, "confidence", &mut violations);
    let risk_score = unit_number(obj, "risk_score", &mut violations);

    let reasoning = match obj.get("reasoning") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            violations.push("reasoning must be a string".to_string());
            String::new()
        }
        None => {
            violations.push("reasoning is required".to_string());
            String::new()
        }
    };

    let flags = match obj.get("flags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let strings: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            if strings.len() != items.len() {
                violations.push("flags must contain only strings".to_string());
            }
            strings
        }
        Some(_) => {
            violations.push("flags must be an array".to_string());
            Vec::new()
        }
    };

    match verdict {
        Some(verdict) if violations.is_empty() => Ok(ModelVerdict {
            verdict,
            confidence,
            risk_score,
            reasoning,
            flags,
        }),
        _ => Err(violations),
    }
}

/// Reject replies whose verdict contradicts their own risk score.
///
/// APPROVE needs a risk score inside the approve band and REJECT needs one
/// outside it. MANUAL_REVIEW is consistent with any score.
pub(crate) fn check_consistency(
    reply: &ModelVerdict,
    config: &SynthesisConfig,
) -> Result<(), Vec<String>> {
    let in_approve_band = reply.risk_score < config.approve_below;
    match reply.verdict {
        VerdictKind::Approve if !in_approve_band => Err(vec![format!(
            "verdict APPROVE contradicts risk_score {} (approve below {})",
            reply.risk_score, config.approve_below
        )]),
        VerdictKind::Reject if in_approve_band => Err(vec![format!(
            "verdict REJECT contradicts risk_score {} (approve below {})",
            reply.risk_score, config.approve_below
        )]),
        _ => Ok(()),
    }
}

/// Combine a validated model reply with the locally computed components.
///
/// The availability guard still applies: a model APPROVE below the minimum
/// domain count becomes MANUAL_REVIEW and confidence is capped.
pub(crate) fn into_verdict(
    signals: &SignalSet,
    agg: Aggregate,
    reply: ModelVerdict,
    config: &SynthesisConfig,
    call: &CallResult,
) -> Verdict {
    let guard_met = agg.available >= config.min_available_domains;
    let mut kind = reply.verdict;
    let mut confidence = clamp_confidence(reply.confidence);
    if !guard_met {
        if kind == VerdictKind::Approve {
            kind = VerdictKind::ManualReview;
        }
        confidence = confidence.min(config.degraded_confidence_ceiling);
    }

    let mut risk_flags = agg.risk_flags;
    for flag in reply.flags {
        let flag = format!("model_{flag}");
        if !risk_flags.contains(&flag) {
            risk_flags.push(flag);
        }
    }

    Verdict {
        subject_id: signals.subject_id.clone(),
        verdict: kind,
        confidence,
        risk_score: clamp_confidence(reply.risk_score),
        components: agg.components,
        risk_flags,
        availability_flags: agg.availability_flags,
        recommended_action: kind.recommended_action().to_string(),
        reasoning: reply.reasoning,
        source: VerdictSource::Model {
            provider: call.provider.clone(),
            model: call.model.clone(),
            cached: call.cached,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_reply_parses() {
        let reply = parse_model_verdict(&json!({
            "verdict": "MANUAL_REVIEW",
            "confidence": 0.7,
            "risk_score": 0.4,
            "reasoning": "face match borderline",
            "flags": ["borderline_face"]
        }))
        .unwrap();
        assert_eq!(reply.verdict, VerdictKind::ManualReview);
        assert_eq!(reply.flags, vec!["borderline_face"]);
    }

    #[test]
    fn test_flags_are_optional() {
        let reply = parse_model_verdict(&json!({
            "verdict": "APPROVE", "confidence": 0.9, "risk_score": 0.1, "reasoning": "clean"
        }))
        .unwrap();
        assert!(reply.flags.is_empty());
    }

    #[test]
    fn test_schema_violations_are_collected() {
        let violations = parse_model_verdict(&json!({
            "verdict": "MAYBE",
            "confidence": "high",
            "risk_score": 1.7,
            "flags": [1, "x"]
        }))
        .unwrap_err();
        assert_eq!(violations.len(), 5, "{violations:?}");
        assert!(violations[0].contains("MAYBE"));

        assert!(parse_model_verdict(&json!(["APPROVE"])).is_err());
    }

    #[test]
    fn test_verdict_must_agree_with_its_risk_score() {
        let config = SynthesisConfig::default();
        let reply = |verdict: &str, risk: f64| {
            parse_model_verdict(&json!({
                "verdict": verdict, "confidence": 0.9, "risk_score": risk, "reasoning": "r"
            }))
            .unwrap()
        };

        let err = check_consistency(&reply("APPROVE", 0.95), &config).unwrap_err();
        assert!(err[0].contains("APPROVE"), "{err:?}");
        assert!(check_consistency(&reply("APPROVE", 0.5), &config).is_err());
        assert!(check_consistency(&reply("REJECT", 0.05), &config).is_err());

        assert!(check_consistency(&reply("APPROVE", 0.1), &config).is_ok());
        assert!(check_consistency(&reply("REJECT", 0.5), &config).is_ok());
        assert!(check_consistency(&reply("MANUAL_REVIEW", 0.01), &config).is_ok());
        assert!(check_consistency(&reply("MANUAL_REVIEW", 0.99), &config).is_ok());
    }
}
