//! Weighted aggregation and the verdict decision rule.

use std::collections::BTreeMap;

use super::error::SynthesisError;
use super::scorers::{score_biometric, score_device, score_document, DomainScore};
use super::settings::{DomainWeights, SynthesisConfig};
use super::signals::{SignalDomain, SignalSet};
use super::verdict::{ComponentScore, Verdict, VerdictKind, VerdictSource};
use crate::domain::clamp_confidence;

/// Weights of the available domains, rescaled to sum to 1.0.
///
/// Unavailable domains get no weight at all; they are neither zero risk nor
/// full risk. Weights that cannot be rescaled (negative, non-finite, or
/// summing to zero over `available`) are a configuration error.
pub fn effective_weights(
    weights: &DomainWeights,
    available: &[SignalDomain],
) -> Result<BTreeMap<SignalDomain, f64>, SynthesisError> {
    if let Some(domain) = available
        .iter()
        .find(|d| !weights.weight(**d).is_finite() || weights.weight(**d) < 0.0)
    {
        return Err(SynthesisError::InvalidConfig(format!(
            "weight for {domain} must be a non-negative number, got {}",
            weights.weight(*domain)
        )));
    }
    let total: f64 = available.iter().map(|d| weights.weight(*d)).sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(SynthesisError::InvalidConfig(format!(
            "weights of the available domains sum to {total}"
        )));
    }
    Ok(available
        .iter()
        .map(|d| (*d, weights.weight(*d) / total))
        .collect())
}

/// Locally computed scores for one signal set.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub risk_score: f64,
    pub components: BTreeMap<SignalDomain, ComponentScore>,
    pub risk_flags: Vec<String>,
    pub availability_flags: Vec<String>,
    pub available: usize,
}

impl Aggregate {
    pub fn unavailable_domains(&self) -> Vec<SignalDomain> {
        self.components
            .iter()
            .filter(|(_, c)| matches!(c, ComponentScore::Unavailable))
            .map(|(d, _)| *d)
            .collect()
    }
}

fn score_domain(signals: &SignalSet, domain: SignalDomain) -> Option<DomainScore> {
    match domain {
        SignalDomain::Document => signals.document.signals().map(score_document),
        SignalDomain::Biometric => signals.biometric.signals().map(score_biometric),
        SignalDomain::Device => signals.device.signals().map(score_device),
    }
}

/// Score every available domain and combine them with renormalized weights.
pub fn aggregate(signals: &SignalSet, weights: &DomainWeights) -> Result<Aggregate, SynthesisError> {
    let available = signals.available_domains();
    if available.is_empty() {
        return Err(SynthesisError::InputInsufficient {
            subject_id: signals.subject_id.clone(),
        });
    }
    let effective = effective_weights(weights, &available)?;

    let mut components = BTreeMap::new();
    let mut risk_flags = Vec::new();
    let mut availability_flags = Vec::new();
    let mut risk_score = 0.0;

    for domain in SignalDomain::ALL {
        match score_domain(signals, domain) {
            Some(score) => {
                let weight = effective.get(&domain).copied().unwrap_or(0.0);
                risk_score += weight * score.risk;
                risk_flags.extend(score.flags);
                components.insert(
                    domain,
                    ComponentScore::Scored {
                        risk: score.risk,
                        weight,
                    },
                );
            }
            None => {
                availability_flags.push(domain.unavailable_flag());
                components.insert(domain, ComponentScore::Unavailable);
            }
        }
    }

    Ok(Aggregate {
        risk_score: risk_score.clamp(0.0, 1.0),
        components,
        risk_flags,
        availability_flags,
        available: available.len(),
    })
}

/// Apply the decision rule and availability guard to a risk score.
///
/// REJECT above `reject_above` always stands. Below the minimum domain count
/// APPROVE is impossible and confidence is capped at the degraded ceiling.
pub fn decide(risk: f64, available: usize, config: &SynthesisConfig) -> (VerdictKind, f64) {
    let guard_met = available >= config.min_available_domains;
    let kind = if risk > config.reject_above {
        VerdictKind::Reject
    } else if !guard_met {
        VerdictKind::ManualReview
    } else if risk < config.approve_below {
        VerdictKind::Approve
    } else {
        VerdictKind::ManualReview
    };

    let confidence = if guard_met {
        1.0 - risk
    } else {
        (1.0 - risk).min(config.degraded_confidence_ceiling)
    };
    (kind, clamp_confidence(confidence))
}

/// Build a verdict from the weighted aggregate alone.
///
/// `confidence_cap`, when set, further limits confidence (fallback path).
pub fn deterministic_verdict(
    signals: &SignalSet,
    config: &SynthesisConfig,
    confidence_cap: Option<f64>,
    source: VerdictSource,
) -> Result<Verdict, SynthesisError> {
    let agg = aggregate(signals, &config.weights)?;
    let (kind, mut confidence) = decide(agg.risk_score, agg.available, config);
    if let Some(cap) = confidence_cap {
        confidence = confidence.min(cap);
    }

    let mut reasoning = format!(
        "weighted risk {:.3} over {}/{} signal domains",
        agg.risk_score,
        agg.available,
        SignalDomain::ALL.len()
    );
    let missing = agg.unavailable_domains();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|d| d.as_str()).collect();
        reasoning.push_str(&format!("; unavailable: {}", names.join(", ")));
    }
    if agg.available < config.min_available_domains {
        reasoning.push_str(&format!(
            "; fewer than {} domains available, approval withheld",
            config.min_available_domains
        ));
    }

    Ok(Verdict {
        subject_id: signals.subject_id.clone(),
        verdict: kind,
        confidence,
        risk_score: agg.risk_score,
        components: agg.components,
        risk_flags: agg.risk_flags,
        availability_flags: agg.availability_flags,
        recommended_action: kind.recommended_action().to_string(),
        reasoning,
        source,
    })
}
