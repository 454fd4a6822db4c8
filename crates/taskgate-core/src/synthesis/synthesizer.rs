//! Verdict synthesis entry point.

use std::sync::Arc;

use taskgate_store::{AuditRecord, AuthorityLevel, SubjectRef};
use tracing::Instrument;

use super::aggregate::{aggregate, deterministic_verdict};
use super::error::SynthesisError;
use super::model::{
    build_prompt, check_consistency, into_verdict, parse_model_verdict, SYSTEM_PROMPT,
};
use super::settings::{SynthesisConfig, SynthesisMode};
use super::signals::{SignalDomain, SignalSet};
use super::verdict::{Verdict, VerdictKind, VerdictSource};
use crate::audit::DecisionAuditLog;
use crate::fallback;
use crate::metrics::METRICS;
use crate::obs;
use crate::router::{CallOptions, ModelRouter};

const AGENT: &str = "signal_synthesizer";
const DOMAIN: &str = "fraud_verdict";
const SUBJECT_KIND: &str = "user";

/// Combines signal domains into one verdict and audits every attempt.
pub struct SignalSynthesizer {
    config: SynthesisConfig,
    router: Option<Arc<ModelRouter>>,
    audit: DecisionAuditLog,
}

impl SignalSynthesizer {
    /// Fails when `config` does not pass [`SynthesisConfig::validate`].
    pub fn new(config: SynthesisConfig, audit: DecisionAuditLog) -> Result<Self, SynthesisError> {
        config.validate()?;
        Ok(Self {
            config,
            router: None,
            audit,
        })
    }

    /// Router used in `model_assisted` mode.
    pub fn with_router(mut self, router: Arc<ModelRouter>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Produce a verdict for `signals` and append exactly one audit record,
    /// including when no domain is available.
    pub async fn synthesize_verdict(&self, signals: &SignalSet) -> Result<Verdict, SynthesisError> {
        self.synthesize(signals)
            .instrument(obs::decision_span(DOMAIN, &signals.subject_id))
            .await
    }

    async fn synthesize(&self, signals: &SignalSet) -> Result<Verdict, SynthesisError> {
        let result = match self.config.mode {
            SynthesisMode::Deterministic => {
                deterministic_verdict(signals, &self.config, None, VerdictSource::Deterministic)
            }
            SynthesisMode::ModelAssisted => self.model_assisted(signals).await,
        };

        match &result {
            Ok(verdict) => {
                obs::emit_verdict_synthesized(
                    verdict.verdict.as_str(),
                    verdict.risk_score,
                    verdict.available_domains(),
                    verdict.source.label(),
                );
                self.audit.append(verdict_record(verdict));
            }
            Err(err) => {
                self.audit.append(failure_record(signals, err));
            }
        }
        result
    }

    async fn model_assisted(&self, signals: &SignalSet) -> Result<Verdict, SynthesisError> {
        // Fail fast on empty input before spending a model call.
        let agg = aggregate(signals, &self.config.weights)?;

        let Some(router) = self.router.as_ref().filter(|r| r.is_configured()) else {
            return self.fallback(signals, "no inference provider configured");
        };

        let options = CallOptions::new(self.config.route, build_prompt(signals, &self.config))
            .system(SYSTEM_PROMPT)
            .temperature(0.0);

        match router.call_json(options).await {
            Ok(reply) => match parse_model_verdict(&reply.data)
                .and_then(|parsed| check_consistency(&parsed, &self.config).map(|()| parsed))
            {
                Ok(parsed) => Ok(into_verdict(signals, agg, parsed, &self.config, &reply.call)),
                Err(violations) => {
                    METRICS.inc_model_rejections();
                    obs::emit_model_response_rejected("verdict_synthesis", &violations);
                    self.fallback(signals, "model response failed schema validation")
                }
            },
            Err(err) => self.fallback(signals, &err.to_string()),
        }
    }

    fn fallback(&self, signals: &SignalSet, reason: &str) -> Result<Verdict, SynthesisError> {
        METRICS.inc_fallbacks();
        obs::emit_fallback_invoked("verdict_synthesis", reason);
        let mut verdict = fallback::synthesize_verdict(signals, &self.config)?;
        verdict.source = VerdictSource::Fallback {
            reason: reason.to_string(),
        };
        Ok(verdict)
    }
}

/// MANUAL_REVIEW is pending (`None`); APPROVE and REJECT stand as advisory outcomes.
fn verdict_record(verdict: &Verdict) -> AuditRecord {
    let accepted = match verdict.verdict {
        VerdictKind::ManualReview => None,
        VerdictKind::Approve | VerdictKind::Reject => Some(true),
    };
    let payload = serde_json::to_value(verdict).unwrap_or_else(|err| {
        obs::emit_audit_payload_unserializable(DOMAIN, &verdict.subject_id, &err);
        serde_json::json!({
            "error": format!("verdict could not be encoded: {err}"),
            "verdict": verdict.verdict.as_str(),
        })
    });
    AuditRecord::decision(
        AGENT,
        DOMAIN,
        SubjectRef::new(SUBJECT_KIND, verdict.subject_id.clone()),
        payload,
        Some(verdict.confidence),
        verdict.reasoning.clone(),
        accepted,
        AuthorityLevel::Advisory,
    )
}

fn failure_record(signals: &SignalSet, err: &SynthesisError) -> AuditRecord {
    let availability: serde_json::Map<String, serde_json::Value> = SignalDomain::ALL
        .into_iter()
        .map(|d| (d.as_str().to_string(), signals.is_available(d).into()))
        .collect();
    AuditRecord::decision(
        AGENT,
        DOMAIN,
        SubjectRef::new(SUBJECT_KIND, signals.subject_id.clone()),
        serde_json::json!({ "error": err.to_string(), "available": availability }),
        None,
        err.to_string(),
        Some(false),
        AuthorityLevel::Advisory,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::{BiometricSignals, DomainInput};
    use taskgate_store::fakes::MemoryAuditStore;

    fn single_domain() -> SignalSet {
        SignalSet {
            subject_id: "u-3".into(),
            document: DomainInput::unavailable("vendor outage"),
            biometric: DomainInput::available(BiometricSignals {
                face_match_score: 0.99,
                liveness_score: 0.99,
                spoof_detected: false,
            }),
            device: DomainInput::unavailable("no fingerprint"),
        }
    }

    #[tokio::test]
    async fn test_model_assisted_without_router_falls_back() {
        let store = Arc::new(MemoryAuditStore::new());
        let audit = DecisionAuditLog::spawn(store.clone());
        let config = SynthesisConfig {
            mode: SynthesisMode::ModelAssisted,
            ..SynthesisConfig::default()
        };
        let synth = SignalSynthesizer::new(config, audit.clone()).unwrap();

        let verdict = synth.synthesize_verdict(&single_domain()).await.unwrap();
        assert_eq!(verdict.verdict, VerdictKind::ManualReview);
        assert!(verdict.confidence <= 0.5);
        assert!(matches!(verdict.source, VerdictSource::Fallback { .. }));

        audit.flush().await;
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].accepted, None);
        assert_eq!(records[0].authority, AuthorityLevel::Advisory);
    }
}
