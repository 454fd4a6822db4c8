//! Verdict synthesis across partial signal availability.

use std::sync::Arc;

use taskgate_core::audit::{AuthorityLevel, DecisionAuditLog};
use taskgate_core::router::{ModelRouter, ScriptedProvider};
use taskgate_core::synthesis::{
    deterministic_verdict, BiometricSignals, ComponentScore, DeviceSignals, DocumentSignals,
    DomainInput, DomainWeights, SignalDomain, SignalSet, SignalSynthesizer, SynthesisConfig,
    SynthesisError, SynthesisMode, VerdictKind, VerdictSource,
};
use taskgate_core::FALLBACK_CONFIDENCE_CAP;
use taskgate_store::fakes::MemoryAuditStore;

fn clean_document() -> DocumentSignals {
    DocumentSignals {
        authenticity_score: 0.97,
        data_match: true,
        expired: false,
        tamper_detected: false,
    }
}

fn clean_biometric() -> BiometricSignals {
    BiometricSignals {
        face_match_score: 0.98,
        liveness_score: 0.98,
        spoof_detected: false,
    }
}

fn clean_device() -> DeviceSignals {
    DeviceSignals {
        reputation_score: 0.95,
        vpn_or_proxy: false,
        emulator: false,
        accounts_on_device: 1,
    }
}

fn all_clean(subject: &str) -> SignalSet {
    SignalSet {
        subject_id: subject.into(),
        document: DomainInput::available(clean_document()),
        biometric: DomainInput::available(clean_biometric()),
        device: DomainInput::available(clean_device()),
    }
}

fn synthesizer(config: SynthesisConfig) -> (SignalSynthesizer, Arc<MemoryAuditStore>, DecisionAuditLog) {
    let store = Arc::new(MemoryAuditStore::new());
    let audit = DecisionAuditLog::spawn(store.clone());
    (SignalSynthesizer::new(config, audit.clone()).unwrap(), store, audit)
}

fn assisted() -> SynthesisConfig {
    SynthesisConfig {
        mode: SynthesisMode::ModelAssisted,
        ..SynthesisConfig::default()
    }
}

#[tokio::test]
async fn test_two_of_three_domains_renormalize_and_approve() {
    let (synth, store, audit) = synthesizer(SynthesisConfig::default());
    let signals = SignalSet {
        subject_id: "u-2".into(),
        document: DomainInput::unavailable("vendor timeout"),
        biometric: DomainInput::available(clean_biometric()),
        device: DomainInput::available(clean_device()),
    };

    let verdict = synth.synthesize_verdict(&signals).await.unwrap();
    assert_eq!(verdict.verdict, VerdictKind::Approve);
    assert!((verdict.risk_score - 0.018).abs() < 0.005, "{}", verdict.risk_score);
    assert!((verdict.confidence - 0.98).abs() < 0.01);
    assert_eq!(verdict.availability_flags, vec!["document_unavailable".to_string()]);
    assert!(verdict.risk_flags.is_empty());

    match verdict.components[&SignalDomain::Biometric] {
        ComponentScore::Scored { weight, .. } => assert!((weight - 0.538).abs() < 0.001),
        ref other => panic!("unexpected component {other:?}"),
    }
    match verdict.components[&SignalDomain::Device] {
        ComponentScore::Scored { weight, .. } => assert!((weight - 0.462).abs() < 0.001),
        ref other => panic!("unexpected component {other:?}"),
    }
    assert_eq!(
        verdict.components[&SignalDomain::Document],
        ComponentScore::Unavailable
    );

    audit.flush().await;
    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].domain, "fraud_verdict");
    assert_eq!(records[0].subject.id, "u-2");
    assert_eq!(records[0].accepted, Some(true));
    assert_eq!(records[0].authority, AuthorityLevel::Advisory);
}

#[tokio::test]
async fn test_high_risk_rejects_regardless_of_domain_count() {
    let (synth, _, _) = synthesizer(SynthesisConfig::default());
    let signals = SignalSet {
        subject_id: "u-4".into(),
        document: DomainInput::available(DocumentSignals {
            authenticity_score: 0.1,
            data_match: false,
            expired: true,
            tamper_detected: true,
        }),
        biometric: DomainInput::available(BiometricSignals {
            face_match_score: 0.1,
            liveness_score: 0.2,
            spoof_detected: true,
        }),
        device: DomainInput::available(DeviceSignals {
            reputation_score: 0.1,
            vpn_or_proxy: true,
            emulator: true,
            accounts_on_device: 3,
        }),
    };
    let verdict = synth.synthesize_verdict(&signals).await.unwrap();
    assert!(verdict.risk_score > 0.85);
    assert_eq!(verdict.verdict, VerdictKind::Reject);
    assert!(verdict.risk_flags.contains(&"document_tampered".to_string()));
    assert!(verdict.risk_flags.contains(&"device_emulator".to_string()));

    let single = SignalSet {
        subject_id: "u-4b".into(),
        document: DomainInput::unavailable("not submitted"),
        biometric: DomainInput::unavailable("not submitted"),
        device: signals.device.clone(),
    };
    let verdict = synth.synthesize_verdict(&single).await.unwrap();
    assert_eq!(verdict.verdict, VerdictKind::Reject);
    assert!(verdict.confidence <= 0.5);
}

#[test]
fn test_zero_weights_never_produce_a_verdict() {
    let config = SynthesisConfig {
        weights: DomainWeights {
            document: 0.0,
            biometric: 0.0,
            device: 0.0,
        },
        ..SynthesisConfig::default()
    };
    let signals = SignalSet {
        subject_id: "u-zero".into(),
        document: DomainInput::available(DocumentSignals {
            authenticity_score: 0.0,
            data_match: false,
            expired: true,
            tamper_detected: true,
        }),
        biometric: DomainInput::available(BiometricSignals {
            face_match_score: 0.0,
            liveness_score: 0.0,
            spoof_detected: true,
        }),
        device: DomainInput::unavailable("no fingerprint"),
    };

    let err = deterministic_verdict(&signals, &config, None, VerdictSource::Deterministic)
        .unwrap_err();
    assert!(matches!(err, SynthesisError::InvalidConfig(_)), "{err}");
}

#[tokio::test]
async fn test_synthesizer_rejects_invalid_config_up_front() {
    let audit = DecisionAuditLog::spawn(Arc::new(MemoryAuditStore::new()));
    let config = SynthesisConfig {
        weights: DomainWeights {
            document: 0.0,
            biometric: 0.0,
            device: 0.0,
        },
        ..SynthesisConfig::default()
    };
    let err = SignalSynthesizer::new(config, audit).err();
    assert!(matches!(err, Some(SynthesisError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_single_clean_domain_never_approves() {
    let (synth, store, audit) = synthesizer(SynthesisConfig::default());
    let signals = SignalSet {
        subject_id: "u-1d".into(),
        document: DomainInput::unavailable("vendor outage"),
        biometric: DomainInput::available(clean_biometric()),
        device: DomainInput::unavailable("no fingerprint"),
    };
    let verdict = synth.synthesize_verdict(&signals).await.unwrap();
    assert_eq!(verdict.verdict, VerdictKind::ManualReview);
    assert!(verdict.confidence <= 0.5);
    assert_eq!(verdict.availability_flags.len(), 2);

    audit.flush().await;
    assert_eq!(store.records()[0].accepted, None);
}

#[tokio::test]
async fn test_no_domains_is_input_insufficient_and_audited() {
    let (synth, store, audit) = synthesizer(SynthesisConfig::default());
    let signals = SignalSet {
        subject_id: "u-0".into(),
        document: DomainInput::unavailable("x"),
        biometric: DomainInput::unavailable("y"),
        device: DomainInput::unavailable("z"),
    };
    let err = synth.synthesize_verdict(&signals).await.unwrap_err();
    assert_eq!(
        err,
        SynthesisError::InputInsufficient {
            subject_id: "u-0".into()
        }
    );

    audit.flush().await;
    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].accepted, Some(false));
    assert_eq!(records[0].payload["available"]["device"], false);
}

#[tokio::test]
async fn test_unconfigured_reasoning_route_uses_capped_fallback() {
    let anthropic = Arc::new(ScriptedProvider::unconfigured("anthropic"));
    let router = ModelRouter::builder().provider(anthropic.clone()).build();
    assert!(!router.is_configured());

    let (synth, store, audit) = synthesizer(assisted());
    let synth = synth.with_router(Arc::new(router));

    let verdict = synth.synthesize_verdict(&all_clean("u-1")).await.unwrap();
    assert_eq!(verdict.verdict, VerdictKind::Approve);
    assert!(verdict.confidence <= FALLBACK_CONFIDENCE_CAP);
    assert!(matches!(verdict.source, VerdictSource::Fallback { .. }));
    assert_eq!(anthropic.calls(), 0);

    audit.flush().await;
    assert_eq!(store.records().len(), 1);
}

#[tokio::test]
async fn test_model_verdict_is_used_when_schema_valid() {
    let anthropic = Arc::new(ScriptedProvider::replying(
        "anthropic",
        r#"{"verdict": "MANUAL_REVIEW", "confidence": 0.72, "risk_score": 0.35,
            "reasoning": "device reputation is fine but liveness is borderline",
            "flags": ["borderline_liveness"]}"#,
    ));
    let router = ModelRouter::builder().provider(anthropic.clone()).build();
    let (synth, _, _) = synthesizer(assisted());
    let synth = synth.with_router(Arc::new(router));

    let verdict = synth.synthesize_verdict(&all_clean("u-5")).await.unwrap();
    assert_eq!(verdict.verdict, VerdictKind::ManualReview);
    assert_eq!(verdict.confidence, 0.72);
    assert!(verdict
        .risk_flags
        .contains(&"model_borderline_liveness".to_string()));
    match &verdict.source {
        VerdictSource::Model { provider, model, .. } => {
            assert_eq!(provider, "anthropic");
            assert_eq!(model, "claude-3-5-sonnet-latest");
        }
        other => panic!("unexpected source {other:?}"),
    }
    assert_eq!(anthropic.requests()[0].temperature, 0.0);
}

#[tokio::test]
async fn test_model_approve_is_downgraded_below_domain_minimum() {
    let anthropic = Arc::new(ScriptedProvider::replying(
        "anthropic",
        r#"{"verdict": "APPROVE", "confidence": 0.95, "risk_score": 0.05, "reasoning": "looks fine"}"#,
    ));
    let router = ModelRouter::builder().provider(anthropic).build();
    let (synth, _, _) = synthesizer(assisted());
    let synth = synth.with_router(Arc::new(router));

    let signals = SignalSet {
        subject_id: "u-6".into(),
        document: DomainInput::unavailable("skipped"),
        biometric: DomainInput::unavailable("skipped"),
        device: DomainInput::available(clean_device()),
    };
    let verdict = synth.synthesize_verdict(&signals).await.unwrap();
    assert_eq!(verdict.verdict, VerdictKind::ManualReview);
    assert!(verdict.confidence <= 0.5);
}

#[tokio::test]
async fn test_malformed_model_verdict_falls_back() {
    let anthropic = Arc::new(ScriptedProvider::replying(
        "anthropic",
        r#"{"verdict": "MAYBE", "confidence": 2.0}"#,
    ));
    let router = ModelRouter::builder().provider(anthropic).build();
    let (synth, store, audit) = synthesizer(assisted());
    let synth = synth.with_router(Arc::new(router));

    let verdict = synth.synthesize_verdict(&all_clean("u-7")).await.unwrap();
    match &verdict.source {
        VerdictSource::Fallback { reason } => assert!(reason.contains("schema")),
        other => panic!("unexpected source {other:?}"),
    }
    assert!(verdict.confidence <= FALLBACK_CONFIDENCE_CAP);

    audit.flush().await;
    assert_eq!(store.records().len(), 1);
}

#[tokio::test]
async fn test_self_contradicting_model_verdict_falls_back() {
    let anthropic = Arc::new(ScriptedProvider::replying(
        "anthropic",
        r#"{"verdict": "APPROVE", "confidence": 0.9, "risk_score": 0.95,
            "reasoning": "approve despite high risk"}"#,
    ));
    let router = ModelRouter::builder().provider(anthropic.clone()).build();
    let (synth, _, _) = synthesizer(assisted());
    let synth = synth.with_router(Arc::new(router));

    let verdict = synth.synthesize_verdict(&all_clean("u-8")).await.unwrap();
    assert_eq!(anthropic.calls(), 1);
    assert!(matches!(verdict.source, VerdictSource::Fallback { .. }));
    assert!(verdict.risk_score < 0.30);
    assert!(verdict.confidence <= FALLBACK_CONFIDENCE_CAP);
}
