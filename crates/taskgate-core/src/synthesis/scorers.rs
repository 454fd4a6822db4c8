//! Per-domain risk scorers.
//!
//! Each scorer is a small weighted combination of its domain's sub-signals.
//! Sub-weights sum to 1.0, so every risk lands in `[0, 1]`.

use super::signals::{BiometricSignals, DeviceSignals, DocumentSignals};

/// Risk and risk flags for one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainScore {
    pub risk: f64,
    pub flags: Vec<String>,
}

/// Scores outside `[0, 1]` are clamped; non-finite scores count as worst case.
fn unit(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

pub fn score_document(s: &DocumentSignals) -> DomainScore {
    let authenticity = unit(s.authenticity_score);
    let risk = 0.4 * (1.0 - authenticity)
        + 0.3 * indicator(!s.data_match)
        + 0.1 * indicator(s.expired)
        + 0.2 * indicator(s.tamper_detected);

    let mut flags = Vec::new();
    if authenticity < 0.5 {
        flags.push("document_low_authenticity".to_string());
    }
    if !s.data_match {
        flags.push("document_data_mismatch".to_string());
    }
    if s.expired {
        flags.push("document_expired".to_string());
    }
    if s.tamper_detected {
        flags.push("document_tampered".to_string());
    }
    DomainScore {
        risk: risk.clamp(0.0, 1.0),
        flags,
    }
}

pub fn score_biometric(s: &BiometricSignals) -> DomainScore {
    let face = unit(s.face_match_score);
    let liveness = unit(s.liveness_score);
    let risk = 0.45 * (1.0 - face) + 0.35 * (1.0 - liveness) + 0.2 * indicator(s.spoof_detected);

    let mut flags = Vec::new();
    if face < 0.6 {
        flags.push("biometric_face_mismatch".to_string());
    }
    if liveness < 0.5 {
        flags.push("biometric_liveness_failed".to_string());
    }
    if s.spoof_detected {
        flags.push("biometric_spoof_detected".to_string());
    }
    DomainScore {
        risk: risk.clamp(0.0, 1.0),
        flags,
    }
}

pub fn score_device(s: &DeviceSignals) -> DomainScore {
    let reputation = unit(s.reputation_score);
    let shared = (f64::from(s.accounts_on_device.saturating_sub(1)) / 4.0).min(1.0);
    let risk = 0.4 * (1.0 - reputation)
        + 0.2 * indicator(s.vpn_or_proxy)
        + 0.25 * indicator(s.emulator)
        + 0.15 * shared;

    let mut flags = Vec::new();
    if reputation < 0.5 {
        flags.push("device_low_reputation".to_string());
    }
    if s.vpn_or_proxy {
        flags.push("device_vpn_or_proxy".to_string());
    }
    if s.emulator {
        flags.push("device_emulator".to_string());
    }
    if s.accounts_on_device > 1 {
        flags.push("device_shared".to_string());
    }
    DomainScore {
        risk: risk.clamp(0.0, 1.0),
        flags,
    }
}
