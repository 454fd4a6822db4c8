//! Signal domains and their explicit availability.

use serde::{Deserialize, Serialize};

/// The fixed set of independent verification subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDomain {
    Document,
    Biometric,
    Device,
}

impl SignalDomain {
    pub const ALL: [SignalDomain; 3] = [Self::Document, Self::Biometric, Self::Device];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Biometric => "biometric",
            Self::Device => "device",
        }
    }

    /// Flag raised when this domain supplied no data.
    pub fn unavailable_flag(self) -> String {
        format!("{}_unavailable", self.as_str())
    }
}

impl std::fmt::Display for SignalDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain's input: structured signals, or an explicit marker that the
/// subsystem had nothing to report. There is no default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DomainInput<T> {
    Available {
        signals: T,
    },
    Unavailable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl<T> DomainInput<T> {
    pub fn available(signals: T) -> Self {
        Self::Available { signals }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: Some(reason.into()),
        }
    }

    pub fn signals(&self) -> Option<&T> {
        match self {
            Self::Available { signals } => Some(signals),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// Identity-document verification output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSignals {
    /// Vendor authenticity score, 0–1 (1 = certainly genuine).
    pub authenticity_score: f64,
    /// Extracted fields match the profile.
    pub data_match: bool,
    pub expired: bool,
    pub tamper_detected: bool,
}

/// Selfie / liveness verification output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricSignals {
    /// Face similarity to the document photo, 0–1.
    pub face_match_score: f64,
    /// Liveness confidence, 0–1.
    pub liveness_score: f64,
    pub spoof_detected: bool,
}

/// Device fingerprint output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSignals {
    /// Device reputation, 0–1 (1 = clean history).
    pub reputation_score: f64,
    pub vpn_or_proxy: bool,
    pub emulator: bool,
    /// Distinct accounts seen on this device, including the subject's.
    pub accounts_on_device: u32,
}

/// Every domain's input for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    pub subject_id: String,
    pub document: DomainInput<DocumentSignals>,
    pub biometric: DomainInput<BiometricSignals>,
    pub device: DomainInput<DeviceSignals>,
}

impl SignalSet {
    pub fn is_available(&self, domain: SignalDomain) -> bool {
        match domain {
            SignalDomain::Document => self.document.is_available(),
            SignalDomain::Biometric => self.biometric.is_available(),
            SignalDomain::Device => self.device.is_available(),
        }
    }

    /// Available domains, in canonical order.
    pub fn available_domains(&self) -> Vec<SignalDomain> {
        SignalDomain::ALL
            .into_iter()
            .filter(|d| self.is_available(*d))
            .collect()
    }

    pub fn available_count(&self) -> usize {
        self.available_domains().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signal_set_requires_explicit_status() {
        let missing_device = json!({
            "subject_id": "w-1",
            "document": {"status": "unavailable"},
            "biometric": {"status": "unavailable", "reason": "camera denied"},
        });
        assert!(serde_json::from_value::<SignalSet>(missing_device).is_err());

        let bad_status = json!({
            "subject_id": "w-1",
            "document": {"status": "unknown"},
            "biometric": {"status": "unavailable"},
            "device": {"status": "unavailable"},
        });
        assert!(serde_json::from_value::<SignalSet>(bad_status).is_err());
    }

    #[test]
    fn test_available_domains_in_canonical_order() {
        let set: SignalSet = serde_json::from_value(json!({
            "subject_id": "w-1",
            "document": {"status": "unavailable", "reason": "vendor outage"},
            "biometric": {"status": "available", "signals": {
                "face_match_score": 0.9, "liveness_score": 0.95, "spoof_detected": false
            }},
            "device": {"status": "available", "signals": {
                "reputation_score": 0.8, "vpn_or_proxy": false, "emulator": false, "accounts_on_device": 1
            }},
        }))
        .unwrap();
        assert_eq!(
            set.available_domains(),
            vec![SignalDomain::Biometric, SignalDomain::Device]
        );
        assert_eq!(set.available_count(), 2);
        assert_eq!(SignalDomain::Document.unavailable_flag(), "document_unavailable");
    }
}
