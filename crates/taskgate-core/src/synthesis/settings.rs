//! Synthesis weights, thresholds, and mode.

use serde::{Deserialize, Serialize};

use super::error::SynthesisError;
use super::signals::SignalDomain;
use crate::router::Route;

/// Static per-domain weights. Renormalized over available domains at use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainWeights {
    pub document: f64,
    pub biometric: f64,
    pub device: f64,
}

impl Default for DomainWeights {
    fn default() -> Self {
        Self {
            document: 0.35,
            biometric: 0.35,
            device: 0.30,
        }
    }
}

impl DomainWeights {
    pub fn weight(&self, domain: SignalDomain) -> f64 {
        match domain {
            SignalDomain::Document => self.document,
            SignalDomain::Biometric => self.biometric,
            SignalDomain::Device => self.device,
        }
    }
}

/// Whether the holistic synthesis step is delegated to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMode {
    #[default]
    Deterministic,
    ModelAssisted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub weights: DomainWeights,
    /// Risk strictly below this approves (when enough domains are available).
    pub approve_below: f64,
    /// Risk strictly above this rejects, regardless of availability.
    pub reject_above: f64,
    /// Fewer available domains than this disallows APPROVE.
    pub min_available_domains: usize,
    /// Confidence ceiling when the availability guard is not met.
    pub degraded_confidence_ceiling: f64,
    pub mode: SynthesisMode,
    /// Route used in `model_assisted` mode.
    pub route: Route,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            weights: DomainWeights::default(),
            approve_below: 0.30,
            reject_above: 0.70,
            min_available_domains: 2,
            degraded_confidence_ceiling: 0.50,
            mode: SynthesisMode::Deterministic,
            route: Route::Reasoning,
        }
    }
}

impl SynthesisConfig {
    pub fn validate(&self) -> Result<(), SynthesisError> {
        for domain in SignalDomain::ALL {
            let w = self.weights.weight(domain);
            if !w.is_finite() || w <= 0.0 {
                return Err(SynthesisError::InvalidConfig(format!(
                    "weight for {domain} must be a positive number, got {w}"
                )));
            }
        }

        let unit = 0.0..=1.0;
        if !unit.contains(&self.approve_below) || !unit.contains(&self.reject_above) {
            return Err(SynthesisError::InvalidConfig(
                "thresholds must lie within [0, 1]".to_string(),
            ));
        }
        if self.approve_below > self.reject_above {
            return Err(SynthesisError::InvalidConfig(format!(
                "approve_below {} exceeds reject_above {}",
                self.approve_below, self.reject_above
            )));
        }
        if !(1..=SignalDomain::ALL.len()).contains(&self.min_available_domains) {
            return Err(SynthesisError::InvalidConfig(format!(
                "min_available_domains must be within 1..={}, got {}",
                SignalDomain::ALL.len(),
                self.min_available_domains
            )));
        }
        if !unit.contains(&self.degraded_confidence_ceiling) {
            return Err(SynthesisError::InvalidConfig(
                "degraded_confidence_ceiling must lie within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        SynthesisConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut c = SynthesisConfig::default();
        c.weights.device = 0.0;
        assert!(c.validate().is_err());

        let mut c = SynthesisConfig::default();
        c.weights.document = f64::NAN;
        assert!(c.validate().is_err());

        let mut c = SynthesisConfig::default();
        c.approve_below = 0.8;
        assert!(c.validate().is_err());

        let mut c = SynthesisConfig::default();
        c.min_available_domains = 4;
        assert!(c.validate().is_err());

        let mut c = SynthesisConfig::default();
        c.min_available_domains = 0;
        assert!(c.validate().is_err());
    }
}
