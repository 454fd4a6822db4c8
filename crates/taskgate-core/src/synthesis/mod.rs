//! Signal synthesis: one verdict from independently optional signal domains.
//!
//! Each available domain is scored by a private pure scorer; the scores are
//! combined with weights renormalized over the available domains. Fewer than
//! the configured minimum of domains can never produce APPROVE.

mod aggregate;
mod error;
mod model;
mod scorers;
mod settings;
mod signals;
mod synthesizer;
mod verdict;

pub use aggregate::{aggregate, decide, deterministic_verdict, effective_weights, Aggregate};
pub use error::SynthesisError;
pub use settings::{DomainWeights, SynthesisConfig, SynthesisMode};
pub use signals::{
    BiometricSignals, DeviceSignals, DocumentSignals, DomainInput, SignalDomain, SignalSet,
};
pub use synthesizer::SignalSynthesizer;
pub use verdict::{ComponentScore, Verdict, VerdictKind, VerdictSource};
