//! Domain models for Taskgate.
//!
//! Canonical definitions for the inputs and outputs that flow through the
//! decision pipeline:
//! - `Proposal`: non-binding suggestion with confidence and reasoning
//! - `PricingRequest` / `PriceHint`: task price suggestion
//! - `RankingRequest` / `CandidateRanking`: worker ranking for a task
//! - `DisputeContext` / `EvidenceQuestions`: questions that resolve a dispute

pub mod dispute;
pub mod error;
pub mod pricing;
pub mod proposal;
pub mod ranking;

pub use dispute::{
    DisputeCategory, DisputeContext, EvidenceKind, EvidenceQuestion, EvidenceQuestions, Party,
    MAX_EVIDENCE_QUESTIONS,
};
pub use error::{Result, TaskgateError};
pub use pricing::{PriceHint, PriceTier, PricingBounds, PricingRequest, TaskCategory, Urgency};
pub use proposal::{clamp_confidence, Proposal, ProposalSource};
pub use ranking::{CandidateProfile, CandidateRanking, RankedCandidate, RankingRequest};
