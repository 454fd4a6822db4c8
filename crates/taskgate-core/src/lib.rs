//! Taskgate Core Library
//!
//! AI-assisted decision pipeline for a local gig marketplace: model routing
//! with fallback chains, signal synthesis, deterministic fallbacks, proposal
//! validation, and the decision audit log.

pub mod assist;
pub mod audit;
pub mod config;
pub mod domain;
pub mod fallback;
pub mod metrics;
pub mod obs;
pub mod router;
pub mod synthesis;
pub mod telemetry;
pub mod validator;

pub use assist::{AssistOutcome, DecisionAssistant};

pub use audit::{
    AuditId, AuditKind, AuditRecord, AuditStore, AuditWriteFailure, AuthorityLevel,
    DecisionAuditLog, SubjectRef,
};

pub use config::{AdvisoryBounds, ConfigError, PipelineConfig, RouterConfig};

pub use domain::{
    CandidateProfile, CandidateRanking, DisputeCategory, DisputeContext, EvidenceKind,
    EvidenceQuestion, EvidenceQuestions, Party, PriceHint, PriceTier, PricingBounds,
    PricingRequest, Proposal, ProposalSource, RankedCandidate, RankingRequest, Result,
    TaskCategory, TaskgateError, Urgency,
};

pub use fallback::FALLBACK_CONFIDENCE_CAP;

pub use router::{
    CallOptions, CallResult, CompletionProvider, JsonCallResult, ModelRouter, ProviderCredentials,
    Route, RouteBinding, RouterError,
};

pub use synthesis::{
    SignalDomain, SignalSet, SignalSynthesizer, SynthesisConfig, SynthesisError, SynthesisMode,
    Verdict, VerdictKind,
};

pub use validator::{
    evaluate, ProposalValidationFailed, ProposalValidator, ValidationResult, ValidationRule,
    ValidatorProfile, Violation,
};
