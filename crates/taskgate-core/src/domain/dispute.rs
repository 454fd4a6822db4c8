//! Dispute context and the evidence questions asked to resolve it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeCategory {
    NotCompleted,
    QualityIssue,
    Damage,
    NoShow,
    PaymentIssue,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Client,
    Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Photo,
    Document,
    Statement,
    Timeline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeContext {
    pub dispute_id: String,
    pub task_id: String,
    pub category: DisputeCategory,
    pub task_title: String,
    /// Who opened the dispute.
    pub opened_by: Party,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceQuestion {
    pub text: String,
    pub addressed_to: Party,
    pub evidence_kind: EvidenceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceQuestions {
    pub questions: Vec<EvidenceQuestion>,
}

/// Upper bound on questions accepted from any source.
pub const MAX_EVIDENCE_QUESTIONS: usize = 8;
