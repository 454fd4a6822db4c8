//! Audit record and storage trait definitions
//!
//! - `AuditRecord`: immutable record of one decision attempt or one override
//! - `AuditStore`: insert-only persistence (no update, no delete)
//!
//! Later human review never edits a record. It is appended as a new
//! [`AuditKind::Override`] record that references the original by id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Unique identifier for an audit record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuditId(pub String);

impl AuditId {
    /// Generate a new random AuditId
    pub fn new() -> Self {
        AuditId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AuditId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The entity a decision is about, e.g. `("task", "t-829")` or `("worker", "w-17")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub kind: String,
    pub id: String,
}

impl SubjectRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Distinguishes advisory automated output from binding decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityLevel {
    /// Non-binding output of a model or heuristic.
    Advisory,
    /// Outcome of a deterministic, offline check.
    DeterministicGate,
    /// A human reviewer's decision.
    HumanOverride,
}

impl AuthorityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Advisory => "advisory",
            Self::DeterministicGate => "deterministic_gate",
            Self::HumanOverride => "human_override",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "advisory" => Some(Self::Advisory),
            "deterministic_gate" => Some(Self::DeterministicGate),
            "human_override" => Some(Self::HumanOverride),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a record is an original decision or an addendum to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditKind {
    Decision,
    Override { overrides: AuditId },
}

/// Immutable audit record.
///
/// `accepted` is `None` while a decision is pending (e.g. routed to manual
/// review), `Some(true)` when the automated outcome stands, and `Some(false)`
/// when it was rejected or could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: AuditId,
    pub kind: AuditKind,
    /// Component or reviewer that produced the record (e.g. `signal_synthesizer`).
    pub agent: String,
    /// Decision domain (e.g. `pricing`, `fraud_verdict`).
    pub domain: String,
    pub subject: SubjectRef,
    /// Full proposal or verdict payload as produced.
    pub payload: serde_json::Value,
    pub confidence: Option<f64>,
    pub reasoning: String,
    pub accepted: Option<bool>,
    pub authority: AuthorityLevel,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Create a decision record stamped with a fresh id and the current time.
    ///
    /// `confidence` is clamped to `[0, 1]`; non-finite values are dropped.
    #[allow(clippy::too_many_arguments)]
    pub fn decision(
        agent: impl Into<String>,
        domain: impl Into<String>,
        subject: SubjectRef,
        payload: serde_json::Value,
        confidence: Option<f64>,
        reasoning: impl Into<String>,
        accepted: Option<bool>,
        authority: AuthorityLevel,
    ) -> Self {
        Self {
            audit_id: AuditId::new(),
            kind: AuditKind::Decision,
            agent: agent.into(),
            domain: domain.into(),
            subject,
            payload,
            confidence: confidence.filter(|c| c.is_finite()).map(|c| c.clamp(0.0, 1.0)),
            reasoning: reasoning.into(),
            accepted,
            authority,
            created_at: Utc::now(),
        }
    }

    /// Build the append-only addendum recording a human reviewer's decision.
    pub fn override_for(
        original: &AuditRecord,
        reviewer: impl Into<String>,
        accepted: bool,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            audit_id: AuditId::new(),
            kind: AuditKind::Override {
                overrides: original.audit_id.clone(),
            },
            agent: reviewer.into(),
            domain: original.domain.clone(),
            subject: original.subject.clone(),
            payload: serde_json::json!({ "overridden_accepted": original.accepted }),
            confidence: None,
            reasoning: reasoning.into(),
            accepted: Some(accepted),
            authority: AuthorityLevel::HumanOverride,
            created_at: Utc::now(),
        }
    }

    /// Id of the record this one overrides, if it is an override.
    pub fn overrides(&self) -> Option<&AuditId> {
        match &self.kind {
            AuditKind::Decision => None,
            AuditKind::Override { overrides } => Some(overrides),
        }
    }
}

/// Insert-only audit store.
///
/// Guarantees:
/// - `insert` persists the record exactly as given, or fails.
/// - Inserting an id twice fails with `StorageError::Duplicate`.
/// - An override whose original does not exist fails with `StorageError::NotFound`.
/// - There is no update or delete operation.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist a new record.
    async fn insert(&self, record: &AuditRecord) -> StorageResult<()>;

    /// Fetch a record by id. Returns `StorageError::NotFound` if absent.
    async fn get(&self, audit_id: &AuditId) -> StorageResult<AuditRecord>;

    /// All records about a subject, oldest first.
    async fn list_for_subject(&self, subject: &SubjectRef) -> StorageResult<Vec<AuditRecord>>;

    /// All override addenda that reference `audit_id`, oldest first.
    async fn overrides_for(&self, audit_id: &AuditId) -> StorageResult<Vec<AuditRecord>>;
}
