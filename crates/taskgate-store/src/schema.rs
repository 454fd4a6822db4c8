//! SurrealDB row shapes for audit persistence
//!
//! Rows are flat so that subject and override lookups can be indexed.
//! Conversion to/from [`AuditRecord`] happens at the store boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::record::{AuditId, AuditKind, AuditRecord, AuthorityLevel, SubjectRef};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

pub(crate) const KIND_DECISION: &str = "decision";
pub(crate) const KIND_OVERRIDE: &str = "override";

/// Audit row as stored in the `audit_records` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbAuditRecord {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub audit_id: String,
    /// "decision" | "override"
    pub kind: String,
    /// Original audit id (overrides only)
    pub overrides: Option<String>,
    pub agent: String,
    pub domain: String,
    pub subject_kind: String,
    pub subject_id: String,
    pub payload: serde_json::Value,
    pub confidence: Option<f64>,
    pub reasoning: String,
    pub accepted: Option<bool>,
    pub authority: String,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<&AuditRecord> for DbAuditRecord {
    fn from(record: &AuditRecord) -> Self {
        let (kind, overrides) = match &record.kind {
            AuditKind::Decision => (KIND_DECISION, None),
            AuditKind::Override { overrides } => (KIND_OVERRIDE, Some(overrides.0.clone())),
        };
        DbAuditRecord {
            id: None,
            audit_id: record.audit_id.0.clone(),
            kind: kind.to_string(),
            overrides,
            agent: record.agent.clone(),
            domain: record.domain.clone(),
            subject_kind: record.subject.kind.clone(),
            subject_id: record.subject.id.clone(),
            payload: record.payload.clone(),
            confidence: record.confidence,
            reasoning: record.reasoning.clone(),
            accepted: record.accepted,
            authority: record.authority.as_str().to_string(),
            created_at: record.created_at,
        }
    }
}

impl TryFrom<DbAuditRecord> for AuditRecord {
    type Error = StorageError;

    fn try_from(row: DbAuditRecord) -> Result<Self, Self::Error> {
        let kind = match (row.kind.as_str(), row.overrides) {
            (KIND_DECISION, _) => AuditKind::Decision,
            (KIND_OVERRIDE, Some(original)) => AuditKind::Override {
                overrides: AuditId(original),
            },
            (other, _) => {
                return Err(StorageError::Backend(format!(
                    "malformed audit kind: {other}"
                )))
            }
        };
        let authority = AuthorityLevel::parse(&row.authority).ok_or_else(|| {
            StorageError::Backend(format!("unknown authority level: {}", row.authority))
        })?;

        Ok(AuditRecord {
            audit_id: AuditId(row.audit_id),
            kind,
            agent: row.agent,
            domain: row.domain,
            subject: SubjectRef {
                kind: row.subject_kind,
                id: row.subject_id,
            },
            payload: row.payload,
            confidence: row.confidence,
            reasoning: row.reasoning,
            accepted: row.accepted,
            authority,
            created_at: row.created_at,
        })
    }
}
