//! SurrealDB-backed AuditStore implementation
//!
//! Uses `schema::DbAuditRecord` for persistence, converting to/from
//! `record::AuditRecord` at the boundary. Only `CREATE` and `SELECT` are
//! ever issued against the table.

use std::path::Path;

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::migrations;
use crate::record::{AuditId, AuditRecord, AuditStore, StorageResult, SubjectRef};
use crate::schema::DbAuditRecord;

const NAMESPACE: &str = "taskgate";
const DATABASE: &str = "audit";
const TABLE: &str = "audit_records";

/// SurrealDB-backed implementation of [`AuditStore`].
pub struct SurrealAuditStore {
    db: Surreal<Any>,
}

impl SurrealAuditStore {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `taskgate/audit`, and runs `init_schema`.
    pub async fn in_memory() -> StorageResult<Self> {
        Self::connect("mem://").await
    }

    /// Open (or create) a local SurrealKV database under `dir`.
    pub async fn open(dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            StorageError::Backend(format!(
                "failed to create database directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Self::connect(&format!("surrealkv://{}", dir.display())).await
    }

    /// Connect using `SURREALDB_URL` when set, else a local store under `default_dir`.
    pub async fn from_env(default_dir: &Path) -> StorageResult<Self> {
        match std::env::var("SURREALDB_URL") {
            Ok(url) => Self::connect(&url).await,
            Err(_) => Self::open(default_dir).await,
        }
    }

    /// Connect to any SurrealDB endpoint URL.
    pub async fn connect(url: &str) -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect to {url}: {e}")))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!("SurrealAuditStore connected ({})", url);
        Ok(Self { db })
    }

    // -- private helpers -----------------------------------------------------

    async fn select_rows(
        &self,
        sql: &'static str,
        key: &'static str,
        value: String,
    ) -> StorageResult<Vec<AuditRecord>> {
        let mut res = self
            .db
            .query(sql)
            .bind((key, value))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<DbAuditRecord> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(AuditRecord::try_from).collect()
    }

    async fn find(&self, audit_id: &AuditId) -> StorageResult<Option<AuditRecord>> {
        let rows = self
            .select_rows(
                "SELECT * FROM audit_records WHERE audit_id = $aid",
                "aid",
                audit_id.0.clone(),
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl AuditStore for SurrealAuditStore {
    async fn insert(&self, record: &AuditRecord) -> StorageResult<()> {
        if self.find(&record.audit_id).await?.is_some() {
            return Err(StorageError::Duplicate {
                audit_id: record.audit_id.0.clone(),
            });
        }
        if let Some(original) = record.overrides() {
            if self.find(original).await?.is_none() {
                return Err(StorageError::NotFound {
                    audit_id: original.0.clone(),
                });
            }
        }

        debug!(audit_id = %record.audit_id, domain = %record.domain, "inserting audit record");

        let _created: Option<DbAuditRecord> = self
            .db
            .create(TABLE)
            .content(DbAuditRecord::from(record))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, audit_id: &AuditId) -> StorageResult<AuditRecord> {
        self.find(audit_id)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                audit_id: audit_id.0.clone(),
            })
    }

    async fn list_for_subject(&self, subject: &SubjectRef) -> StorageResult<Vec<AuditRecord>> {
        let mut res = self
            .db
            .query(
                "SELECT * FROM audit_records WHERE subject_kind = $kind AND subject_id = $sid ORDER BY created_at ASC",
            )
            .bind(("kind", subject.kind.clone()))
            .bind(("sid", subject.id.clone()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<DbAuditRecord> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(AuditRecord::try_from).collect()
    }

    async fn overrides_for(&self, audit_id: &AuditId) -> StorageResult<Vec<AuditRecord>> {
        self.select_rows(
            "SELECT * FROM audit_records WHERE overrides = $aid ORDER BY created_at ASC",
            "aid",
            audit_id.0.clone(),
        )
        .await
    }
}
