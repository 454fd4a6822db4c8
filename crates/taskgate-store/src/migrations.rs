//! SurrealDB schema initialization for the audit table
//!
//! Safe to call on every connection (idempotent).

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::record::StorageResult;

/// Initialize all Taskgate tables in SurrealDB
pub async fn init_schema(db: &Surreal<Any>) -> StorageResult<()> {
    info!("Initializing Taskgate audit schema");
    init_audit_records_table(db).await?;
    info!("Taskgate audit schema initialization complete");
    Ok(())
}

/// Initialize `audit_records` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE audit_records {
///   audit_id:     STRING (unique)
///   kind:         STRING (enum: decision | override)
///   overrides:    STRING? (indexed; original audit_id for overrides)
///   agent:        STRING
///   domain:       STRING
///   subject_kind: STRING (indexed with subject_id)
///   subject_id:   STRING
///   payload:      OBJECT
///   confidence:   FLOAT?
///   reasoning:    STRING
///   accepted:     BOOL?
///   authority:    STRING
///   created_at:   DATETIME (indexed)
/// }
/// ```
///
/// Constraints:
/// - `audit_id` is unique
/// - records are never updated or deleted
async fn init_audit_records_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing audit_records table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS audit_records SCHEMALESS
            PERMISSIONS
                FOR create, select FULL
                FOR update, delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_audit_id ON TABLE audit_records COLUMNS audit_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_subject ON TABLE audit_records COLUMNS subject_kind, subject_id;
        DEFINE INDEX IF NOT EXISTS idx_overrides ON TABLE audit_records COLUMNS overrides;
        DEFINE INDEX IF NOT EXISTS idx_created_at ON TABLE audit_records COLUMNS created_at;
    "#;

    db.query(sql)
        .await
        .map_err(|e| StorageError::Backend(format!("schema setup failed: {e}")))?
        .check()
        .map_err(|e| StorageError::Backend(format!("schema setup failed: {e}")))?;

    Ok(())
}
