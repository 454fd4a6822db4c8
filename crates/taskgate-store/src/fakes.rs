//! In-memory fakes for the audit store (testing only)
//!
//! Provides `MemoryAuditStore`, which satisfies the `AuditStore` contract
//! without external dependencies, and `FailingAuditStore`, which rejects
//! every write so callers can prove audit failures never block a decision.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::*;

// ---------------------------------------------------------------------------
// MemoryAuditStore
// ---------------------------------------------------------------------------

/// In-memory audit store backed by an insertion-ordered `Vec`.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Vec<AuditRecord>>> {
        self.records
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }

    /// Snapshot of every stored record in insertion order.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn insert(&self, record: &AuditRecord) -> StorageResult<()> {
        let mut records = self.lock()?;
        if records.iter().any(|r| r.audit_id == record.audit_id) {
            return Err(StorageError::Duplicate {
                audit_id: record.audit_id.0.clone(),
            });
        }
        if let Some(original) = record.overrides() {
            if !records.iter().any(|r| &r.audit_id == original) {
                return Err(StorageError::NotFound {
                    audit_id: original.0.clone(),
                });
            }
        }
        records.push(record.clone());
        Ok(())
    }

    async fn get(&self, audit_id: &AuditId) -> StorageResult<AuditRecord> {
        let records = self.lock()?;
        records
            .iter()
            .find(|r| &r.audit_id == audit_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                audit_id: audit_id.0.clone(),
            })
    }

    async fn list_for_subject(&self, subject: &SubjectRef) -> StorageResult<Vec<AuditRecord>> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .filter(|r| &r.subject == subject)
            .cloned()
            .collect())
    }

    async fn overrides_for(&self, audit_id: &AuditId) -> StorageResult<Vec<AuditRecord>> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .filter(|r| r.overrides() == Some(audit_id))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// FailingAuditStore
// ---------------------------------------------------------------------------

/// Store whose writes always fail with `StorageError::Backend`.
///
/// Counts attempted inserts so tests can assert the write was tried.
#[derive(Debug, Default)]
pub struct FailingAuditStore {
    attempts: AtomicUsize,
}

impl FailingAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `insert` calls received so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditStore for FailingAuditStore {
    async fn insert(&self, _record: &AuditRecord) -> StorageResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Backend("audit store unavailable".to_string()))
    }

    async fn get(&self, audit_id: &AuditId) -> StorageResult<AuditRecord> {
        Err(StorageError::NotFound {
            audit_id: audit_id.0.clone(),
        })
    }

    async fn list_for_subject(&self, _subject: &SubjectRef) -> StorageResult<Vec<AuditRecord>> {
        Ok(Vec::new())
    }

    async fn overrides_for(&self, _audit_id: &AuditId) -> StorageResult<Vec<AuditRecord>> {
        Ok(Vec::new())
    }
}
