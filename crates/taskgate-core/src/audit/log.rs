//! Best-effort audit sink decoupled from the decision return path.
//!
//! Decisions call [`DecisionAuditLog::append`], which only enqueues. A
//! background task performs the insert. Failed inserts never reach the
//! decision path; they are counted in `METRICS`, logged as
//! `audit.write_failed`, and published to [`DecisionAuditLog::subscribe_failures`].

use std::sync::Arc;

use taskgate_store::{AuditId, AuditRecord, AuditStore, StorageError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::metrics::METRICS;
use crate::obs;

const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// A write that could not be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditWriteFailure {
    pub audit_id: AuditId,
    pub domain: String,
    pub error: String,
}

enum AuditCommand {
    Append(Box<AuditRecord>),
    Flush(oneshot::Sender<()>),
}

/// Append-only decision audit log.
///
/// Cloning is cheap; all clones feed the same writer task.
#[derive(Clone)]
pub struct DecisionAuditLog {
    store: Arc<dyn AuditStore>,
    tx: mpsc::UnboundedSender<AuditCommand>,
    failures: broadcast::Sender<AuditWriteFailure>,
}

impl DecisionAuditLog {
    /// Start the background writer on the current tokio runtime.
    pub fn spawn(store: Arc<dyn AuditStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);

        tokio::spawn(run_writer(Arc::clone(&store), rx, failures.clone()));

        Self {
            store,
            tx,
            failures,
        }
    }

    /// Enqueue a record. Never blocks and never fails; returns the record id.
    pub fn append(&self, record: AuditRecord) -> AuditId {
        let audit_id = record.audit_id.clone();
        let domain = record.domain.clone();
        if self.tx.send(AuditCommand::Append(Box::new(record))).is_err() {
            report_failure(
                &self.failures,
                &audit_id,
                &domain,
                &"audit writer is not running",
            );
        }
        audit_id
    }

    /// Wait until every record appended before this call has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(AuditCommand::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Receive every subsequent write failure.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<AuditWriteFailure> {
        self.failures.subscribe()
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    /// Record a human reviewer's decision about an existing record.
    ///
    /// Unlike `append`, this waits for the insert and reports its error: the
    /// reviewer needs confirmation. Pending appends are flushed first so the
    /// original can be found.
    pub async fn record_override(
        &self,
        original: &AuditId,
        reviewer: &str,
        accepted: bool,
        reasoning: &str,
    ) -> Result<AuditRecord, StorageError> {
        self.flush().await;
        let original = self.store.get(original).await?;
        let addendum = AuditRecord::override_for(&original, reviewer, accepted, reasoning);
        self.store.insert(&addendum).await?;
        METRICS.inc_audit_appends();
        obs::emit_audit_appended(addendum.audit_id.as_str(), &addendum.domain);
        Ok(addendum)
    }
}

async fn run_writer(
    store: Arc<dyn AuditStore>,
    mut rx: mpsc::UnboundedReceiver<AuditCommand>,
    failures: broadcast::Sender<AuditWriteFailure>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            AuditCommand::Append(record) => match store.insert(&record).await {
                Ok(()) => {
                    METRICS.inc_audit_appends();
                    obs::emit_audit_appended(record.audit_id.as_str(), &record.domain);
                }
                Err(err) => report_failure(&failures, &record.audit_id, &record.domain, &err),
            },
            AuditCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("audit writer stopped");
}

fn report_failure(
    failures: &broadcast::Sender<AuditWriteFailure>,
    audit_id: &AuditId,
    domain: &str,
    error: &dyn std::fmt::Display,
) {
    METRICS.inc_audit_write_failures();
    obs::emit_audit_write_failed(audit_id.as_str(), domain, error);
    // No subscribers is fine.
    let _ = failures.send(AuditWriteFailure {
        audit_id: audit_id.clone(),
        domain: domain.to_string(),
        error: error.to_string(),
    });
}
