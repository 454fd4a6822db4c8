//! Decision audit trail.
//!
//! Every validation and verdict produces exactly one [`AuditRecord`]; human
//! review is recorded as an override addendum, never as an edit.

mod log;

pub use log::{AuditWriteFailure, DecisionAuditLog};
pub use taskgate_store::{AuditId, AuditKind, AuditRecord, AuditStore, AuthorityLevel, SubjectRef};
