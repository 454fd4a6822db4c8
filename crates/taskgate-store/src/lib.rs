//! Taskgate-Store: append-only audit persistence
//!
//! This crate owns the only entity in the decision pipeline with persistent
//! identity: the [`AuditRecord`]. Every proposal, verdict, and human override
//! lands here exactly once and is never updated or deleted.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: insert-only semantics and backend independence.
//!
//! ## Key Components
//!
//! - `AuditStore`: backend-agnostic, insert-only trait
//! - `SurrealAuditStore`: SurrealDB implementation (`mem://`, `surrealkv://`, remote)
//! - `fakes`: in-memory and always-failing stores for tests

mod error;
pub mod fakes;
mod migrations;
pub mod record;
mod schema;
pub mod surreal_audit;

pub use error::StorageError;
pub use record::{
    AuditId, AuditKind, AuditRecord, AuditStore, AuthorityLevel, StorageResult, SubjectRef,
};
pub use surreal_audit::SurrealAuditStore;
