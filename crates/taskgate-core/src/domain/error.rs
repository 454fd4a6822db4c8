//! Crate-level error taxonomy for Taskgate.

use crate::config::ConfigError;
use crate::router::RouterError;
use crate::synthesis::SynthesisError;

/// Taskgate errors surfaced to binaries and embedding services.
///
/// Validation failures are not represented here: they are returned as
/// values (see `validator::ValidationResult`).
#[derive(Debug, thiserror::Error)]
pub enum TaskgateError {
    #[error("router error: {0}")]
    Router(#[from] RouterError),

    #[error("synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] taskgate_store::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Taskgate operations.
pub type Result<T> = std::result::Result<T, TaskgateError>;
