// Error types for task operations and persistence

use thiserror::Error;

/// Errors returned synchronously from `TaskStore` operations.
///
/// `Validation` and `NotFound` are raised before any state change.
/// `Persistence` only appears when a caller asks for strict durability,
/// see [`crate::store::Outcome::durable`].
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Failures of the durable key-value store or of the stored payload.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("corrupt data under key {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = TaskError> = std::result::Result<T, E>;
