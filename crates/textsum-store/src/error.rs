//! Store error types.

use textsum_models::JobStatus;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job already exists: {0}")]
    AlreadyExists(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Illegal transition for {document_id}: {from} -> {to}")]
    IllegalTransition {
        document_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Corrupt record for {0}")]
    Corrupt(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::AlreadyExists(id.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// True when the failure signals a duplicate creation, which callers
    /// treat as "already submitted" rather than a fault.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
