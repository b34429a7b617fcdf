//! Service error types.

use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected synchronously at submission; names the missing field.
    #[error("Missing required field: {0}")]
    Validation(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] textsum_store::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] textsum_queue::QueueError),
}

impl ServiceError {
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation(field.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}
