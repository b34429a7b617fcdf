//! Summarizer error types.

use thiserror::Error;

pub type SummarizeResult<T> = Result<T, SummarizeError>;

#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Network error, timeout, 429 or 5xx: worth retrying.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The endpoint answered but the body had no usable summary.
    #[error("Unexpected API response format: {0}")]
    MalformedResponse(String),

    /// Non-retriable API rejection (auth, bad request, ...).
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// All retry attempts used up; message states the attempt count.
    #[error("Summarization failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SummarizeError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SummarizeError::Transient(_))
    }
}
