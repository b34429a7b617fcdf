//! The job record: one unit of submitted text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job_status::JobStatus;

/// Durable record of a summarization job.
///
/// The `document_id` is supplied by the caller and identifies the job for
/// its whole lifetime. `original_text` is write-once; only `status`,
/// `summary`, `error_message` and `updated_at` change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Caller-supplied identifier
    pub document_id: String,
    /// The input text, immutable once set
    pub original_text: String,
    /// Current status
    pub status: JobStatus,
    /// Present iff status == Completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Present iff status == Error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// Advances on every status transition
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job in the `Queued` state.
    pub fn new(document_id: impl Into<String>, original_text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            document_id: document_id.into(),
            original_text: original_text.into(),
            status: JobStatus::Queued,
            summary: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a status transition, carrying the result fields.
    ///
    /// Returns `false` without mutating anything when the transition is
    /// illegal. Exactly one of `summary` / `error_message` ends up set for
    /// terminal states, matching the status.
    pub fn transition(
        &mut self,
        next: JobStatus,
        summary: Option<String>,
        error_message: Option<String>,
    ) -> bool {
        if !self.status.can_transition(next) {
            return false;
        }
        self.status = next;
        self.summary = match next {
            JobStatus::Completed => summary,
            _ => None,
        };
        self.error_message = match next {
            JobStatus::Error => error_message,
            _ => None,
        };
        self.updated_at = Utc::now();
        true
    }
}
