//! The queue message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message carried between the job service and the worker pool.
///
/// Only the document id is required; `text` may travel inline for
/// transports without a shared store, but workers always treat the
/// store's record as authoritative when one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeJob {
    /// Document id of the job to process
    pub document_id: String,
    /// Optional inline copy of the text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl SummarizeJob {
    /// Create a new message for a document id.
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            text: None,
            created_at: Utc::now(),
        }
    }

    /// Attach an inline copy of the text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}
