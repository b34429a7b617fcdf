//! Per-delivery processing: one job through the state machine.

use std::sync::Arc;

use tracing::{error, info, warn};

use textsum_models::{Job, JobStatus};
use textsum_queue::SummarizeJob;
use textsum_store::{CachedStatus, JobStore, StatusCache, StoreError};
use textsum_summarizer::Summarizer;

/// What to do with the delivery after processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Job reached a terminal state; ack.
    Done(JobStatus),
    /// Redelivery of a job another worker already finished; ack,
    /// the summarizer was not invoked.
    DuplicateDelivery,
    /// No store record for the id (malformed enqueue); ack and drop.
    MissingRecord,
    /// Infrastructure fault mid-flight; leave the delivery unacked so
    /// the pending-claim path redelivers it later.
    Retry,
}

impl ProcessOutcome {
    /// Whether the delivery should be acknowledged.
    pub fn should_ack(&self) -> bool {
        !matches!(self, ProcessOutcome::Retry)
    }
}

/// Drives a single job through `Processing` to a terminal state.
pub struct Processor {
    store: Arc<dyn JobStore>,
    cache: Arc<dyn StatusCache>,
    summarizer: Arc<dyn Summarizer>,
}

impl Processor {
    pub fn new(
        store: Arc<dyn JobStore>,
        cache: Arc<dyn StatusCache>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            store,
            cache,
            summarizer,
        }
    }

    /// Process one delivery.
    pub async fn process(&self, message: &SummarizeJob) -> ProcessOutcome {
        let document_id = &message.document_id;

        let record = match self.store.get(document_id).await {
            Ok(job) => job,
            Err(StoreError::NotFound(_)) => {
                warn!("No record for enqueued document {}, dropping", document_id);
                return ProcessOutcome::MissingRecord;
            }
            Err(e) => {
                warn!("Store read failed for {}: {}", document_id, e);
                return ProcessOutcome::Retry;
            }
        };

        if record.is_terminal() {
            info!(
                "Document {} already {}, duplicate delivery",
                document_id, record.status
            );
            return ProcessOutcome::DuplicateDelivery;
        }

        match self
            .store
            .update_status(document_id, JobStatus::Processing, None, None)
            .await
        {
            Ok(job) => self.write_through_cache(&job).await,
            Err(StoreError::IllegalTransition { from, .. }) => {
                // Another worker finished the job between our read and write.
                info!(
                    "Document {} moved to {} concurrently, duplicate delivery",
                    document_id, from
                );
                return ProcessOutcome::DuplicateDelivery;
            }
            Err(StoreError::NotFound(_)) => return ProcessOutcome::MissingRecord,
            Err(e) => {
                warn!("Failed to mark {} processing: {}", document_id, e);
                return ProcessOutcome::Retry;
            }
        }

        info!("Processing document {}", document_id);
        match self.summarizer.summarize(&record.original_text).await {
            Ok(summary) => {
                self.finalize(document_id, JobStatus::Completed, Some(summary), None)
                    .await
            }
            Err(e) => {
                error!("Summarization failed for {}: {}", document_id, e);
                self.finalize(document_id, JobStatus::Error, None, Some(e.to_string()))
                    .await
            }
        }
    }

    async fn finalize(
        &self,
        document_id: &str,
        status: JobStatus,
        summary: Option<String>,
        error_message: Option<String>,
    ) -> ProcessOutcome {
        match self
            .store
            .update_status(document_id, status, summary, error_message)
            .await
        {
            Ok(job) => {
                self.write_through_cache(&job).await;
                info!("Document {} finished: {}", document_id, status);
                ProcessOutcome::Done(status)
            }
            Err(StoreError::IllegalTransition { from, .. }) => {
                warn!(
                    "Terminal write for {} lost to concurrent {}, dropping",
                    document_id, from
                );
                ProcessOutcome::DuplicateDelivery
            }
            Err(e) => {
                // The job stays visibly Processing; redelivery retries it.
                error!(
                    "Store write failed for {}, leaving delivery unacked: {}",
                    document_id, e
                );
                ProcessOutcome::Retry
            }
        }
    }

    async fn write_through_cache(&self, job: &Job) {
        if let Err(e) = self
            .cache
            .set(&job.document_id, &CachedStatus::from(job))
            .await
        {
            // The cache is non-authoritative; log and move on.
            warn!("Cache write failed for {}: {}", job.document_id, e);
        }
    }
}
