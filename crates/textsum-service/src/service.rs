//! The job service.

use std::sync::Arc;

use tracing::{info, warn};

use textsum_models::{Job, JobStatus};
use textsum_queue::{SummarizeJob, WorkQueue};
use textsum_store::{CachedStatus, JobStore, StatusCache, StoreError};

use crate::error::{ServiceError, ServiceResult};

/// Outcome of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// New record created and enqueued.
    Accepted { status: JobStatus },
    /// The id is already `Queued` or `Processing`; nothing was enqueued.
    AlreadyInFlight { status: JobStatus },
    /// The id already reached a terminal state; resubmission is a no-op
    /// because `original_text` is write-once.
    Done { status: JobStatus },
}

impl Submission {
    /// The status visible to the caller.
    pub fn status(&self) -> JobStatus {
        match self {
            Submission::Accepted { status }
            | Submission::AlreadyInFlight { status }
            | Submission::Done { status } => *status,
        }
    }
}

/// Facade over store, cache and queue.
///
/// Capabilities are injected at construction; tests pass the in-memory
/// implementations, binaries the Redis-backed ones.
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
    cache: Arc<dyn StatusCache>,
    queue: Arc<dyn WorkQueue>,
}

impl JobService {
    pub fn new(
        store: Arc<dyn JobStore>,
        cache: Arc<dyn StatusCache>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        Self { store, cache, queue }
    }

    /// Validate and submit a job.
    ///
    /// Duplicate submission never creates a second record or a second
    /// queue entry: the store's atomic create is the dedup point, so two
    /// concurrent submissions of the same id race on `put` and exactly
    /// one wins.
    pub async fn submit(
        &self,
        document_id: &str,
        text: &str,
    ) -> ServiceResult<Submission> {
        if document_id.trim().is_empty() {
            return Err(ServiceError::validation("document_id"));
        }
        if text.trim().is_empty() {
            return Err(ServiceError::validation("text"));
        }

        let job = Job::new(document_id, text);
        match self.store.put(job).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(_)) => {
                let existing = self.store.get(document_id).await?;
                self.repopulate_cache(&existing).await;
                let status = existing.status;
                info!(
                    "Document {} already submitted, current status: {}",
                    document_id, status
                );
                return Ok(if status.is_terminal() {
                    Submission::Done { status }
                } else {
                    Submission::AlreadyInFlight { status }
                });
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.cache.set(document_id, &CachedStatus::queued()).await {
            warn!("Cache write failed for {}: {}", document_id, e);
        }

        if let Err(e) = self.queue.enqueue(SummarizeJob::new(document_id)).await {
            // The record exists but no worker will ever see it; make the
            // failure visible instead of leaving a forever-Queued job.
            let message = format!("enqueue failed: {e}");
            if let Err(store_err) = self
                .store
                .update_status(document_id, JobStatus::Error, None, Some(message))
                .await
            {
                warn!(
                    "Failed to mark {} as errored after enqueue failure: {}",
                    document_id, store_err
                );
            }
            return Err(e.into());
        }

        info!("Queued document {} for summarization", document_id);
        Ok(Submission::Accepted {
            status: JobStatus::Queued,
        })
    }

    /// Current status snapshot: cache first, store on a miss.
    pub async fn status(&self, document_id: &str) -> ServiceResult<CachedStatus> {
        if let Some(entry) = self.cache_get(document_id).await {
            return Ok(entry);
        }
        self.load_from_store(document_id).await
    }

    /// Result snapshot. A terminal cache entry that carries its payload is
    /// served directly; anything else is answered from the store, which is
    /// authoritative for `summary` and `error_message`.
    pub async fn result(&self, document_id: &str) -> ServiceResult<CachedStatus> {
        if let Some(entry) = self.cache_get(document_id).await {
            let complete = match entry.status {
                JobStatus::Completed => entry.summary.is_some(),
                JobStatus::Error => entry.error_message.is_some(),
                _ => true,
            };
            if complete {
                return Ok(entry);
            }
        }
        self.load_from_store(document_id).await
    }

    async fn load_from_store(&self, document_id: &str) -> ServiceResult<CachedStatus> {
        let job = match self.store.get(document_id).await {
            Ok(job) => job,
            Err(StoreError::NotFound(_)) => {
                return Err(ServiceError::not_found(document_id));
            }
            Err(e) => return Err(e.into()),
        };
        let entry = CachedStatus::from(&job);
        self.repopulate_cache(&job).await;
        Ok(entry)
    }

    async fn cache_get(&self, document_id: &str) -> Option<CachedStatus> {
        match self.cache.get(document_id).await {
            Ok(entry) => entry,
            Err(e) => {
                // Cache trouble is a latency event, never an outage.
                warn!("Cache read failed for {}: {}", document_id, e);
                None
            }
        }
    }

    async fn repopulate_cache(&self, job: &Job) {
        if let Err(e) = self.cache.set(&job.document_id, &CachedStatus::from(job)).await {
            warn!("Cache write failed for {}: {}", job.document_id, e);
        }
    }
}
