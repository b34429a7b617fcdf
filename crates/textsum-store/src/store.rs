//! The `JobStore` capability and its in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use textsum_models::{Job, JobStatus};

use crate::error::{StoreError, StoreResult};

/// Authoritative, durable record of jobs keyed by document id.
///
/// The store is the sole owner of record identity. Creation and status
/// transitions are atomic per id; the store itself rejects illegal
/// transitions, in particular any write over a terminal state.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a new record. Fails with [`StoreError::AlreadyExists`] if the
    /// id is already present; callers treat that as "already submitted".
    async fn put(&self, job: Job) -> StoreResult<()>;

    /// Fetch the full record.
    async fn get(&self, document_id: &str) -> StoreResult<Job>;

    /// Atomically transition a job, bumping `updated_at`.
    ///
    /// `summary` is only persisted for `Completed`, `error_message` only
    /// for `Error`. Returns the updated record.
    async fn update_status(
        &self,
        document_id: &str,
        status: JobStatus,
        summary: Option<String>,
        error_message: Option<String>,
    ) -> StoreResult<Job>;
}

/// In-memory store, used as the injected test double.
///
/// Enforces exactly the same creation and transition rules as the
/// Redis-backed store.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, for test assertions.
    pub fn len(&self) -> usize {
        self.jobs.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, job: Job) -> StoreResult<()> {
        let mut jobs = self.jobs.write().expect("store lock poisoned");
        if jobs.contains_key(&job.document_id) {
            return Err(StoreError::already_exists(&job.document_id));
        }
        jobs.insert(job.document_id.clone(), job);
        Ok(())
    }

    async fn get(&self, document_id: &str) -> StoreResult<Job> {
        self.jobs
            .read()
            .expect("store lock poisoned")
            .get(document_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(document_id))
    }

    async fn update_status(
        &self,
        document_id: &str,
        status: JobStatus,
        summary: Option<String>,
        error_message: Option<String>,
    ) -> StoreResult<Job> {
        let mut jobs = self.jobs.write().expect("store lock poisoned");
        let job = jobs
            .get_mut(document_id)
            .ok_or_else(|| StoreError::not_found(document_id))?;
        let from = job.status;
        if !job.transition(status, summary, error_message) {
            return Err(StoreError::IllegalTransition {
                document_id: document_id.to_string(),
                from,
                to: status,
            });
        }
        Ok(job.clone())
    }
}
