//! The `StatusCache` capability and its in-memory implementation.
//!
//! The cache is a derived, possibly-stale copy of the store's status
//! field, carried opportunistically with the terminal payload. It is
//! never the source of truth: every reader falls back to the store on a
//! miss, and losing the cache entirely costs latency, not correctness.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use textsum_models::{Job, JobStatus};

use crate::error::StoreResult;

/// Cached snapshot of a job's externally visible state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedStatus {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CachedStatus {
    pub fn queued() -> Self {
        Self {
            status: JobStatus::Queued,
            summary: None,
            error_message: None,
        }
    }

    pub fn processing() -> Self {
        Self {
            status: JobStatus::Processing,
            summary: None,
            error_message: None,
        }
    }
}

impl From<&Job> for CachedStatus {
    fn from(job: &Job) -> Self {
        Self {
            status: job.status,
            summary: job.summary.clone(),
            error_message: job.error_message.clone(),
        }
    }
}

/// Low-latency, write-through status cache.
#[async_trait]
pub trait StatusCache: Send + Sync {
    /// Overwrite the cached snapshot for a job.
    async fn set(&self, document_id: &str, entry: &CachedStatus) -> StoreResult<()>;

    /// Fetch the cached snapshot; `None` is a miss, never an error.
    async fn get(&self, document_id: &str) -> StoreResult<Option<CachedStatus>>;
}

/// In-memory cache, used as the injected test double.
#[derive(Debug, Default)]
pub struct MemoryStatusCache {
    entries: RwLock<HashMap<String, CachedStatus>>,
}

impl MemoryStatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry, simulating cache loss.
    pub fn clear(&self) {
        self.entries.write().expect("cache lock poisoned").clear();
    }
}

#[async_trait]
impl StatusCache for MemoryStatusCache {
    async fn set(&self, document_id: &str, entry: &CachedStatus) -> StoreResult<()> {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(document_id.to_string(), entry.clone());
        Ok(())
    }

    async fn get(&self, document_id: &str) -> StoreResult<Option<CachedStatus>> {
        Ok(self
            .entries
            .read()
            .expect("cache lock poisoned")
            .get(document_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = MemoryStatusCache::new();
        assert!(cache.get("doc1").await.unwrap().is_none());

        cache.set("doc1", &CachedStatus::queued()).await.unwrap();
        let entry = cache.get("doc1").await.unwrap().unwrap();
        assert_eq!(entry.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn set_overwrites() {
        let cache = MemoryStatusCache::new();
        cache.set("doc1", &CachedStatus::queued()).await.unwrap();
        cache.set("doc1", &CachedStatus::processing()).await.unwrap();

        let entry = cache.get("doc1").await.unwrap().unwrap();
        assert_eq!(entry.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn snapshot_from_completed_job_carries_summary() {
        let mut job = Job::new("doc1", "hello");
        job.transition(JobStatus::Processing, None, None);
        job.transition(JobStatus::Completed, Some("Hi.".into()), None);

        let entry = CachedStatus::from(&job);
        assert_eq!(entry.status, JobStatus::Completed);
        assert_eq!(entry.summary.as_deref(), Some("Hi."));
        assert!(entry.error_message.is_none());
    }

    #[tokio::test]
    async fn clear_simulates_cache_loss() {
        let cache = MemoryStatusCache::new();
        cache.set("doc1", &CachedStatus::queued()).await.unwrap();
        cache.clear();
        assert!(cache.get("doc1").await.unwrap().is_none());
    }
}
