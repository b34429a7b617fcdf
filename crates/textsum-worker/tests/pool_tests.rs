//! Worker pool integration tests over in-memory capabilities.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use textsum_models::JobStatus;
use textsum_queue::{MemoryWorkQueue, SummarizeJob, WorkQueue};
use textsum_service::JobService;
use textsum_store::{JobStore, MemoryJobStore, MemoryStatusCache};
use textsum_summarizer::{SummarizeResult, Summarizer};
use textsum_worker::{Processor, WorkerConfig, WorkerPool};

struct FixedSummarizer(String);

#[async_trait]
impl Summarizer for FixedSummarizer {
    async fn summarize(&self, _text: &str) -> SummarizeResult<String> {
        Ok(self.0.clone())
    }
}

fn fast_config() -> WorkerConfig {
    WorkerConfig {
        concurrency: 2,
        poll_interval: Duration::from_millis(10),
        consume_block: Duration::from_millis(0),
        claim_interval: Duration::from_millis(20),
        claim_min_idle: Duration::from_millis(0),
        shutdown_timeout: Duration::from_secs(2),
    }
}

async fn wait_for_status(
    store: &Arc<MemoryJobStore>,
    document_id: &str,
    expected: JobStatus,
) -> bool {
    for _ in 0..200 {
        if let Ok(job) = store.get(document_id).await {
            if job.status == expected {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn submitted_job_is_processed_to_completion() {
    let store = Arc::new(MemoryJobStore::new());
    let cache = Arc::new(MemoryStatusCache::new());
    let queue = Arc::new(MemoryWorkQueue::new());

    let service = JobService::new(store.clone(), cache.clone(), queue.clone());
    service.submit("doc1", "hello").await.unwrap();

    let processor = Processor::new(
        store.clone(),
        cache.clone(),
        Arc::new(FixedSummarizer("Hi.".to_string())),
    );
    let pool = Arc::new(WorkerPool::new(fast_config(), queue.clone(), processor));

    let runner = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.run().await })
    };

    assert!(wait_for_status(&store, "doc1", JobStatus::Completed).await);

    let result = service.result("doc1").await.unwrap();
    assert_eq!(result.status, JobStatus::Completed);
    assert_eq!(result.summary.as_deref(), Some("Hi."));

    pool.shutdown();
    runner.await.unwrap();

    // The delivery was acked once the terminal state was persisted.
    assert_eq!(queue.len().await.unwrap(), 0);
}

#[tokio::test]
async fn crashed_delivery_is_reclaimed_and_finished() {
    let store = Arc::new(MemoryJobStore::new());
    let cache = Arc::new(MemoryStatusCache::new());
    let queue = Arc::new(MemoryWorkQueue::new());

    let service = JobService::new(store.clone(), cache.clone(), queue.clone());
    service.submit("doc1", "hello").await.unwrap();

    // Simulate a consumer that died after dequeue, before completion.
    let stuck = queue.consume("dead-worker", 0, 1).await.unwrap();
    assert_eq!(stuck.len(), 1);
    assert_eq!(queue.pending_len(), 1);

    let processor = Processor::new(
        store.clone(),
        cache.clone(),
        Arc::new(FixedSummarizer("Hi.".to_string())),
    );
    let pool = Arc::new(WorkerPool::new(fast_config(), queue.clone(), processor));

    let runner = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.run().await })
    };

    assert!(wait_for_status(&store, "doc1", JobStatus::Completed).await);

    pool.shutdown();
    runner.await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 0);
}

#[tokio::test]
async fn malformed_enqueue_is_dropped_without_record() {
    let store = Arc::new(MemoryJobStore::new());
    let cache = Arc::new(MemoryStatusCache::new());
    let queue = Arc::new(MemoryWorkQueue::new());

    // An id that was never submitted through the service.
    queue.enqueue(SummarizeJob::new("doc-ghost")).await.unwrap();

    let processor = Processor::new(
        store.clone(),
        cache.clone(),
        Arc::new(FixedSummarizer("Hi.".to_string())),
    );
    let pool = Arc::new(WorkerPool::new(fast_config(), queue.clone(), processor));

    let runner = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.run().await })
    };

    // The delivery is acked away and no record appears.
    for _ in 0..200 {
        if queue.len().await.unwrap() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(queue.len().await.unwrap(), 0);
    assert!(store.get("doc-ghost").await.is_err());

    pool.shutdown();
    runner.await.unwrap();
}
