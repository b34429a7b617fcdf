//! In-memory work queue, used as the injected test double.
//!
//! Mirrors the stream semantics: consumed messages stay pending until
//! acked, and idle pending messages can be claimed again, so tests can
//! exercise at-least-once redelivery without Redis.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::QueueResult;
use crate::job::SummarizeJob;
use crate::queue::WorkQueue;

struct Pending {
    job: SummarizeJob,
    delivered_at: Instant,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    ready: VecDeque<(String, SummarizeJob)>,
    pending: HashMap<String, Pending>,
}

/// In-memory queue with pending/ack/claim semantics.
#[derive(Default)]
pub struct MemoryWorkQueue {
    inner: Mutex<Inner>,
}

impl MemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unacked deliveries, for test assertions.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().expect("queue lock poisoned").pending.len()
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn enqueue(&self, job: SummarizeJob) -> QueueResult<String> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        inner.next_id += 1;
        let delivery_id = format!("{}-0", inner.next_id);
        inner.ready.push_back((delivery_id.clone(), job));
        Ok(delivery_id)
    }

    async fn consume(
        &self,
        _consumer_name: &str,
        _block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, SummarizeJob)>> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        let mut jobs = Vec::new();
        while jobs.len() < count {
            let Some((delivery_id, job)) = inner.ready.pop_front() else {
                break;
            };
            inner.pending.insert(
                delivery_id.clone(),
                Pending {
                    job: job.clone(),
                    delivered_at: Instant::now(),
                },
            );
            jobs.push((delivery_id, job));
        }
        Ok(jobs)
    }

    async fn ack(&self, delivery_id: &str) -> QueueResult<()> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        inner.pending.remove(delivery_id);
        Ok(())
    }

    async fn claim_pending(
        &self,
        _consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, SummarizeJob)>> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        let now = Instant::now();
        let mut jobs = Vec::new();
        for (delivery_id, pending) in inner.pending.iter_mut() {
            if jobs.len() >= count {
                break;
            }
            if now.duration_since(pending.delivered_at).as_millis() as u64 >= min_idle_ms {
                pending.delivered_at = now;
                jobs.push((delivery_id.clone(), pending.job.clone()));
            }
        }
        Ok(jobs)
    }

    async fn len(&self) -> QueueResult<u64> {
        let inner = self.inner.lock().expect("queue lock poisoned");
        Ok((inner.ready.len() + inner.pending.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn consume_then_ack_drains_the_queue() {
        let queue = MemoryWorkQueue::new();
        queue.enqueue(SummarizeJob::new("doc1")).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 1);

        let jobs = queue.consume("w1", 0, 5).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].1.document_id, "doc1");
        // Still counted until acked.
        assert_eq!(queue.len().await.unwrap(), 1);

        queue.ack(&jobs[0].0).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 0);
        assert_eq!(queue.pending_len(), 0);
    }

    #[tokio::test]
    async fn unacked_delivery_can_be_claimed() {
        let queue = MemoryWorkQueue::new();
        queue.enqueue(SummarizeJob::new("doc1")).await.unwrap();

        let jobs = queue.consume("w1", 0, 5).await.unwrap();
        assert_eq!(jobs.len(), 1);
        // Consumer dies without acking; another consumer claims it.
        let claimed = queue.claim_pending("w2", 0, 5).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].1.document_id, "doc1");
        assert_eq!(claimed[0].0, jobs[0].0);
    }

    #[tokio::test]
    async fn recent_deliveries_are_not_claimed() {
        let queue = MemoryWorkQueue::new();
        queue.enqueue(SummarizeJob::new("doc1")).await.unwrap();
        queue.consume("w1", 0, 5).await.unwrap();

        let claimed = queue.claim_pending("w2", 60_000, 5).await.unwrap();
        assert!(claimed.is_empty());
    }

    #[tokio::test]
    async fn consume_on_empty_queue_returns_nothing() {
        let queue = MemoryWorkQueue::new();
        let jobs = queue.consume("w1", 0, 5).await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn fifo_is_preserved_best_effort() {
        let queue = MemoryWorkQueue::new();
        for i in 0..3 {
            queue
                .enqueue(SummarizeJob::new(format!("doc{i}")))
                .await
                .unwrap();
        }
        let jobs = queue.consume("w1", 0, 10).await.unwrap();
        let ids: Vec<_> = jobs.iter().map(|(_, j)| j.document_id.as_str()).collect();
        assert_eq!(ids, vec!["doc0", "doc1", "doc2"]);
    }
}
