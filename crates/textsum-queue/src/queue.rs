//! Work queue trait and the Redis Streams implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::SummarizeJob;

/// At-least-once delivery channel for pending jobs.
///
/// A dequeued message may be redelivered (crash after dequeue, before
/// ack); consumers must tolerate reprocessing. FIFO is best effort,
/// not a correctness property.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Add a message; returns the delivery id.
    async fn enqueue(&self, job: SummarizeJob) -> QueueResult<String>;

    /// Consume up to `count` new messages, blocking up to `block_ms`.
    async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, SummarizeJob)>>;

    /// Acknowledge a delivery, removing it from the pending set.
    async fn ack(&self, delivery_id: &str) -> QueueResult<()>;

    /// Claim deliveries stuck with crashed consumers for at least
    /// `min_idle_ms`.
    async fn claim_pending(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, SummarizeJob)>>;

    /// Number of messages currently in the queue.
    async fn len(&self) -> QueueResult<u64>;
}

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Delivery visibility timeout before another consumer may claim it
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "textsum:jobs".to_string(),
            consumer_group: "textsum:workers".to_string(),
            visibility_timeout: Duration::from_secs(300),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: std::env::var("QUEUE_STREAM")
                .unwrap_or_else(|_| "textsum:jobs".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "textsum:workers".to_string()),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        }
    }
}

/// Work queue backed by a Redis Stream with a consumer group.
pub struct RedisWorkQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl RedisWorkQueue {
    /// Create a new queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    // XCLAIM wants explicit ids from a prior XPENDING; XAUTOCLAIM scans
    // the pending range itself, which is what a periodic reclaim needs.
    fn autoclaim_cmd(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> redis::Cmd {
        let mut cmd = redis::cmd("XAUTOCLAIM");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms)
            .arg("0-0")
            .arg("COUNT")
            .arg(count);
        cmd
    }

    fn parse_entry(
        &self,
        entry: &redis::streams::StreamId,
    ) -> Option<(String, SummarizeJob)> {
        let delivery_id = entry.id.clone();
        if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
            let payload_str = String::from_utf8_lossy(payload);
            match serde_json::from_str::<SummarizeJob>(&payload_str) {
                Ok(job) => return Some((delivery_id, job)),
                Err(e) => {
                    warn!("Failed to parse job payload {}: {}", delivery_id, e);
                }
            }
        }
        None
    }
}

#[async_trait]
impl WorkQueue for RedisWorkQueue {
    async fn enqueue(&self, job: SummarizeJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(&job)?;
        let delivery_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        info!(
            "Enqueued job {} with delivery ID {}",
            job.document_id, delivery_id
        );
        Ok(delivery_id)
    }

    async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, SummarizeJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">") // Only new messages
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();
        for stream_key in result.keys {
            for entry in stream_key.ids {
                match self.parse_entry(&entry) {
                    Some((delivery_id, job)) => {
                        debug!("Consumed job {} from stream", job.document_id);
                        jobs.push((delivery_id, job));
                    }
                    None => {
                        // Ack the malformed message to prevent reprocessing
                        self.ack(&entry.id).await.ok();
                    }
                }
            }
        }

        Ok(jobs)
    }

    async fn ack(&self, delivery_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(delivery_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(delivery_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged delivery: {}", delivery_id);
        Ok(())
    }

    async fn claim_pending(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, SummarizeJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamAutoClaimReply = self
            .autoclaim_cmd(consumer_name, min_idle_ms, count)
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();
        for entry in result.claimed {
            match self.parse_entry(&entry) {
                Some((delivery_id, job)) => {
                    info!("Claimed pending job {} from stream", job.document_id);
                    jobs.push((delivery_id, job));
                }
                None => {
                    self.ack(&entry.id).await.ok();
                }
            }
        }

        Ok(jobs)
    }

    async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }
}
