//! Redis-backed status cache.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use crate::cache::{CachedStatus, StatusCache};
use crate::error::StoreResult;

const STATUS_KEY_PREFIX: &str = "textsum:status:";

/// Status cache backed by plain Redis string values with a TTL.
pub struct RedisStatusCache {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisStatusCache {
    /// Create a new cache for the given Redis URL.
    pub fn new(redis_url: &str, ttl_secs: u64) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client, ttl_secs })
    }

    /// Create from environment variables (`REDIS_URL`, `STATUS_CACHE_TTL_SECS`).
    pub fn from_env() -> StoreResult<Self> {
        let url = std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let ttl_secs = std::env::var("STATUS_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);
        Self::new(&url, ttl_secs)
    }

    fn status_key(document_id: &str) -> String {
        format!("{STATUS_KEY_PREFIX}{document_id}")
    }
}

#[async_trait]
impl StatusCache for RedisStatusCache {
    async fn set(&self, document_id: &str, entry: &CachedStatus) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(entry)?;
        conn.set_ex::<_, _, ()>(Self::status_key(document_id), payload, self.ttl_secs)
            .await?;
        debug!("Cached status for {}: {}", document_id, entry.status);
        Ok(())
    }

    async fn get(&self, document_id: &str) -> StoreResult<Option<CachedStatus>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(Self::status_key(document_id)).await?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
