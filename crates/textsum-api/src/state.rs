//! Application state.

use std::sync::Arc;

use textsum_queue::{RedisWorkQueue, WorkQueue};
use textsum_service::JobService;
use textsum_store::{JobStore, RedisJobStore, RedisStatusCache, StatusCache};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub service: JobService,
    pub store: Arc<dyn JobStore>,
    pub queue: Arc<dyn WorkQueue>,
}

impl AppState {
    /// Create state with injected capabilities (tests pass the in-memory
    /// implementations).
    pub fn with_capabilities(
        config: ApiConfig,
        store: Arc<dyn JobStore>,
        cache: Arc<dyn StatusCache>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        let service = JobService::new(Arc::clone(&store), cache, Arc::clone(&queue));
        Self {
            config,
            service,
            store,
            queue,
        }
    }

    /// Create state with the Redis-backed capabilities from the
    /// environment.
    pub async fn from_env(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store: Arc<dyn JobStore> = Arc::new(RedisJobStore::from_env()?);
        let cache: Arc<dyn StatusCache> = Arc::new(RedisStatusCache::from_env()?);

        let queue = RedisWorkQueue::from_env()?;
        queue.init().await?;
        let queue: Arc<dyn WorkQueue> = Arc::new(queue);

        Ok(Self::with_capabilities(config, store, cache, queue))
    }
}
