//! Durable job store and status cache.
//!
//! This crate provides:
//! - The `JobStore` capability: the authoritative record of a job,
//!   with atomic creation and guarded status transitions
//! - The `StatusCache` capability: a fast, non-authoritative read path
//! - Redis-backed implementations and in-memory test doubles

pub mod cache;
pub mod error;
pub mod redis_cache;
pub mod redis_store;
pub mod store;

pub use cache::{CachedStatus, MemoryStatusCache, StatusCache};
pub use error::{StoreError, StoreResult};
pub use redis_cache::RedisStatusCache;
pub use redis_store::RedisJobStore;
pub use store::{JobStore, MemoryJobStore};
