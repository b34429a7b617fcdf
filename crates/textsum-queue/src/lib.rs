//! Work queue for summarization jobs.
//!
//! This crate provides:
//! - The `WorkQueue` capability: at-least-once handoff of pending job
//!   ids from submission to workers
//! - A Redis Streams implementation (consumer group, ack, pending-claim
//!   for crash recovery)
//! - An in-memory test double with the same delivery semantics

pub mod error;
pub mod job;
pub mod memory;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::SummarizeJob;
pub use memory::MemoryWorkQueue;
pub use queue::{QueueConfig, RedisWorkQueue, WorkQueue};
