//! Worker pool for the summarization pipeline.
//!
//! A fixed number of consumers pull job ids from the work queue, drive
//! each job through `Queued -> Processing -> Completed | Error`, call
//! the external summarizer, and persist results to the store and cache.

pub mod config;
pub mod pool;
pub mod processor;

pub use config::WorkerConfig;
pub use pool::WorkerPool;
pub use processor::{ProcessOutcome, Processor};
