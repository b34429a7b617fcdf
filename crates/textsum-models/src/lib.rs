//! Domain types for the summarization pipeline.

pub mod job;
pub mod job_status;

pub use job::Job;
pub use job_status::JobStatus;
