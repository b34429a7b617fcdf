//! Client for the external summarization service.
//!
//! Wraps a chat-completion style HTTP endpoint with per-attempt
//! timeouts and exponential backoff. Transient failures (network
//! errors, 5xx, 429) are retried; a malformed response shape fails
//! immediately without retrying.

pub mod client;
pub mod error;

pub use client::{HttpSummarizer, Summarizer, SummarizerConfig};
pub use error::{SummarizeError, SummarizeResult};
