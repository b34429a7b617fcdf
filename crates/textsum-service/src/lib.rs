//! Job service facade.
//!
//! Validates submissions, performs idempotent enqueue against the
//! store's atomic create, and answers status/result queries by
//! consulting the cache with a store fallback. Transports (HTTP, CLI)
//! sit on top of this crate and stay thin.

pub mod error;
pub mod service;

pub use error::{ServiceError, ServiceResult};
pub use service::{JobService, Submission};
