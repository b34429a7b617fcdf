//! HTTP API for the summarization pipeline.
//!
//! A thin axum transport over the job service: submission, status and
//! result polling, liveness and readiness probes.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
