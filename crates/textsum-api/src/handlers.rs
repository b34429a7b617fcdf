//! Request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use textsum_models::JobStatus;
use textsum_service::Submission;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Submission
// ============================================================================

/// Submission request body. Fields are optional so that a missing field
/// yields a 400 naming it instead of a generic deserialization error.
#[derive(Deserialize)]
pub struct SummarizeRequest {
    pub document_id: Option<String>,
    pub text: Option<String>,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    pub status: JobStatus,
    pub message: String,
    pub document_id: String,
}

/// Submit a document for summarization.
pub async fn summarize(
    State(state): State<AppState>,
    Json(body): Json<SummarizeRequest>,
) -> ApiResult<Json<SummarizeResponse>> {
    let document_id = body
        .document_id
        .ok_or_else(|| ApiError::bad_request("Missing required field: document_id"))?;
    let text = body
        .text
        .ok_or_else(|| ApiError::bad_request("Missing required field: text"))?;

    let outcome = state.service.submit(&document_id, &text).await?;
    info!("Submission for {}: {:?}", document_id, outcome);

    let message = match &outcome {
        Submission::Accepted { .. } => "Summarization queued".to_string(),
        Submission::AlreadyInFlight { status } | Submission::Done { status } => {
            format!("Document with ID {document_id} is already {status}")
        }
    };

    Ok(Json(SummarizeResponse {
        status: outcome.status(),
        message,
        document_id,
    }))
}

// ============================================================================
// Status / result polling
// ============================================================================

#[derive(Serialize)]
pub struct StatusResponse {
    pub document_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Poll the processing status of a document.
pub async fn check_status(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let entry = state.service.status(&document_id).await?;

    let (message, error) = match entry.status {
        JobStatus::Queued => (Some("Document is in queue for processing".to_string()), None),
        JobStatus::Processing => (Some("Document is being processed".to_string()), None),
        JobStatus::Completed => (Some("Document processing is complete".to_string()), None),
        JobStatus::Error => (
            None,
            Some(
                entry
                    .error_message
                    .unwrap_or_else(|| "An unknown error occurred".to_string()),
            ),
        ),
    };

    Ok(Json(StatusResponse {
        document_id,
        status: entry.status,
        message,
        error,
    }))
}

#[derive(Serialize)]
pub struct ResultResponse {
    pub document_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Fetch the summarization result.
pub async fn get_result(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> ApiResult<Json<ResultResponse>> {
    let entry = state.service.result(&document_id).await?;

    let response = match entry.status {
        JobStatus::Completed => {
            let summary = entry.summary.ok_or_else(|| {
                ApiError::internal("Summary not found even though status is completed")
            })?;
            ResultResponse {
                document_id,
                status: JobStatus::Completed,
                summary: Some(summary),
                error: None,
                message: None,
            }
        }
        JobStatus::Error => ResultResponse {
            document_id,
            status: JobStatus::Error,
            summary: None,
            error: Some(
                entry
                    .error_message
                    .unwrap_or_else(|| "An unknown error occurred".to_string()),
            ),
            message: None,
        },
        status => ResultResponse {
            document_id,
            status,
            summary: None,
            error: None,
            message: Some(format!("Document is still in {status} state")),
        },
    };

    Ok(Json(response))
}

// ============================================================================
// Probes
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub queue: CheckStatus,
    pub store: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
        }
    }
}

/// Readiness check endpoint: verifies queue and store connectivity.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let queue_check = match state.queue.len().await {
        Ok(_) => CheckStatus::ok(),
        Err(e) => CheckStatus::error(e.to_string()),
    };

    // NotFound means the store answered; only infrastructure errors count.
    let store_check = match state.store.get("_readiness_probe").await {
        Ok(_) => CheckStatus::ok(),
        Err(e) if e.is_not_found() => CheckStatus::ok(),
        Err(e) => CheckStatus::error(e.to_string()),
    };

    let all_ok = queue_check.status == "ok" && store_check.status == "ok";
    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            queue: queue_check,
            store: store_check,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
