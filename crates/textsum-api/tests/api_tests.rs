//! API integration tests over in-memory capabilities.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use textsum_api::{create_router, ApiConfig, AppState};
use textsum_models::JobStatus;
use textsum_queue::{MemoryWorkQueue, WorkQueue};
use textsum_store::{
    CachedStatus, JobStore, MemoryJobStore, MemoryStatusCache, StatusCache, StoreResult,
};

struct TestApp {
    app: Router,
    store: Arc<MemoryJobStore>,
    queue: Arc<MemoryWorkQueue>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryJobStore::new());
    let cache = Arc::new(MemoryStatusCache::new());
    let queue = Arc::new(MemoryWorkQueue::new());
    let state = AppState::with_capabilities(
        ApiConfig::default(),
        store.clone(),
        cache,
        queue.clone(),
    );
    TestApp {
        app: create_router(state),
        store,
        queue,
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn submit_then_poll_then_fetch_result() {
    let t = test_app();

    // Submit.
    let response = t
        .app
        .clone()
        .oneshot(post_json(
            "/summarize",
            json!({"document_id": "doc1", "text": "hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "queued");
    assert_eq!(body["document_id"], "doc1");

    // Status before processing completes is queued or processing.
    let response = t.app.clone().oneshot(get("/check-status/doc1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["status"] == "queued" || body["status"] == "processing");

    // Worker finishes the job out of band.
    t.store
        .update_status("doc1", JobStatus::Processing, None, None)
        .await
        .unwrap();
    t.store
        .update_status("doc1", JobStatus::Completed, Some("Hi.".to_string()), None)
        .await
        .unwrap();

    // Result carries the summary verbatim.
    let response = t.app.clone().oneshot(get("/result/doc1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["document_id"], "doc1");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["summary"], "Hi.");
}

#[tokio::test]
async fn missing_text_is_a_400_naming_the_field() {
    let t = test_app();

    let response = t
        .app
        .clone()
        .oneshot(post_json("/summarize", json!({"document_id": "doc2"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("text"));

    // No record was created.
    assert!(t.store.is_empty());
}

#[tokio::test]
async fn unknown_document_is_a_404() {
    let t = test_app();

    let response = t
        .app
        .clone()
        .oneshot(get("/check-status/doc-unknown"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t.app.clone().oneshot(get("/result/doc-unknown")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_submission_reports_current_status_without_requeue() {
    let t = test_app();

    for _ in 0..2 {
        let response = t
            .app
            .clone()
            .oneshot(post_json(
                "/summarize",
                json!({"document_id": "doc1", "text": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "queued");
    }

    assert_eq!(t.store.len(), 1);
    assert_eq!(t.queue.len().await.unwrap(), 1);
}

#[tokio::test]
async fn failed_job_result_carries_the_error() {
    let t = test_app();
    t.app
        .clone()
        .oneshot(post_json(
            "/summarize",
            json!({"document_id": "doc1", "text": "hello"}),
        ))
        .await
        .unwrap();

    t.store
        .update_status("doc1", JobStatus::Processing, None, None)
        .await
        .unwrap();
    t.store
        .update_status(
            "doc1",
            JobStatus::Error,
            None,
            Some("Summarization failed after 3 attempts: status 503".to_string()),
        )
        .await
        .unwrap();

    let response = t.app.clone().oneshot(get("/result/doc1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("3 attempts"));
    assert!(body.get("summary").is_none());
}

struct SlowCache;

#[async_trait]
impl StatusCache for SlowCache {
    async fn set(&self, _document_id: &str, _entry: &CachedStatus) -> StoreResult<()> {
        Ok(())
    }

    async fn get(&self, _document_id: &str) -> StoreResult<Option<CachedStatus>> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(None)
    }
}

#[tokio::test]
async fn slow_backend_hits_the_request_timeout() {
    let config = ApiConfig {
        request_timeout: Duration::from_millis(50),
        ..ApiConfig::default()
    };
    let state = AppState::with_capabilities(
        config,
        Arc::new(MemoryJobStore::new()),
        Arc::new(SlowCache),
        Arc::new(MemoryWorkQueue::new()),
    );
    let app = create_router(state);

    let response = app.oneshot(get("/check-status/doc1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn health_and_ready_probes() {
    let t = test_app();

    let response = t.app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");

    let response = t.app.clone().oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ready");
}
