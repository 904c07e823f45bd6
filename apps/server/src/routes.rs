//! HTTP handlers.

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use refundlens_core::{RefundReturn, StorageError};
use refundlens_orchestrator::ExplanationRequest;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::AppState;
use crate::error::ApiError;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "refundlens" }))
}

/// `GET /v1/status/:id`
pub async fn get_status(
    State(state): State<AppState>,
    Path(return_id): Path<String>,
) -> Result<Json<RefundReturn>, ApiError> {
    match state.store.get_return(&return_id).await {
        Ok(record) => Ok(Json(record)),
        Err(StorageError::NotFound(_)) => Err(ApiError::NotFound),
        Err(e) => {
            error!(return_id = %return_id, error = %e, "Failed to load filing");
            Err(ApiError::Internal("failed to load filing"))
        }
    }
}

/// `GET /v1/status/explain` shadows the `:id` route; no filing carries that id.
pub async fn explain_lookup() -> ApiError {
    ApiError::NotFound
}

/// `POST /v1/status/explain`
///
/// The body is parsed leniently so a missing or malformed body still yields a
/// stream with default values.
pub async fn explain(State(state): State<AppState>, body: Bytes) -> Response {
    let request = ExplanationRequest::from_json_lenient(&body);
    let stream = state.orchestrator.stream_sse(request);

    let mut response = Body::from_stream(stream).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

/// `POST /internal/scrape`
pub async fn insert_demo(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.store.insert_demo_return().await {
        Ok(return_id) => {
            info!(return_id = %return_id, "Inserted demo filing on request");
            Ok(Json(json!({ "message": "demo data inserted", "return_id": return_id })))
        }
        Err(e) => {
            error!(error = %e, "Failed to insert demo filing");
            Err(ApiError::Internal("failed to insert demo data"))
        }
    }
}
