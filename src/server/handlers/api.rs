//! Stock and status API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::super::AppState;
use super::error::ApiError;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Latest result, update time and in-progress flag for every SKU.
pub async fn api_stock(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.cache.snapshot())
}

/// Start a full refresh in the background.
pub async fn api_refresh_all(State(state): State<AppState>) -> impl IntoResponse {
    state.scheduler.trigger_batch();
    (StatusCode::ACCEPTED, Json(json!({ "status": "refreshing" })))
}

/// Start a refresh of one SKU, addressed by display name or part code.
pub async fn api_refresh_one(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .scheduler
        .trigger_one(&sku)
        .map_err(|_| ApiError::NotFound("Model not found".to_string()))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "refreshing", "model": entry.name })),
    ))
}

pub async fn api_proxy_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.runtime.snapshot().proxy_status())
}
