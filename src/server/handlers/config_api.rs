//! Runtime configuration handlers.

use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use serde_json::Value;

use super::super::AppState;
use super::error::ApiError;

pub async fn api_get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.runtime.snapshot())
}

/// Partial update. Valid fields are committed even when others are rejected.
pub async fn api_update_config(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?;
    let Value::Object(update) = value else {
        return Err(ApiError::BadRequest(
            "request body must be a JSON object".to_string(),
        ));
    };

    let report = state.runtime.apply(&update);
    if !report.is_ok() {
        return Err(ApiError::Validation(report));
    }
    Ok(Json(report.config))
}
