//! JSON error responses.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::runtime::{RuntimeConfig, UpdateReport};

/// Errors returned by API handlers as `{"error": ...}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    /// Some config fields were rejected; the rest were committed.
    #[error("invalid configuration")]
    Validation(UpdateReport),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct ValidationBody {
    error: String,
    rejected: BTreeMap<String, String>,
    config: RuntimeConfig,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorBody { error: message })).into_response()
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message })).into_response()
            }
            ApiError::Validation(report) => {
                let body = ValidationBody {
                    error: report
                        .error_message()
                        .unwrap_or_else(|| "invalid configuration".to_string()),
                    rejected: report.rejected,
                    config: report.config,
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
        }
    }
}
