//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use kbatlas_types::error::BuilderError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Builder(BuilderError),
    /// Missing or malformed caller identity.
    Unauthorized(String),
    /// Malformed path or body input.
    Validation(String),
}

impl From<BuilderError> for AppError {
    fn from(e: BuilderError) -> Self {
        AppError::Builder(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String, Option<serde_json::Value>) {
        match self {
            AppError::Builder(BuilderError::NotFound) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found".to_string(),
                None,
            ),
            AppError::Builder(BuilderError::InvalidState(msg)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_STATE",
                msg.clone(),
                None,
            ),
            AppError::Builder(e @ BuilderError::Conflict { expected, actual }) => (
                StatusCode::CONFLICT,
                "VERSION_CONFLICT",
                e.to_string(),
                Some(json!({ "expected_version": expected, "actual_version": actual })),
            ),
            AppError::Builder(BuilderError::DeploymentFailed(msg)) => (
                StatusCode::BAD_GATEWAY,
                "DEPLOYMENT_FAILED",
                msg.clone(),
                None,
            ),
            AppError::Builder(e @ BuilderError::Persistence(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_ERROR",
                e.to_string(),
                None,
            ),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, %message, "Request failed");
        }
        (status, Json(ApiResponse::error(code, message, details))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_errors_map_to_statuses() {
        let cases = [
            (BuilderError::NotFound, StatusCode::NOT_FOUND),
            (
                BuilderError::InvalidState("deployed".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                BuilderError::Conflict {
                    expected: 1,
                    actual: 2,
                },
                StatusCode::CONFLICT,
            ),
            (
                BuilderError::DeploymentFailed("boom".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                BuilderError::Persistence("disk".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
