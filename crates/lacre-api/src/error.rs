//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`EngineError`] to HTTP status codes and JSON bodies of the form
//! `{ "error": { "code", "message", "details"? } }`. Store failures are
//! logged with the operation name and never shown to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use lacre_engine::EngineError;
use lacre_state::SealLifecycleError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for some client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or query could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid bearer token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict with the current seal or lot state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Lot destruction refused by the guard (409). Carries the held count.
    #[error("{message}")]
    GuardViolation { message: String, lot: String, held: u64 },

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::GuardViolation { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if let Self::Internal(_) = &self {
            tracing::error!(error = %self, "internal server error");
        }

        let details = match &self {
            Self::GuardViolation { lot, held, .. } => {
                Some(serde_json::json!({ "lot_number": lot, "held": held }))
            }
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<lacre_core::ValidationError> for AppError {
    fn from(err: lacre_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::Validation(msg) => Self::Validation(msg),
            EngineError::NotFound(what) => Self::NotFound(what),
            EngineError::Lifecycle(SealLifecycleError::MissingDestructionReason) => {
                Self::Validation(message)
            }
            EngineError::Lifecycle(_) | EngineError::Stale(_) => Self::Conflict(message),
            EngineError::Conflict(msg) => Self::Conflict(msg),
            EngineError::GuardViolation { lot, held } => Self::GuardViolation { message, lot, held },
            EngineError::Store { .. } => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use lacre_core::{SealId, SealStatus};
    use lacre_engine::StoreError;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                AppError::Validation("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
            ),
            (
                AppError::BadRequest("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "BAD_REQUEST",
            ),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT, "CONFLICT"),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code), "{err}");
        }
    }

    #[test]
    fn engine_errors_map_to_http_classes() {
        let validation = AppError::from(EngineError::Validation("bad".into()));
        assert!(matches!(validation, AppError::Validation(_)));

        let final_state = AppError::from(EngineError::Lifecycle(SealLifecycleError::FinalState {
            state: SealStatus::Used,
        }));
        assert!(matches!(final_state, AppError::Conflict(_)));

        let missing_reason =
            AppError::from(EngineError::Lifecycle(SealLifecycleError::MissingDestructionReason));
        assert!(matches!(missing_reason, AppError::Validation(_)));

        let stale = AppError::from(EngineError::Stale(SealId(4)));
        assert!(matches!(stale, AppError::Conflict(msg) if msg.contains("seal:4")));

        let store = AppError::from(EngineError::Store {
            operation: "destroy_lot",
            source: StoreError::Database("timeout".into()),
        });
        assert!(matches!(store, AppError::Internal(msg) if msg.contains("destroy_lot")));
    }

    #[tokio::test]
    async fn guard_violation_carries_details() {
        let err = AppError::from(EngineError::GuardViolation {
            lot: "L1".into(),
            held: 10,
        });
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error.code, "CONFLICT");
        assert!(body.error.message.contains("L1"));
        let details = body.error.details.unwrap();
        assert_eq!(details["held"], 10);
        assert_eq!(details["lot_number"], "L1");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let err = AppError::from(EngineError::Store {
            operation: "generate",
            source: StoreError::Database("password authentication failed".into()),
        });
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn not_found_body() {
        let (status, body) = response_parts(AppError::NotFound("seal:9".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.error.message.contains("seal:9"));
        assert!(body.error.details.is_none());
    }
}
