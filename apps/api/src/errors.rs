use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::form::extract::ExtractError;
use crate::llm_client::LlmError;
use crate::session::SessionError;
use crate::session::agent::VoiceError;
use crate::store::StoreError;

/// Per-field validation messages keyed by the client-facing field name.
pub type FieldErrors = BTreeMap<String, String>;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Response bodies carry a fixed `code` and a sanitized `message`; the
/// underlying detail is only written to the server log.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid form submission")]
    InvalidForm(FieldErrors),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Voice agent error: {0}")]
    Voice(#[from] VoiceError),

    #[error("Resume extraction error: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Service busy: {0}")]
    Busy(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => AppError::NotFound(format!("Call session {id} not found")),
            SessionError::AlreadyInProgress => {
                AppError::Conflict("A call is already in progress for this session".to_string())
            }
            SessionError::CapacityReached(max) => {
                AppError::Busy(format!("Maximum of {max} call sessions reached"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InvalidForm(fields) => {
                let body = Json(json!({
                    "success": false,
                    "error": {
                        "code": "VALIDATION_ERROR",
                        "message": "One or more fields are invalid",
                        "fields": fields,
                    }
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Llm(LlmError::Parse(e)) => {
                tracing::error!("Model output could not be parsed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MALFORMED_MODEL_OUTPUT",
                    "The AI response was not in the expected format".to_string(),
                )
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Voice(e) => {
                tracing::error!("Voice agent error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "VOICE_AGENT_ERROR",
                    "The voice agent could not be reached".to_string(),
                )
            }
            AppError::Extraction(e) => {
                tracing::warn!("Resume extraction failed: {e}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "RESUME_UNREADABLE",
                    "The resume could not be read".to_string(),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_FAILED",
                    "Failed to generate interview questions".to_string(),
                )
            }
            AppError::Busy(msg) => {
                tracing::warn!("Rejected request: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_BUSY",
                    "Too many calls are in progress, try again later".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
