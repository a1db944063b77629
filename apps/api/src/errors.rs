use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::resume::assembler::PromptError;
use crate::resume::export::ExportError;
use crate::resume::extract::DocumentError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Upload too large: {0}")]
    UploadTooLarge(String),

    #[error("Prompt too long: {0}")]
    PromptTooLong(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Error: {status} - {body}")]
    ProviderHttp { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider timed out: {0}")]
    Timeout(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http { status, body } => AppError::ProviderHttp { status, body },
            LlmError::Transport(msg) => AppError::Transport(msg),
            LlmError::Timeout(msg) => AppError::Timeout(msg),
            LlmError::MissingApiKey { .. } | LlmError::NotConfigured(_) => {
                AppError::Configuration(err.to_string())
            }
            LlmError::Parse(_) | LlmError::EmptyContent => AppError::Llm(err.to_string()),
        }
    }
}

impl From<PromptError> for AppError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::TooLong { .. } => AppError::PromptTooLong(err.to_string()),
            PromptError::EmptyResume => AppError::UnprocessableEntity(err.to_string()),
            PromptError::EmptyQuestion | PromptError::EmptyRole => {
                AppError::Validation(err.to_string())
            }
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Document(e) => {
                tracing::warn!("Rejected upload: {e}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "DOCUMENT_ERROR",
                    e.to_string(),
                )
            }
            AppError::UploadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "UPLOAD_TOO_LARGE",
                msg.clone(),
            ),
            AppError::PromptTooLong(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PROMPT_TOO_LONG",
                msg.clone(),
            ),
            AppError::Configuration(msg) => {
                tracing::warn!("Configuration error: {msg}");
                (StatusCode::BAD_REQUEST, "CONFIGURATION_ERROR", msg.clone())
            }
            // Provider failures are shown to the user verbatim, status and body included.
            AppError::ProviderHttp { status, body } => {
                tracing::error!("Inference provider returned {status}: {body}");
                (
                    StatusCode::BAD_GATEWAY,
                    "PROVIDER_HTTP_ERROR",
                    format!("Error: {status} - {body}"),
                )
            }
            AppError::Transport(msg) => {
                tracing::error!("Inference transport error: {msg}");
                (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR", msg.clone())
            }
            AppError::Timeout(msg) => {
                tracing::error!("Inference request timed out: {msg}");
                (StatusCode::GATEWAY_TIMEOUT, "TRANSPORT_ERROR", msg.clone())
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (StatusCode::BAD_GATEWAY, "LLM_ERROR", msg.clone())
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
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
