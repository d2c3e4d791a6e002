use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::evaluation::bulk::BulkInputError;
use crate::evaluation::service::PipelineError;
use crate::llm_client::ModelError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bulk input error: {0}")]
    BulkInput(#[from] BulkInputError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Validation(format!("invalid multipart body: {}", e.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut stage = None;
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::BulkInput(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "BULK_INPUT_ERROR",
                e.to_string(),
            ),
            AppError::Pipeline(e) => {
                stage = Some(e.stage());
                match e {
                    PipelineError::InvalidRequest(msg) => {
                        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                    }
                    PipelineError::Extraction(inner) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "EXTRACTION_ERROR",
                        inner.to_string(),
                    ),
                    PipelineError::Model(inner) => {
                        tracing::error!("Model error: {inner}");
                        let status = match inner {
                            ModelError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                            _ => StatusCode::BAD_GATEWAY,
                        };
                        (
                            status,
                            "MODEL_ERROR",
                            "The language model could not be reached".to_string(),
                        )
                    }
                    PipelineError::Parse(inner) => {
                        tracing::error!("Model output rejected: {inner}");
                        (
                            StatusCode::BAD_GATEWAY,
                            "MODEL_OUTPUT_INVALID",
                            format!("The language model returned an unusable answer: {inner}"),
                        )
                    }
                }
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

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(stage) = stage {
            error["stage"] = json!(stage);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
