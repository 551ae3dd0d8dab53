use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::models::document::DocumentFormat;
use crate::refine::template::TemplateId;

/// Every extraction strategy for the document failed (or timed out).
#[derive(Debug, Error)]
#[error("failed to extract text from {format} document: {cause}")]
pub struct ExtractionError {
    pub format: DocumentFormat,
    pub cause: String,
}

/// Invalid chunking or template configuration. Raised before any processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("chunk_size must be greater than zero")]
    ChunkSizeZero,

    #[error("chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})")]
    OverlapTooLarge {
        chunk_size: usize,
        chunk_overlap: usize,
    },

    #[error("{template} template does not accept placeholder '{placeholder}'")]
    UnknownPlaceholder {
        template: TemplateId,
        placeholder: String,
    },

    #[error("{template} template has an unterminated placeholder at byte {position}")]
    UnterminatedPlaceholder { template: TemplateId, position: usize },

    #[error("{template} template has an unmatched '}}' at byte {position}")]
    UnmatchedClosingBrace { template: TemplateId, position: usize },

    #[error("no value supplied for placeholder '{placeholder}' in {template} template")]
    MissingValue {
        template: TemplateId,
        placeholder: String,
    },
}

/// Why a single refine step could not produce an answer.
#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("prompt rendering failed: {0}")]
    Prompt(#[from] ConfigurationError),
}

impl GenerationFailure {
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationFailure::Timeout(_) => true,
            GenerationFailure::Llm(e) => e.is_retryable(),
            GenerationFailure::Prompt(_) => false,
        }
    }
}

/// The refine chain stopped at `segment_index`. `partial_steps` holds the
/// answers produced for segments `0..segment_index`.
#[derive(Debug, Error)]
#[error("generation failed at segment {segment_index} after {attempts} attempt(s): {cause}")]
pub struct GenerationError {
    pub segment_index: usize,
    pub attempts: u32,
    pub partial_steps: Vec<String>,
    #[source]
    pub cause: GenerationFailure,
}

/// Errors surfaced by a full analysis run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Extraction(e) => AppError::Extraction(e),
            PipelineError::Generation(e) => AppError::Generation(e),
            PipelineError::Task(e) => AppError::Internal(e.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut details: Option<Value> = None;

        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                msg.clone(),
            ),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Extraction(e) => {
                tracing::warn!("Extraction error: {e}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "EXTRACTION_ERROR",
                    format!("Could not read the uploaded {} document", e.format),
                )
            }
            AppError::Generation(e) => {
                tracing::error!("Generation error: {e}");
                details = Some(json!({
                    "segment_index": e.segment_index,
                    "attempts": e.attempts,
                    "partial_steps": e.partial_steps,
                }));
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_ERROR",
                    format!("Analysis stopped at segment {}", e.segment_index),
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

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
