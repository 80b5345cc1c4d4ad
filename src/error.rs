//! Error types shared by the extraction core and the HTTP shell.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// No page contains the marker for this question and no manual range
    /// was supplied.
    #[error("question #{0} not found in document")]
    QuestionNotFound(u32),

    /// A manual page range failed bounds or ordering checks.
    #[error("invalid page range: {0}")]
    InvalidRange(String),

    /// The extraction backend is not configured. Configuration error,
    /// not transient.
    #[error("extraction service is not configured")]
    ServiceUnavailable,

    /// The model reply could not be parsed even after the repair attempt.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// Referenced PDF, catalog file or cache path is absent.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("pdf error: {0}")]
    Pdf(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::QuestionNotFound(_) => (StatusCode::NOT_FOUND, "question_not_found"),
            AppError::InvalidRange(_) => (StatusCode::BAD_REQUEST, "invalid_range"),
            AppError::ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
            AppError::ExtractionFailed(_) => (StatusCode::BAD_GATEWAY, "extraction_failed"),
            AppError::ResourceNotFound(_) => (StatusCode::NOT_FOUND, "resource_not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Pdf(_) => (StatusCode::INTERNAL_SERVER_ERROR, "pdf_error"),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!("{}: {}", error, self);
        }

        let body = ErrorBody {
            error,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
