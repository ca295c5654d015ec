use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the pricing, tax and settlement core.
#[derive(Debug, Error)]
pub enum FundError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl FundError {
    pub fn not_found(what: impl Into<String>) -> Self {
        FundError::NotFound(what.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        FundError::InvalidInput(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        FundError::InvalidState(msg.into())
    }
}

/// HTTP-facing error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<FundError> for AppError {
    fn from(err: FundError) -> Self {
        match err {
            FundError::NotFound(msg) => AppError::NotFound(msg),
            FundError::InvalidInput(msg) => AppError::BadRequest(msg),
            FundError::InvalidState(msg) => AppError::Conflict(msg),
            FundError::Database(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::orchestration::JobError> for AppError {
    fn from(err: crate::orchestration::JobError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
