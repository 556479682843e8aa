use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Failures surfaced by the HTTP API.
///
/// Ownership and existence are never distinguished: a task owned by someone
/// else is reported exactly like a task that does not exist.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password must be at least 6 characters")]
    WeakPassword,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("User not found")]
    UserNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Server error")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn task_not_found() -> Self {
        AppError::NotFound("Task not found".into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DuplicateEmail
            | AppError::InvalidCredentials
            | AppError::WeakPassword
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) | AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(ref e) = self {
            error!(error = %e, "internal error");
        }
        let status = self.status_code();
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// JSON body extractor whose rejection renders as a `Validation` error.
#[derive(axum::extract::FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
