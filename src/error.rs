use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("No account found with this email. Would you like to create one?")]
    AccountNotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::AccountNotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Convert AppError to an HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_message, code) = match &self {
            AppError::Database(_) => ("Database error".to_string(), "database"),
            AppError::Internal(_) => ("Internal server error".to_string(), "internal"),
            AppError::Auth(_) => (self.to_string(), "auth"),
            AppError::AccountNotFound => (self.to_string(), "account_not_found"),
            AppError::Forbidden(_) => (self.to_string(), "forbidden"),
            AppError::NotFound(_) => (self.to_string(), "not_found"),
            AppError::Validation(_) => (self.to_string(), "validation"),
            AppError::Conflict(_) => (self.to_string(), "conflict"),
        };

        if status.is_server_error() {
            tracing::error!(?self);
        } else {
            tracing::debug!(?self);
        }

        let body = Json(ErrorResponse {
            error: error_message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type Result<T> = std::result::Result<T, AppError>;
