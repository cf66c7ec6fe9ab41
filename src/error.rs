use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::blog::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::NotFound => json!({ "error": "Resource not found" }),
            AppError::Validation(errors) => json!({
                "errors": errors.full_messages(),
                "details": errors,
            }),
            AppError::Conflict(msg) | AppError::BadRequest(msg) => json!({ "error": msg }),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                json!({ "error": "Internal server error" })
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                json!({ "error": "Internal server error" })
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                json!({ "error": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
