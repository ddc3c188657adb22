use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rail_core::CoreError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    CapacityExceeded { message: String, remaining: i32 },
    RateLimited,
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut remaining = None;
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::CapacityExceeded { message, remaining: left } => {
                remaining = Some(left);
                (StatusCode::CONFLICT, message)
            }
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".to_string()),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = match remaining {
            Some(remaining) => json!({ "success": false, "error": error_message, "remaining": remaining }),
            None => json!({ "success": false, "error": error_message }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => AppError::NotFoundError(msg),
            CoreError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            CoreError::CapacityExceeded { remaining, .. } => AppError::CapacityExceeded {
                message: err.to_string(),
                remaining,
            },
            CoreError::Forbidden(msg) => AppError::AuthorizationError(msg),
            CoreError::Storage(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
