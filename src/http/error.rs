use crate::error::AppError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

/// Error body returned by every endpoint: `{ "error": kind, "message": text }`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    NotFound(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::App(app) => match app {
                AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                AppError::Inference(_) => (StatusCode::INTERNAL_SERVER_ERROR, "inference_error"),
                AppError::Dependency(_) => (StatusCode::BAD_GATEWAY, "dependency_error"),
                AppError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
                AppError::Config(_)
                | AppError::Pipeline(_)
                | AppError::Store(_)
                | AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
        }
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        ApiError::App(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.parts();
        if status.is_server_error() {
            error!("Request failed with {}: {:?}", status, self);
        }

        let message = match self {
            ApiError::App(app) => app.to_string(),
            ApiError::NotFound(message) => message,
        };
        (
            status,
            Json(ErrorBody {
                error: kind,
                message,
            }),
        )
            .into_response()
    }
}
