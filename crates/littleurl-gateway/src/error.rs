use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use littleurl_core::ServiceError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Service(ServiceError::Validation(_)) => "validation_error",
            Self::Service(ServiceError::NotFound) => "not_found",
            Self::Service(ServiceError::CreateFailed(_)) => "create_failed",
            Self::Service(ServiceError::Storage(_)) => "storage_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Service(ServiceError::Validation(_)) => StatusCode::BAD_REQUEST,
            // Creation failures surface as 404, like a missing record.
            Self::Service(ServiceError::NotFound | ServiceError::CreateFailed(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Service(ServiceError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
