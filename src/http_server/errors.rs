//! HTTP error mapping
//!
//! Every failing handler returns [`ApiError`], rendered as
//! `{"error": <message>, "code": <status>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::grading::GradingError;
use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Grading(#[from] GradingError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Caller's role is allowed on the route but not on this resource
    #[error("{0}")]
    Forbidden(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        let code = match self {
            ApiError::Auth(e) => e.status_code(),
            ApiError::Store(e) => e.status_code(),
            ApiError::Grading(e) => e.status_code(),
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Forbidden(_) => 403,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
            match self {
                // Storage details stay in the log
                ApiError::Store(_) | ApiError::Auth(AuthError::StorageError(_)) => {
                    "Internal server error".to_string()
                }
                other => other.to_string(),
            }
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
            self.to_string()
        };

        let body = ErrorResponse {
            error: message,
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
