//! HTTP error types returned by the storefront server

#[cfg(feature = "server")]
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP-specific errors
#[derive(Error, Debug)]
pub enum HttpError {
    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The backend failed or answered with something unusable
    #[error("Upstream error: {0}")]
    Upstream(String),
}

#[cfg(feature = "client")]
impl From<crate::client::ClientError> for HttpError {
    fn from(err: crate::client::ClientError) -> Self {
        use crate::client::ClientError;
        use cartjo_core::CoreError;

        match err {
            ClientError::Core(CoreError::InvalidQuery { message }) => Self::BadRequest(message),
            err if err.is_not_found() => Self::NotFound(err.to_string()),
            err => Self::Upstream(err.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(feature = "server")]
impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias using HttpError
pub type Result<T> = std::result::Result<T, HttpError>;
