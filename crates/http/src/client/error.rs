//! Client error types

use crate::session::SessionError;
use cartjo_core::{CoreError, QueryFlags};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Client error types
///
/// Every failure surfaces exactly once; nothing here retries.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or transport error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The request was aborted after its timeout elapsed
    #[error("{message}")]
    Timeout { message: String },

    /// Server returned a non-2xx status
    #[error("Server error {status}: {message}")]
    Status {
        status: u16,
        code: Option<String>,
        details: Option<JsonValue>,
        message: String,
    },

    /// Server answered 2xx but flagged the request as unsuccessful
    #[error("Request rejected: {message}")]
    Rejected {
        code: Option<String>,
        details: Option<JsonValue>,
        message: String,
    },

    /// The session is missing, expired or was refused by the server
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Query parameters or response normalization failed
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// HTTP status associated with this error, if any
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Session(SessionError::Unauthorized { status }) => Some(*status),
            _ => None,
        }
    }

    /// Whether the resource does not exist; screens render this as empty
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }

    /// Whether the user must sign in again before retrying
    pub const fn is_session_ended(&self) -> bool {
        matches!(self, Self::Session(_))
    }

    /// Route the caller should navigate to, for session-ending errors
    pub const fn redirect_target(&self) -> Option<&'static str> {
        match self {
            Self::Session(err) => Some(err.redirect_target()),
            _ => None,
        }
    }

    /// Render flags of a query that settled with this error
    pub const fn query_flags(&self) -> QueryFlags {
        QueryFlags::failed(self.status())
    }
}
