//! Session failure taxonomy

use cartjo_core::AUTH_ROUTE;
use thiserror::Error;

/// Why a session cannot supply a usable access token.
///
/// Every variant means "session ended": callers send the user back to
/// sign-in rather than treating it as a bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No user is signed in
    #[error("No active session")]
    SignedOut,

    /// The backend refused the access token
    #[error("Session rejected by server (status {status})")]
    Unauthorized { status: u16 },

    /// Exchanging the refresh token failed
    #[error("Access token refresh failed")]
    RefreshFailed,

    /// The session outlived its maximum age
    #[error("Session exceeded its maximum age")]
    Expired,

    /// The stored or issued session is malformed
    #[error("Invalid session: {0}")]
    Invalid(String),
}

impl SessionError {
    /// Route to navigate to once this error is observed
    pub const fn redirect_target(&self) -> &'static str {
        AUTH_ROUTE
    }
}
