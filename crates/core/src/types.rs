//! Session and identity types shared by the client and server crates

use serde::{Deserialize, Serialize};

/// Milliseconds before expiry at which an access token is treated as stale.
pub const REFRESH_BUFFER_MS: i64 = 30_000;

/// Marker attached to a token whose refresh attempt failed.
///
/// A tagged token is never usable again; the session must be re-established
/// through a fresh sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenError {
    RefreshAccessTokenError,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RefreshAccessTokenError => f.write_str("RefreshAccessTokenError"),
        }
    }
}

/// Access/refresh token pair with the server-declared access expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Epoch milliseconds at which the access token stops being accepted
    pub access_token_expires: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TokenError>,
}

impl SessionToken {
    /// Build a token from a server response issued at `issued_at_ms`.
    pub fn issued(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        issued_at_ms: i64,
        expires_in_secs: u64,
    ) -> Self {
        let ttl_ms = i64::try_from(expires_in_secs)
            .unwrap_or(i64::MAX / 1000)
            .saturating_mul(1000);
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            access_token_expires: issued_at_ms.saturating_add(ttl_ms),
            error: None,
        }
    }

    /// Whether the token must be exchanged before use at `now_ms`.
    pub const fn needs_refresh(&self, now_ms: i64) -> bool {
        now_ms >= self.access_token_expires.saturating_sub(REFRESH_BUFFER_MS)
    }

    /// Whether a previous refresh attempt failed for this token.
    pub const fn is_errored(&self) -> bool {
        self.error.is_some()
    }

    /// Return this token tagged with the refresh failure marker.
    #[must_use]
    pub fn into_errored(mut self) -> Self {
        self.error = Some(TokenError::RefreshAccessTokenError);
        self
    }
}

/// Identity claims carried in the access token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClaims {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub role: String,
    #[serde(default)]
    pub can_manage: bool,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserClaims {
    /// Display name built from first and last name, falling back to email
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.email.clone().unwrap_or_else(|| self.id.clone())
        } else {
            full
        }
    }

    /// Whether the user may enter the administrative dashboard
    pub fn is_admin(&self) -> bool {
        self.can_manage || self.role.eq_ignore_ascii_case("admin")
    }
}
