//! Authentication API client methods

use super::{ApiClient, ClientError, RequestOptions};
use crate::session::{SessionError, TokenRefresher, claims};
use async_trait::async_trait;
use cartjo_core::SessionToken;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub const LOGIN_PATH: &str = "/api/v1/auth/login";
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// Sign-in credentials; customers sign in by email or phone number
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub password: String,
}

impl LoginRequest {
    pub fn with_email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            phone_number: None,
            password: password.into(),
        }
    }

    pub fn with_phone(phone_number: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: None,
            phone_number: Some(phone_number.into()),
            password: password.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Token pair returned by the login and refresh endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    /// Convert into a stored token issued at `issued_at_ms`.
    ///
    /// The expiry comes from `expiresIn`, or failing that the access token's
    /// `exp` claim. When the response rotates no refresh token,
    /// `previous_refresh` is kept.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Invalid`] when no expiry is declared or no
    /// refresh token is available.
    pub fn into_session_token(
        self,
        issued_at_ms: i64,
        previous_refresh: Option<&str>,
    ) -> Result<SessionToken, SessionError> {
        let refresh_token = self
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string))
            .ok_or_else(|| SessionError::Invalid("token response has no refresh token".into()))?;

        if let Some(expires_in) = self.expires_in {
            return Ok(SessionToken::issued(
                self.access_token,
                refresh_token,
                issued_at_ms,
                expires_in,
            ));
        }

        let expires = claims::expiry_ms(&self.access_token)?.ok_or_else(|| {
            SessionError::Invalid("token response declares no access token expiry".into())
        })?;
        Ok(SessionToken {
            access_token: self.access_token,
            refresh_token,
            access_token_expires: expires,
            error: None,
        })
    }
}

impl ApiClient {
    /// Exchange credentials for a token pair
    #[instrument(name = "auth_login", skip_all)]
    pub async fn login(
        &self,
        credentials: &LoginRequest,
        options: RequestOptions,
    ) -> Result<TokenResponse, ClientError> {
        let req = self.request(Method::POST, LOGIN_PATH, None).json(credentials);
        let tokens = self.execute_data::<TokenResponse>(req, options).await?;
        info!("signed in");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new token pair
    #[instrument(name = "auth_refresh", skip_all)]
    pub async fn refresh(
        &self,
        refresh_token: &str,
        options: RequestOptions,
    ) -> Result<TokenResponse, ClientError> {
        let req = self
            .request(Method::POST, REFRESH_PATH, None)
            .json(&RefreshRequest { refresh_token });
        self.execute_data(req, options).await
    }
}

#[async_trait]
impl TokenRefresher for ApiClient {
    async fn refresh_token(
        &self,
        refresh_token: &str,
        now_ms: i64,
    ) -> Result<SessionToken, ClientError> {
        let response = self.refresh(refresh_token, RequestOptions::default()).await?;
        Ok(response.into_session_token(now_ms, Some(refresh_token))?)
    }
}
