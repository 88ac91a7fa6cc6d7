//! CartJO backend API client
//!
//! [`ApiClient`] is the authenticated fetch wrapper: it joins paths onto the
//! backend base URL, attaches bearer tokens and the locale, applies a
//! per-request timeout and classifies every failure into a [`ClientError`].
//! It never navigates; 401/403 come back as
//! [`SessionError::Unauthorized`](crate::session::SessionError::Unauthorized)
//! for the caller to act on.

pub mod auth;
pub mod envelope;
pub mod error;
pub mod resources;

pub use envelope::{ApiErrorBody, Envelope};
pub use error::ClientError;
pub use resources::Resource;

use crate::session::SessionError;
use cartjo_core::config::DEFAULT_REQUEST_TIMEOUT_MS;
use cartjo_core::{CartConfig, Locale, Message};
use reqwest::{Client, ClientBuilder, StatusCode, header};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

/// Per-call options for [`ApiClient::execute`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    /// Locale for `Accept-Language` and client-generated messages
    pub locale: Locale,
    /// Overrides the client's default timeout
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            timeout: None,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// CartJO API client
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a client from the storefront configuration
    pub fn from_config(config: &CartConfig) -> Result<Self, ClientError> {
        Self::builder()
            .base_url(&config.api_link)
            .timeout(config.request_timeout())
            .build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Default timeout applied when a call does not override it
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Create a request builder for `path`, optionally with a bearer token
    pub fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.request(method, url);
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode its JSON body as `T`
    ///
    /// # Errors
    ///
    /// - [`ClientError::Timeout`] when the timeout elapses, with a localized message
    /// - [`ClientError::Session`] for 401 and 403
    /// - [`ClientError::Status`] for any other non-2xx status
    /// - [`ClientError::Decode`] when the body is not valid JSON for `T`
    #[instrument(name = "api_request", skip_all, fields(locale = %options.locale))]
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let locale = options.locale;
        let response = request
            .timeout(options.timeout.unwrap_or(self.timeout))
            .header(header::ACCEPT_LANGUAGE, locale.as_str())
            .send()
            .await
            .map_err(|e| Self::classify_transport(e, locale))?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "response received");

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(SessionError::Unauthorized {
                status: status.as_u16(),
            }
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::classify_transport(e, locale))?;

        if !status.is_success() {
            return Err(Self::status_error(status, &bytes, locale));
        }

        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Send a request and unwrap the `data` of its response envelope
    ///
    /// # Errors
    ///
    /// Everything [`ApiClient::execute`] returns, plus [`ClientError::Rejected`]
    /// for `isSuccess: false` envelopes.
    pub async fn execute_data<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        self.execute::<Envelope<T>>(request, options)
            .await?
            .into_data()
    }

    fn classify_transport(err: reqwest::Error, locale: Locale) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout {
                message: locale.message(Message::RequestTimedOut).to_string(),
            }
        } else {
            ClientError::Request(err)
        }
    }

    fn status_error(status: StatusCode, body: &[u8], locale: Locale) -> ClientError {
        let envelope = serde_json::from_slice::<Envelope<serde_json::Value>>(body).ok();
        let error = envelope
            .as_ref()
            .and_then(|e| e.error.clone())
            .unwrap_or_default();
        let message = envelope
            .as_ref()
            .map(|e| e.message.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| error.details_text().map(str::to_string))
            .unwrap_or_else(|| locale.message(Message::GenericError).to_string());

        ClientError::Status {
            status: status.as_u16(),
            code: error.code_string(),
            details: error.details,
            message,
        }
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the default request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base_url is empty".into()));
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("cartjo-client/{}", env!("CARGO_PKG_VERSION")));
        let client = ClientBuilder::new().user_agent(user_agent).build()?;

        Ok(ApiClient {
            client,
            base_url,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS)),
        })
    }
}
