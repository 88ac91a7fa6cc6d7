//! Storefront configuration
//!
//! Values are layered: built-in defaults, then an optional TOML/YAML file,
//! then environment variables. The environment uses the storefront's
//! deployment variable names (`NEXT_PUBLIC_API_LINK`, `REVALIDATION_SECRET`,
//! ...) so one `.env` serves every component.

use crate::error::{CoreError, CoreResult};
use crate::locale::Locale;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default timeout applied to every backend request
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 8_000;

/// Default absolute session lifetime (30 days)
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Deployment flavour, controls how much error detail is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvType {
    Development,
    #[default]
    Production,
}

impl EnvType {
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Effective storefront configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartConfig {
    /// Backend base URL
    #[serde(rename = "next_public_api_link")]
    pub api_link: String,

    /// Hosts product and banner images may be loaded from
    #[serde(rename = "next_public_image_domains", default)]
    pub image_domains: Vec<String>,

    /// Shared secret guarding the revalidation webhook
    #[serde(rename = "revalidation_secret", default)]
    pub revalidation_secret: Option<String>,

    /// Key sealing persisted sessions
    #[serde(rename = "nextauth_secret", default)]
    pub session_secret: Option<String>,

    /// Absolute session lifetime in seconds
    #[serde(rename = "next_auth_session_max_age")]
    pub session_max_age_secs: u64,

    #[serde(rename = "next_public_env_type")]
    pub env_type: EnvType,

    #[serde(rename = "cartjo_bind_addr")]
    pub bind_addr: SocketAddr,

    #[serde(rename = "cartjo_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(rename = "cartjo_default_locale")]
    pub default_locale: Locale,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            api_link: "http://localhost:5000".to_string(),
            image_domains: Vec::new(),
            revalidation_secret: None,
            session_secret: None,
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
            env_type: EnvType::default(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            default_locale: Locale::default(),
        }
    }
}

impl CartConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the result is invalid
    pub fn from_env() -> CoreResult<Self> {
        Self::load(None)
    }

    /// Load configuration from a file, with environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        Self::load(Some(path.as_ref()))
    }

    fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut builder = Self::defaults_builder()?;
        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::default()
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("next_public_image_domains"),
        );
        Self::from_builder(builder)
    }

    /// Load configuration from an in-memory TOML document
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let builder = Self::defaults_builder()?
            .add_source(config::File::from_str(content, config::FileFormat::Toml));
        Self::from_builder(builder)
    }

    fn defaults_builder() -> CoreResult<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = Self::default();
        Ok(config::Config::builder()
            .set_default("next_public_api_link", defaults.api_link)?
            .set_default("next_public_image_domains", Vec::<String>::new())?
            .set_default("next_auth_session_max_age", defaults.session_max_age_secs)?
            .set_default("next_public_env_type", "production")?
            .set_default("cartjo_bind_addr", defaults.bind_addr.to_string())?
            .set_default("cartjo_request_timeout_ms", defaults.request_timeout_ms)?
            .set_default("cartjo_default_locale", defaults.default_locale.as_str())?)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> CoreResult<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        tracing::debug!(api = %config.api_link, env = ?config.env_type, "configuration loaded");
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] describing the first violation
    pub fn validate(&self) -> CoreResult<()> {
        let url = self.api_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::invalid_config(format!(
                "api link must be http(s), got {}",
                url.scheme()
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(CoreError::invalid_config("request timeout must be positive"));
        }
        if self.session_max_age_secs == 0 {
            return Err(CoreError::invalid_config("session max age must be positive"));
        }
        Ok(())
    }

    /// Parsed backend base URL
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the link is not a URL
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_link)
            .map_err(|e| CoreError::invalid_config(format!("invalid api link {}: {e}", self.api_link)))
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub const fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_secs)
    }

    /// Whether images may be loaded from `host`.
    ///
    /// Entries match the host exactly or, when written as `*.domain`, any subdomain.
    pub fn is_allowed_image_host(&self, host: &str) -> bool {
        let host = host.trim().to_ascii_lowercase();
        self.image_domains.iter().any(|domain| {
            let domain = domain.trim().to_ascii_lowercase();
            domain.strip_prefix("*.").map_or(host == domain, |suffix| {
                host.len() > suffix.len() && host.ends_with(&format!(".{suffix}"))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CartConfig::from_toml_str("").unwrap();
        assert_eq!(config.request_timeout(), Duration::from_millis(8_000));
        assert_eq!(config.session_max_age_secs, DEFAULT_SESSION_MAX_AGE_SECS);
        assert_eq!(config.env_type, EnvType::Production);
        assert_eq!(config.default_locale, Locale::Ar);
        assert!(config.revalidation_secret.is_none());
    }

    #[test]
    fn test_file_values_override_defaults() {
        let config = CartConfig::from_toml_str(
            r#"
            next_public_api_link = "https://api.cartjo.com"
            next_public_image_domains = ["cdn.cartjo.com", "*.cloudinary.com"]
            revalidation_secret = "s3cret"
            next_public_env_type = "development"
            cartjo_default_locale = "en"
            "#,
        )
        .unwrap();
        assert_eq!(config.api_url().unwrap().host_str(), Some("api.cartjo.com"));
        assert_eq!(config.revalidation_secret.as_deref(), Some("s3cret"));
        assert!(config.env_type.is_development());
        assert_eq!(config.default_locale, Locale::En);
    }

    #[test]
    fn test_invalid_api_link_rejected() {
        let err = CartConfig::from_toml_str(r#"next_public_api_link = "ftp://files""#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }

    #[test]
    fn test_image_host_allow_list() {
        let config = CartConfig {
            image_domains: vec!["cdn.cartjo.com".into(), "*.cloudinary.com".into()],
            ..CartConfig::default()
        };
        assert!(config.is_allowed_image_host("cdn.cartjo.com"));
        assert!(config.is_allowed_image_host("res.cloudinary.com"));
        assert!(!config.is_allowed_image_host("cloudinary.com"));
        assert!(!config.is_allowed_image_host("evil.com"));
    }
}
