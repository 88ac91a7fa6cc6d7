//! Configuration for tracing and instrumentation

use serde::{Deserialize, Serialize};

/// Output format of the formatting layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Main instrumentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Service name attached to every event
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Log level filter (e.g., "info", "debug", "cartjo_http=trace")
    pub log_level: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: "cartjo".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl InstrumentationConfig {
    /// Create configuration from environment variables
    ///
    /// Supports the following environment variables:
    /// - `OTEL_SERVICE_NAME` or `SERVICE_NAME`: Service name
    /// - `SERVICE_VERSION`: Service version
    /// - `RUST_LOG`: Log level filter
    /// - `LOG_FORMAT`: `json` for structured output, anything else for pretty
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let service_name = std::env::var("OTEL_SERVICE_NAME")
            .or_else(|_| std::env::var("SERVICE_NAME"))
            .unwrap_or(defaults.service_name);

        let service_version = std::env::var("SERVICE_VERSION").unwrap_or(defaults.service_version);

        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);

        let format = std::env::var("LOG_FORMAT")
            .map(|f| Self::parse_format(&f))
            .unwrap_or_default();

        Self {
            service_name,
            service_version,
            log_level,
            format,
        }
    }

    /// Create a development configuration with sensible defaults
    pub fn dev() -> Self {
        Self {
            service_name: "cartjo-dev".to_string(),
            service_version: "dev".to_string(),
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
        }
    }

    /// Override the level filter
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    fn parse_format(value: &str) -> LogFormat {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}
