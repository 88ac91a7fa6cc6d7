//! CLI configuration and session file utilities

use anyhow::{Context, Result};
use cartjo_core::CartConfig;
use cartjo_http::session::{SessionCodec, SessionData};
use serde_json::json;
use std::path::Path;

/// Default location of the sealed session written by `login`
pub const DEFAULT_SESSION_FILE: &str = ".cartjo-session";

/// Load configuration from an optional file plus the environment
pub fn load(path: Option<&Path>) -> Result<CartConfig> {
    let config = match path {
        Some(path) => CartConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => CartConfig::from_env().context("failed to load config from environment")?,
    };
    Ok(config)
}

/// Effective configuration with secrets masked
pub fn redacted(config: &CartConfig) -> serde_json::Value {
    let mask = |secret: &Option<String>| secret.as_ref().map(|_| "********");
    json!({
        "apiLink": config.api_link,
        "imageDomains": config.image_domains,
        "revalidationSecret": mask(&config.revalidation_secret),
        "sessionSecret": mask(&config.session_secret),
        "sessionMaxAgeSecs": config.session_max_age_secs,
        "envType": config.env_type,
        "bindAddr": config.bind_addr.to_string(),
        "requestTimeoutMs": config.request_timeout_ms,
        "defaultLocale": config.default_locale,
    })
}

/// Write a sealed session
pub async fn save_session(codec: &SessionCodec, session: &SessionData, path: &Path) -> Result<()> {
    let sealed = codec.seal(session)?;
    tokio::fs::write(path, sealed)
        .await
        .with_context(|| format!("failed to write session to {}", path.display()))
}

/// Read a sealed session, if one was saved
pub async fn load_session(codec: &SessionCodec, path: &Path) -> Result<Option<SessionData>> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(None);
    }
    let sealed = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read session from {}", path.display()))?;
    Ok(Some(codec.open(&sealed)?))
}
