//! What the page-level error boundary shows for an unexpected error

use crate::config::EnvType;
use crate::locale::{Locale, Message};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Rendered content of the generic "application error" screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorView {
    pub title: String,
    pub retry: bool,
    /// Raw error message, development builds only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Short fingerprint to correlate with server logs, development builds only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ErrorView {
    pub fn from_error(err: &dyn std::fmt::Display, env: EnvType, locale: Locale) -> Self {
        let (detail, digest) = if env.is_development() {
            let message = err.to_string();
            let digest = digest(&message);
            (Some(message), Some(digest))
        } else {
            (None, None)
        };

        Self {
            title: locale.message(Message::ApplicationError).to_string(),
            retry: true,
            detail,
            digest,
        }
    }
}

/// First ten hex characters of the SHA-256 of `message`
pub fn digest(message: &str) -> String {
    let hash = Sha256::digest(message.as_bytes());
    let mut hex = hex::encode(hash);
    hex.truncate(10);
    hex
}
