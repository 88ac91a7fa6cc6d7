//! Locale routing and the handful of messages the client layer emits itself

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Route the client sends users to once their session has ended.
pub const AUTH_ROUTE: &str = "/auth";

/// Supported storefront locales
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ar,
    En,
}

impl Locale {
    pub const ALL: [Self; 2] = [Self::Ar, Self::En];

    /// Language tag used in paths and `Accept-Language`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::En => "en",
        }
    }

    pub const fn is_rtl(self) -> bool {
        matches!(self, Self::Ar)
    }

    /// Split a `/{locale}/...` path into its locale and the remainder.
    ///
    /// Paths without a known prefix resolve to the default locale and are
    /// returned untouched.
    pub fn from_path(path: &str) -> (Self, &str) {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let (head, rest) = match trimmed.find('/') {
            Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
            None => (trimmed, "/"),
        };
        match head.parse::<Self>() {
            Ok(locale) => (locale, rest),
            Err(_) => (Self::default(), path),
        }
    }

    /// Prefix a locale-independent path with this locale.
    pub fn localized_path(self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            format!("/{}", self.as_str())
        } else {
            format!("/{}/{}", self.as_str(), path)
        }
    }

    /// Locale-prefixed sign-in route
    pub fn auth_path(self) -> String {
        self.localized_path(AUTH_ROUTE)
    }

    /// Look up one of the fixed client messages in this locale
    pub const fn message(self, key: Message) -> &'static str {
        match (self, key) {
            (Self::En, Message::GenericError) => "Something went wrong, please try again",
            (Self::Ar, Message::GenericError) => "حدث خطأ ما، يرجى المحاولة مرة أخرى",
            (Self::En, Message::RequestTimedOut) => "The request timed out",
            (Self::Ar, Message::RequestTimedOut) => "انتهت مهلة الطلب",
            (Self::En, Message::SessionExpired) => "Your session has ended, please sign in again",
            (Self::Ar, Message::SessionExpired) => "انتهت جلستك، يرجى تسجيل الدخول مرة أخرى",
            (Self::En, Message::NotFound) => "Nothing to show here yet",
            (Self::Ar, Message::NotFound) => "لا توجد بيانات لعرضها",
            (Self::En, Message::ApplicationError) => "Application error",
            (Self::Ar, Message::ApplicationError) => "خطأ في التطبيق",
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ar" => Ok(Self::Ar),
            "en" => Ok(Self::En),
            _ => Err(UnknownLocale(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported locale: {0}")]
pub struct UnknownLocale(pub String);

/// Fixed messages produced by the client layer rather than the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    GenericError,
    RequestTimedOut,
    SessionExpired,
    NotFound,
    ApplicationError,
}
