//! Sealed session storage
//!
//! A session persisted outside the process is an HS256 JWT signed with the
//! session secret (`NEXTAUTH_SECRET`). Opening verifies the signature only;
//! max-age is enforced by [`SessionContext`](super::SessionContext) against
//! its own clock.

use super::{SessionData, SessionError};
use cartjo_core::CartConfig;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct SealedClaims {
    #[serde(flatten)]
    session: SessionData,
    iat: i64,
    exp: i64,
}

/// Seals and opens persisted sessions
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    max_age: Duration,
}

impl SessionCodec {
    /// # Errors
    ///
    /// Returns [`SessionError::Invalid`] for an empty secret.
    pub fn new(secret: &str, max_age: Duration) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::Invalid("session secret is empty".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            max_age,
        })
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Invalid`] when `NEXTAUTH_SECRET` is not set.
    pub fn from_config(config: &CartConfig) -> Result<Self, SessionError> {
        let secret = config
            .session_secret
            .as_deref()
            .ok_or_else(|| SessionError::Invalid("NEXTAUTH_SECRET is not set".into()))?;
        Self::new(secret, config.session_max_age())
    }

    /// Serialize and sign a session
    pub fn seal(&self, session: &SessionData) -> Result<String, SessionError> {
        let iat = session.signed_in_at / 1000;
        let max_age_secs = i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);
        let claims = SealedClaims {
            session: session.clone(),
            iat,
            exp: iat.saturating_add(max_age_secs),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SessionError::Invalid(format!("failed to seal session: {e}")))
    }

    /// Verify and decode a sealed session
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Invalid`] for a tampered session, one sealed
    /// with another secret, or one that is not a sealed session at all.
    pub fn open(&self, sealed: &str) -> Result<SessionData, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        decode::<SealedClaims>(sealed.trim(), &self.decoding, &validation)
            .map(|data| data.claims.session)
            .map_err(|e| SessionError::Invalid(format!("failed to open session: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartjo_core::{SessionToken, UserClaims};

    fn session() -> SessionData {
        SessionData {
            token: SessionToken::issued("access", "refresh", 1_000_000, 900),
            user: UserClaims {
                id: "u1".into(),
                email: Some("a@b.jo".into()),
                phone_number: None,
                role: "user".into(),
                can_manage: false,
                first_name: None,
                last_name: None,
            },
            signed_in_at: 1_000_000,
        }
    }

    fn codec(secret: &str) -> SessionCodec {
        SessionCodec::new(secret, Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn test_seal_and_open() {
        let sealed = codec("s3cret").seal(&session()).unwrap();
        assert_eq!(codec("s3cret").open(&sealed).unwrap(), session());
    }

    #[test]
    fn test_foreign_secret_fails() {
        let sealed = codec("s3cret").seal(&session()).unwrap();
        assert!(matches!(
            codec("other").open(&sealed),
            Err(SessionError::Invalid(_))
        ));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let sealed = codec("s3cret").seal(&session()).unwrap();
        let mut parts: Vec<&str> = sealed.split('.').collect();
        let mut elevated = session();
        elevated.user.role = "admin".into();
        let forged = codec("attacker").seal(&elevated).unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;
        assert!(codec("s3cret").open(&parts.join(".")).is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(SessionCodec::new("", Duration::from_secs(1)).is_err());
    }
}
