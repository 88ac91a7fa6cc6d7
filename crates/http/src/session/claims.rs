//! Reading claims out of backend-issued access tokens
//!
//! The backend owns the signing key, so payloads are decoded without
//! verifying the signature. Nothing read here grants access on its own; the
//! backend re-validates the token on every request.

use super::SessionError;
use cartjo_core::UserClaims;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    #[serde(default)]
    exp: Option<i64>,
}

fn unverified_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

fn decode_payload<T: DeserializeOwned>(token: &str) -> Result<T, SessionError> {
    decode::<T>(token, &DecodingKey::from_secret(&[]), &unverified_validation())
        .map(|data| data.claims)
        .map_err(|e| SessionError::Invalid(format!("unreadable access token: {e}")))
}

/// Decode the user identity carried in an access token
///
/// # Errors
///
/// Returns [`SessionError::Invalid`] if the token is not a JWT or its
/// payload lacks the identity claims.
pub fn decode_claims(access_token: &str) -> Result<UserClaims, SessionError> {
    decode_payload(access_token)
}

/// The token's `exp` claim in epoch milliseconds, if present
///
/// # Errors
///
/// Returns [`SessionError::Invalid`] if the token is not a JWT.
pub fn expiry_ms(access_token: &str) -> Result<Option<i64>, SessionError> {
    let claim: ExpiryClaim = decode_payload(access_token)?;
    Ok(claim.exp.map(|secs| secs.saturating_mul(1000)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    fn backend_token(payload: &serde_json::Value) -> String {
        encode(
            &Header::default(),
            payload,
            &EncodingKey::from_secret(b"backend-only-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_claims_without_backend_key() {
        let token = backend_token(&json!({
            "id": "u42",
            "email": "rana@example.jo",
            "phoneNumber": "0791234567",
            "role": "admin",
            "canManage": true,
            "firstName": "Rana",
            "lastName": "Haddad",
            "exp": 1_700_000_000
        }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.id, "u42");
        assert_eq!(claims.phone_number.as_deref(), Some("0791234567"));
        assert!(claims.is_admin());
        assert_eq!(expiry_ms(&token).unwrap(), Some(1_700_000_000_000));
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let token = backend_token(&json!({"id": "u1", "role": "user", "exp": 1}));
        assert!(decode_claims(&token).is_ok());
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        assert!(matches!(decode_claims("abc"), Err(SessionError::Invalid(_))));
        assert!(matches!(expiry_ms("a.b.c"), Err(SessionError::Invalid(_))));
    }

    #[test]
    fn test_missing_role_is_invalid() {
        let token = backend_token(&json!({"id": "u1"}));
        assert!(decode_claims(&token).is_err());
    }
}
