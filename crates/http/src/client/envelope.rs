//! The `{isSuccess, message, data?, dataCount?, error?}` wrapper every backend
//! response uses

use super::ClientError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Structured error carried by a failed envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<JsonValue>,
    #[serde(default)]
    pub details: Option<JsonValue>,
}

impl ApiErrorBody {
    /// Error code as a string, whether the backend sent it as a string or number
    pub fn code_string(&self) -> Option<String> {
        match self.code.as_ref()? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Human-readable details when the backend sent them as text
    pub fn details_text(&self) -> Option<&str> {
        self.details.as_ref().and_then(JsonValue::as_str)
    }
}

/// Single-resource response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    #[serde(default = "default_success")]
    pub is_success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    #[serde(default)]
    pub data_count: Option<u64>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

const fn default_success() -> bool {
    true
}

impl<T> Envelope<T> {
    /// Fail on `isSuccess: false`, otherwise keep the envelope
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] with the backend's message and error body.
    pub fn ensure_success(self) -> Result<Self, ClientError> {
        if self.is_success {
            return Ok(self);
        }
        let error = self.error.unwrap_or_default();
        let message = if self.message.is_empty() {
            error.details_text().unwrap_or("request rejected").to_string()
        } else {
            self.message
        };
        Err(ClientError::Rejected {
            code: error.code_string(),
            details: error.details,
            message,
        })
    }

    /// The payload of a successful envelope
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] for unsuccessful envelopes and
    /// [`ClientError::Decode`] when `data` is missing.
    pub fn into_data(self) -> Result<T, ClientError> {
        self.ensure_success()?
            .data
            .ok_or_else(|| ClientError::Decode("response envelope carries no data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_data_success() {
        let env: Envelope<JsonValue> =
            serde_json::from_value(json!({"isSuccess": true, "message": "", "data": {"_id": "p1"}}))
                .unwrap();
        assert_eq!(env.into_data().unwrap()["_id"], "p1");
    }

    #[test]
    fn test_unsuccessful_envelope_is_rejected() {
        let env: Envelope<JsonValue> = serde_json::from_value(json!({
            "isSuccess": false,
            "message": "",
            "error": {"code": 4001, "details": "Product is out of stock"}
        }))
        .unwrap();
        match env.into_data() {
            Err(ClientError::Rejected { code, message, .. }) => {
                assert_eq!(code.as_deref(), Some("4001"));
                assert_eq!(message, "Product is out of stock");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    /// Payload type without a `Default` impl
    #[derive(Debug, Deserialize)]
    struct Product {
        #[serde(rename = "_id")]
        id: String,
    }

    fn decode<T: serde::de::DeserializeOwned>(body: JsonValue) -> Result<T, ClientError> {
        serde_json::from_value::<Envelope<T>>(body)
            .map_err(|e| ClientError::Decode(e.to_string()))?
            .into_data()
    }

    #[test]
    fn test_generic_payload_without_default() {
        let product: Product = decode(json!({"isSuccess": true, "data": {"_id": "p9"}})).unwrap();
        assert_eq!(product.id, "p9");

        let missing = decode::<Product>(json!({"isSuccess": true, "message": "ok"}));
        assert!(matches!(missing, Err(ClientError::Decode(_))));
    }

    #[test]
    fn test_missing_data_is_decode_error() {
        let env: Envelope<JsonValue> =
            serde_json::from_value(json!({"isSuccess": true, "message": "deleted"})).unwrap();
        assert!(matches!(env.into_data(), Err(ClientError::Decode(_))));
    }
}
