//! Request and response bodies of the sealing service, serialised as JSON.

use serde::{Deserialize, Serialize};

/// How the plaintext is encoded before encryption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// The value is a JSON string, encrypted as its UTF-8 bytes.
    #[default]
    String,
    /// The value is any JSON document, encrypted as its serialised form.
    Json,
}

/// Persisted columns of a sealed field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredColumns {
    /// Encoded ciphertext.
    pub cipher_text: Option<String>,
    /// Name of the key profile that produced `cipher_text`.
    pub key_profile: Option<String>,
}

// ---------------------------------------------------------------------------
// Seal / unseal / roll
// ---------------------------------------------------------------------------

/// Request body for `POST /seal`.
///
/// When `stored` is present the new value replaces a previously sealed one,
/// and stays on its key profile unless that profile is being rolled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealRequest {
    /// Payload encoding.
    #[serde(default)]
    pub kind: PayloadKind,
    /// Plaintext value to seal.
    pub value: serde_json::Value,
    /// Columns of the value being replaced, if any.
    #[serde(default)]
    pub stored: Option<StoredColumns>,
}

/// Request body for `POST /unseal` and `POST /roll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRequest {
    /// Payload encoding.
    #[serde(default)]
    pub kind: PayloadKind,
    /// Columns to operate on.
    #[serde(flatten)]
    pub stored: StoredColumns,
}

/// Response body for `POST /seal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealResponse {
    /// Columns to persist.
    #[serde(flatten)]
    pub stored: StoredColumns,
}

/// Response body for `POST /unseal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsealResponse {
    /// Decrypted value, `null` if nothing was stored.
    pub value: serde_json::Value,
}

/// Response body for `POST /roll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollResponse {
    /// Columns to persist.
    #[serde(flatten)]
    pub stored: StoredColumns,
    /// Whether the value moved to another key profile.
    pub rolled: bool,
}

// ---------------------------------------------------------------------------
// Profiles and health
// ---------------------------------------------------------------------------

/// One configured key profile, without key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileInfo {
    /// Profile name.
    pub name: String,
    /// Whether values under this profile roll on their next change.
    pub rolled: bool,
    /// Non-secret key fingerprint.
    pub fingerprint: Option<String>,
    /// Whether this is the default profile.
    pub is_default: bool,
}

/// Response body for `GET /profiles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesResponse {
    /// Profiles sorted by name.
    pub profiles: Vec<ProfileInfo>,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Number of configured key profiles.
    pub profiles_loaded: usize,
    /// Name of the default key profile, if any.
    pub default_profile: Option<String>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seal_request_defaults() {
        let req: SealRequest = serde_json::from_value(json!({"value": "x"})).unwrap();
        assert_eq!(req.kind, PayloadKind::String);
        assert!(req.stored.is_none());
    }

    #[test]
    fn stored_request_is_flat() {
        let req: StoredRequest = serde_json::from_value(json!({
            "kind": "json",
            "cipher_text": "v1.a.b",
            "key_profile": "2024"
        }))
        .unwrap();
        assert_eq!(req.kind, PayloadKind::Json);
        assert_eq!(req.stored.key_profile.as_deref(), Some("2024"));
    }

    #[test]
    fn roll_response_shape() {
        let resp = RollResponse {
            stored: StoredColumns {
                cipher_text: Some("v1.a.b".into()),
                key_profile: Some("2025".into()),
            },
            rolled: true,
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value, json!({"cipher_text": "v1.a.b", "key_profile": "2025", "rolled": true}));
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("bad_request", "value must be a string");
        assert_eq!(e.code, "bad_request");
        assert!(e.message.contains("string"));
    }
}
