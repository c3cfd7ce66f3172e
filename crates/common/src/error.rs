//! Service-level error type.

use thiserror::Error;

/// Error returned by the sealing service.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`], [`ServiceError::KeyProfileNotFound`],
///   [`ServiceError::DecryptionFailure`] → 400
/// - [`ServiceError::EncryptionFailure`], [`ServiceError::Internal`] → 500
/// - [`ServiceError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request body was malformed or the payload did not fit its kind.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The stored key profile name is not configured in this service.
    #[error("key profile '{0}' could not be loaded")]
    KeyProfileNotFound(String),

    /// The ciphertext is malformed, tampered, or under a different key.
    #[error("decryption failed")]
    DecryptionFailure,

    /// Encryption failed inside the cipher layer.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// No default key profile is available.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_)
            | ServiceError::KeyProfileNotFound(_)
            | ServiceError::DecryptionFailure => 400,
            ServiceError::EncryptionFailure(_) | ServiceError::Internal(_) => 500,
            ServiceError::Unavailable(_) => 503,
        }
    }

    /// Short machine-readable code for the error response body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::KeyProfileNotFound(_) => "key_profile_not_found",
            ServiceError::DecryptionFailure => "decryption_failure",
            ServiceError::EncryptionFailure(_) => "encryption_failure",
            ServiceError::Unavailable(_) => "service_unavailable",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}
