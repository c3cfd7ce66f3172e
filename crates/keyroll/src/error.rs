//! Error types for the sealing layer.

use thiserror::Error;

use crate::crypto::KEY_LEN;

/// Errors produced by the cipher primitive.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// AEAD encryption failed.
    #[error("aead encryption failed")]
    EncryptionFailure,

    /// AEAD decryption failed: wrong key or tampered ciphertext.
    #[error("aead decryption failed")]
    DecryptionFailure,

    /// The ciphertext string does not match the expected format.
    #[error("invalid ciphertext format")]
    InvalidFormat,
}

/// Errors produced while encoding or decoding a plaintext payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Decrypted bytes were expected to be UTF-8 text.
    #[error("decrypted payload is not valid UTF-8")]
    InvalidUtf8,

    /// Structured payload could not be (de)serialised.
    #[error("structured payload codec failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by [`SealedValue`](crate::SealedValue) operations.
///
/// None of these are retried; they propagate to whoever triggered the
/// seal or unseal (typically a save or load of the owning entity).
#[derive(Debug, Error)]
pub enum SealError {
    /// The stored key profile name has no entry in the registry.
    #[error("key profile '{0}' could not be loaded")]
    KeyProfileNotFound(String),

    /// Encrypting the encoded payload failed.
    #[error("encryption failed: {0}")]
    Encryption(#[source] CipherError),

    /// Decrypting the stored ciphertext failed.
    #[error("decryption failed: {0}")]
    Decryption(#[source] CipherError),

    /// The payload codec rejected the value or the decrypted bytes.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Key material supplied for a profile is unusable.
    #[error("invalid key for profile '{0}'")]
    InvalidKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_profile() {
        let e = SealError::KeyProfileNotFound("ghost".into());
        assert_eq!(e.to_string(), "key profile 'ghost' could not be loaded");
    }

    #[test]
    fn decryption_keeps_cipher_source() {
        use std::error::Error as _;
        let e = SealError::Decryption(CipherError::DecryptionFailure);
        assert!(e.source().is_some());
        assert!(e.to_string().contains("aead decryption failed"));
    }
}
