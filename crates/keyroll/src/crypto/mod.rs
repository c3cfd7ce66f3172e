//! Cipher primitive used by key profiles.
//!
//! The [`Cipher`] trait is the seam between key profiles and the concrete
//! AEAD. [`AesGcmSivCipher`] is the implementation used by default.
//!
//! # Ciphertext format
//!
//! ```text
//! v1.<base64url-no-pad(nonce)>.<base64url-no-pad(ciphertext+tag)>
//! ```
//!
//! The string is what gets persisted in the `cipher_text` column; the storage
//! layer treats it as opaque.

pub mod cipher;

pub use cipher::{AesGcmSivCipher, Cipher, EncryptedField, KEY_LEN};

#[cfg(test)]
pub use cipher::MockCipher;
