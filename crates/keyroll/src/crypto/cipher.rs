//! AES-256-GCM-SIV encryption and decryption of sealed payloads.
//!
//! AES-256-GCM-SIV (RFC 8452) is nonce-misuse-resistant, so a repeated random
//! nonce degrades to leaking plaintext equality rather than breaking
//! authentication. Every call still draws a fresh nonce from the OS CSPRNG.

use std::fmt;
use std::str::FromStr;

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use crate::error::CipherError;
use crate::profile::KeyBytes;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Prefix that appears at the start of every ciphertext string.
pub const VERSION_PREFIX: &str = "v1";

/// Authenticated symmetric encryption under caller-supplied key material.
///
/// Implementations must detect tampering: `decrypt` fails for malformed
/// input, for ciphertext produced under another key, and for modified bytes.
#[cfg_attr(test, mockall::automock)]
pub trait Cipher: Send + Sync {
    /// Encrypt `plaintext` and return the encoded ciphertext string.
    fn encrypt(&self, plaintext: &[u8], key: &KeyBytes) -> Result<String, CipherError>;

    /// Decrypt an encoded ciphertext string back to plaintext bytes.
    fn decrypt(&self, ciphertext: &str, key: &KeyBytes) -> Result<Vec<u8>, CipherError>;
}

/// A parsed ciphertext string.
///
/// The string representation is `v1.<base64url(nonce)>.<base64url(ciphertext+tag)>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedField {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

impl fmt::Display for EncryptedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            VERSION_PREFIX,
            URL_SAFE_NO_PAD.encode(self.nonce),
            URL_SAFE_NO_PAD.encode(&self.ciphertext),
        )
    }
}

impl FromStr for EncryptedField {
    type Err = CipherError;

    /// Parse a `v1.<nonce>.<ciphertext>` string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '.');
        let (Some(version), Some(nonce_b64), Some(ct_b64)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(CipherError::InvalidFormat);
        };
        if version != VERSION_PREFIX {
            return Err(CipherError::InvalidFormat);
        }

        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(nonce_b64)
            .map_err(|_| CipherError::InvalidFormat)?;
        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| CipherError::InvalidFormat)?;

        let ciphertext = URL_SAFE_NO_PAD
            .decode(ct_b64)
            .map_err(|_| CipherError::InvalidFormat)?;

        Ok(Self { nonce, ciphertext })
    }
}

/// [`Cipher`] backed by AES-256-GCM-SIV with a random nonce per message.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmSivCipher;

impl Cipher for AesGcmSivCipher {
    fn encrypt(&self, plaintext: &[u8], key: &KeyBytes) -> Result<String, CipherError> {
        let cipher = build_cipher(key.as_slice())?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| CipherError::EncryptionFailure)?;

        Ok(EncryptedField {
            nonce: nonce_bytes,
            ciphertext,
        }
        .to_string())
    }

    fn decrypt(&self, ciphertext: &str, key: &KeyBytes) -> Result<Vec<u8>, CipherError> {
        let field: EncryptedField = ciphertext.parse()?;
        let cipher = build_cipher(key.as_slice())?;
        cipher
            .decrypt(Nonce::from_slice(&field.nonce), field.ciphertext.as_ref())
            .map_err(|_| CipherError::DecryptionFailure)
    }
}

fn build_cipher(key: &[u8]) -> Result<Aes256GcmSiv, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    Aes256GcmSiv::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)
}
