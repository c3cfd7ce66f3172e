//! Key profiles: named key material with a rolling flag.
//!
//! A profile's name is persisted next to every ciphertext it produces, so the
//! right key can be selected on a later unseal. Profiles are immutable once
//! constructed; to retire a key, register a replacement profile under the same
//! name with `rolled` set and make another profile the default.
//!
//! # Security invariants
//!
//! - Key material is never logged, serialised, or included in `Debug` output.
//! - [`KeyProfile::fingerprint`] is a one-way HMAC tag and is safe to expose.

pub mod key;

pub use key::KeyBytes;

use std::fmt;
use std::sync::Arc;

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::crypto::{AesGcmSivCipher, Cipher};
use crate::error::{CipherError, SealError};

type HmacSha256 = Hmac<Sha256>;

/// Label MACed under a key to derive its fingerprint.
const FINGERPRINT_LABEL: &[u8] = b"keyroll.key-profile.fingerprint.v1";

/// Number of HMAC output bytes kept in a fingerprint.
const FINGERPRINT_LEN: usize = 8;

/// A named key able to encrypt and decrypt sealed payloads.
pub trait KeyProfile: Send + Sync + fmt::Debug {
    /// Stable identifier, persisted alongside every ciphertext.
    fn name(&self) -> &str;

    /// Authenticated encryption of `plaintext` under this profile's key.
    fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError>;

    /// Decrypt a ciphertext string produced by [`KeyProfile::encrypt`].
    ///
    /// Fails for malformed input, a foreign key, or tampered bytes.
    fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CipherError>;

    /// Whether values under this profile must move to the default profile
    /// the next time they are modified.
    fn should_be_rolled(&self) -> bool;

    /// Non-secret tag identifying the key material, if the profile has one.
    fn fingerprint(&self) -> Option<String> {
        None
    }
}

/// [`KeyProfile`] holding a 256-bit symmetric key.
pub struct SymmetricKeyProfile {
    name: String,
    key: KeyBytes,
    should_be_rolled: bool,
    cipher: Arc<dyn Cipher>,
}

impl SymmetricKeyProfile {
    /// Create a profile using the default AES-256-GCM-SIV cipher.
    pub fn new(name: impl Into<String>, key: KeyBytes) -> Self {
        Self::with_cipher(name, key, Arc::new(AesGcmSivCipher))
    }

    /// Create a profile backed by a specific [`Cipher`].
    pub fn with_cipher(name: impl Into<String>, key: KeyBytes, cipher: Arc<dyn Cipher>) -> Self {
        Self {
            name: name.into(),
            key,
            should_be_rolled: false,
            cipher,
        }
    }

    /// Set whether values under this profile should be rolled.
    #[must_use]
    pub fn rolled(mut self, should_be_rolled: bool) -> Self {
        self.should_be_rolled = should_be_rolled;
        self
    }
}

impl KeyProfile for SymmetricKeyProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        self.cipher.encrypt(plaintext, &self.key)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CipherError> {
        self.cipher.decrypt(ciphertext, &self.key)
    }

    fn should_be_rolled(&self) -> bool {
        self.should_be_rolled
    }

    fn fingerprint(&self) -> Option<String> {
        key_fingerprint(&self.key)
    }
}

impl fmt::Debug for SymmetricKeyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKeyProfile")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("should_be_rolled", &self.should_be_rolled)
            .finish_non_exhaustive()
    }
}

/// Derive the fingerprint of a key: the first bytes of
/// `HMAC-SHA256(key, label)`, base64url without padding.
pub fn key_fingerprint(key: &KeyBytes) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(key.as_slice()).ok()?;
    mac.update(FINGERPRINT_LABEL);
    let tag = mac.finalize().into_bytes();
    Some(URL_SAFE_NO_PAD.encode(&tag[..FINGERPRINT_LEN]))
}

/// Configuration form of a key profile.
///
/// ```json
/// { "name": "2024-q1", "key": "<base64 of 32 bytes>", "rolled": true }
/// ```
#[derive(Clone, Deserialize)]
pub struct KeyProfileSpec {
    /// Profile name.
    pub name: String,
    /// Standard-alphabet base64 encoding of the 32-byte key.
    pub key: String,
    /// Whether values under this profile should be rolled.
    #[serde(default)]
    pub rolled: bool,
}

impl KeyProfileSpec {
    /// Decode the key and build a [`SymmetricKeyProfile`].
    ///
    /// # Errors
    ///
    /// Returns [`SealError::InvalidKey`] if the key is not valid base64 or
    /// does not decode to exactly 32 bytes.
    pub fn to_profile(&self) -> Result<SymmetricKeyProfile, SealError> {
        let raw = Zeroizing::new(
            STANDARD
                .decode(self.key.trim())
                .map_err(|_| SealError::InvalidKey(self.name.clone()))?,
        );
        let key = KeyBytes::from_slice(&raw).ok_or_else(|| SealError::InvalidKey(self.name.clone()))?;
        Ok(SymmetricKeyProfile::new(self.name.clone(), key).rolled(self.rolled))
    }
}

impl fmt::Debug for KeyProfileSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyProfileSpec")
            .field("name", &self.name)
            .field("key", &"[REDACTED]")
            .field("rolled", &self.rolled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_LEN;

    fn spec(name: &str, key: &[u8], rolled: bool) -> KeyProfileSpec {
        KeyProfileSpec {
            name: name.into(),
            key: STANDARD.encode(key),
            rolled,
        }
    }

    #[test]
    fn round_trip_through_profile() {
        let profile = SymmetricKeyProfile::new("a", KeyBytes::new([1; KEY_LEN]));
        let ct = profile.encrypt(b"hello").unwrap();
        assert_eq!(profile.decrypt(&ct).unwrap(), b"hello");
        assert_eq!(profile.name(), "a");
        assert!(!profile.should_be_rolled());
    }

    #[test]
    fn other_profile_cannot_decrypt() {
        let a = SymmetricKeyProfile::new("a", KeyBytes::new([1; KEY_LEN]));
        let b = SymmetricKeyProfile::new("b", KeyBytes::new([2; KEY_LEN]));
        let ct = a.encrypt(b"hello").unwrap();
        assert!(b.decrypt(&ct).is_err());
    }

    #[test]
    fn fingerprint_is_stable_and_key_specific() {
        let a1 = SymmetricKeyProfile::new("a", KeyBytes::new([1; KEY_LEN]));
        let a2 = SymmetricKeyProfile::new("renamed", KeyBytes::new([1; KEY_LEN]));
        let b = SymmetricKeyProfile::new("a", KeyBytes::new([2; KEY_LEN]));
        assert_eq!(a1.fingerprint(), a2.fingerprint());
        assert_ne!(a1.fingerprint(), b.fingerprint());
        assert_eq!(a1.fingerprint().unwrap().len(), 11);
    }

    #[test]
    fn debug_hides_key() {
        let profile = SymmetricKeyProfile::new("a", KeyBytes::new([0xAB; KEY_LEN]));
        let rendered = format!("{profile:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(rendered.contains("\"a\""));
    }

    #[test]
    fn spec_builds_rolled_profile() {
        let profile = spec("old", &[3; KEY_LEN], true).to_profile().unwrap();
        assert_eq!(profile.name(), "old");
        assert!(profile.should_be_rolled());
    }

    #[test]
    fn spec_rejects_short_key() {
        let err = spec("short", &[3; 16], false).to_profile().unwrap_err();
        assert!(matches!(err, SealError::InvalidKey(ref n) if n == "short"));
    }

    #[test]
    fn spec_rejects_bad_base64() {
        let mut s = spec("bad", &[3; KEY_LEN], false);
        s.key = "%%%".into();
        assert!(s.to_profile().is_err());
    }

    #[test]
    fn spec_rolled_defaults_to_false() {
        let json = format!(r#"{{"name":"n","key":"{}"}}"#, STANDARD.encode([9u8; KEY_LEN]));
        let s: KeyProfileSpec = serde_json::from_str(&json).unwrap();
        assert!(!s.rolled);
        assert!(!format!("{s:?}").contains(&s.key));
    }
}
