//! [`SealedValue`]: a field value held either as plaintext or as ciphertext.
//!
//! # States
//!
//! | state     | plaintext      | ciphertext | entered by                       |
//! |-----------|----------------|------------|----------------------------------|
//! | empty     | none           | none       | [`SealedValue::new`]             |
//! | sealed    | none           | valid      | `seal`, [`SealedValue::from_stored`] |
//! | unsealed  | valid, clean   | valid      | `unseal`, first `get_value`      |
//! | dirty     | valid, changed | discarded  | `set_value`                      |
//!
//! Reads are lazy: a loaded value is decrypted on first access. Writes are
//! deferred: `set_value` only records the new plaintext and `seal` encrypts
//! it, under the default profile if the previous profile is being rolled.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::codec::{JsonCodec, PayloadCodec, StringCodec};
use crate::error::SealError;
use crate::registry::KeyProfileRegistry;

/// The two persisted columns of a sealed field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSealedValue {
    /// Encoded ciphertext, opaque to the storage layer.
    pub cipher_text: Option<String>,
    /// Name of the key profile the ciphertext was produced under.
    pub key_profile: Option<String>,
}

/// A sealed text field.
pub type SealedString = SealedValue<StringCodec>;

/// A sealed structured field, stored as JSON before encryption.
pub type SealedJson<T> = SealedValue<JsonCodec<T>>;

enum Plain<T> {
    /// Nothing decrypted yet, or sealed since.
    Sealed,
    /// Decrypted and unchanged. `None` when there was no ciphertext.
    Clean(Option<T>),
    /// Set locally, not yet sealed.
    Dirty(T),
}

/// Holds a plaintext value or its ciphertext, sealing and unsealing through
/// the profiles of a [`KeyProfileRegistry`].
///
/// Not synchronised: callers serialise access to an instance, typically
/// through the owning entity.
pub struct SealedValue<C: PayloadCodec> {
    registry: KeyProfileRegistry,
    codec: C,
    plain: Plain<C::Value>,
    cipher_text: Option<String>,
    key_profile: Option<String>,
}

impl<C: PayloadCodec> SealedValue<C> {
    /// Create an empty value that has never been sealed.
    pub fn new(registry: KeyProfileRegistry, codec: C) -> Self {
        Self::from_stored(registry, codec, StoredSealedValue::default())
    }

    /// Create a value in the sealed state from its persisted columns.
    pub fn from_stored(registry: KeyProfileRegistry, codec: C, stored: StoredSealedValue) -> Self {
        Self {
            registry,
            codec,
            plain: Plain::Sealed,
            cipher_text: stored.cipher_text,
            key_profile: stored.key_profile,
        }
    }

    /// Create a dirty value holding `value`.
    pub fn with_value(registry: KeyProfileRegistry, codec: C, value: C::Value) -> Self {
        let mut sealed = Self::new(registry, codec);
        sealed.set_value(value);
        sealed
    }

    /// Replace the plaintext. The current ciphertext is discarded at once, so
    /// a following read returns `value` without an encryption round trip.
    ///
    /// The previous profile name is kept until the next seal, which uses it to
    /// decide whether the value stays on that profile or rolls to the default.
    pub fn set_value(&mut self, value: C::Value) {
        self.plain = Plain::Dirty(value);
        self.cipher_text = None;
    }

    /// Read the plaintext, unsealing first if needed.
    ///
    /// Returns `Ok(None)` for a value that has never held anything.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`unseal`](Self::unseal).
    pub fn get_value(&mut self) -> Result<Option<&C::Value>, SealError> {
        self.unseal()?;
        Ok(match &self.plain {
            Plain::Sealed => None,
            Plain::Clean(value) => value.as_ref(),
            Plain::Dirty(value) => Some(value),
        })
    }

    /// Consume the value and return its plaintext, unsealing first if needed.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`unseal`](Self::unseal).
    pub fn into_value(mut self) -> Result<Option<C::Value>, SealError> {
        self.unseal()?;
        Ok(match self.plain {
            Plain::Sealed => None,
            Plain::Clean(value) => value,
            Plain::Dirty(value) => Some(value),
        })
    }

    /// Encrypt a changed plaintext. A clean value is left untouched.
    ///
    /// The key profile is the stored one, or the default if the value was
    /// never sealed. A stored profile that should be rolled is replaced by
    /// the default. On failure the plaintext and dirty flag are kept.
    ///
    /// # Errors
    ///
    /// - [`SealError::KeyProfileNotFound`] if the stored profile is not registered.
    /// - [`SealError::Codec`] if the plaintext cannot be encoded.
    /// - [`SealError::Encryption`] if the cipher fails.
    pub fn seal(&mut self) -> Result<(), SealError> {
        let Plain::Dirty(value) = &self.plain else {
            return Ok(());
        };

        let mut profile = self.registry.resolve(self.key_profile.as_deref())?;
        if profile.should_be_rolled() {
            let default = self.registry.default_profile();
            info!(
                from = profile.name(),
                to = default.name(),
                "rolling sealed value onto default key profile"
            );
            profile = default;
        }

        let encoded = self.codec.encode(value)?;
        let cipher_text = profile.encrypt(&encoded).map_err(SealError::Encryption)?;

        self.cipher_text = Some(cipher_text);
        self.key_profile = Some(profile.name().to_owned());
        self.plain = Plain::Sealed;
        debug!(profile = profile.name(), "value sealed");
        Ok(())
    }

    /// Decrypt the stored ciphertext into plaintext.
    ///
    /// Does nothing if the value is already unsealed, or if it is dirty: local
    /// changes are never overwritten by the stale ciphertext.
    ///
    /// # Errors
    ///
    /// - [`SealError::KeyProfileNotFound`] if the stored profile is not registered.
    /// - [`SealError::Decryption`] if the ciphertext is corrupt or under another key.
    /// - [`SealError::Codec`] if the decrypted bytes cannot be decoded.
    pub fn unseal(&mut self) -> Result<(), SealError> {
        if !matches!(self.plain, Plain::Sealed) {
            return Ok(());
        }

        let profile = self.registry.resolve(self.key_profile.as_deref())?;
        let value = match self.cipher_text.as_deref() {
            Some(cipher_text) => {
                let bytes = profile.decrypt(cipher_text).map_err(SealError::Decryption)?;
                Some(self.codec.decode(&bytes)?)
            }
            None => None,
        };

        self.plain = Plain::Clean(value);
        Ok(())
    }

    /// Move the value onto the default profile if its profile should be
    /// rolled, even though the plaintext did not change.
    ///
    /// Returns `true` if the value was re-encrypted under another profile.
    /// Values under a profile that is not being rolled, or already under the
    /// default, are left alone. On failure the value keeps its prior state.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`unseal`](Self::unseal) and [`seal`](Self::seal).
    pub fn roll(&mut self) -> Result<bool, SealError> {
        let Some(previous) = self.key_profile.clone() else {
            return Ok(false);
        };
        if !self.registry.resolve(Some(&previous))?.should_be_rolled() {
            return Ok(false);
        }
        let target = self.registry.default_profile();
        if target.name() == previous {
            return Ok(false);
        }

        if self.is_dirty() {
            self.seal()?;
            return Ok(self.key_profile.as_deref() != Some(previous.as_str()));
        }

        self.unseal()?;
        let Plain::Clean(Some(value)) = &self.plain else {
            return Ok(false);
        };
        let encoded = self.codec.encode(value)?;
        let cipher_text = target.encrypt(&encoded).map_err(SealError::Encryption)?;

        info!(
            from = %previous,
            to = target.name(),
            "rolling sealed value onto default key profile"
        );
        self.cipher_text = Some(cipher_text);
        self.key_profile = Some(target.name().to_owned());
        self.plain = Plain::Sealed;
        Ok(true)
    }

    /// The persisted columns for this value.
    pub fn stored(&self) -> StoredSealedValue {
        StoredSealedValue {
            cipher_text: self.cipher_text.clone(),
            key_profile: self.key_profile.clone(),
        }
    }

    /// Current ciphertext, if sealed and unmodified.
    pub fn cipher_text(&self) -> Option<&str> {
        self.cipher_text.as_deref()
    }

    /// Name of the profile last used to seal this value.
    pub fn key_profile(&self) -> Option<&str> {
        self.key_profile.as_deref()
    }

    /// `true` if the plaintext changed since the last seal.
    pub fn is_dirty(&self) -> bool {
        matches!(self.plain, Plain::Dirty(_))
    }

    /// `true` if the plaintext is currently readable without decryption.
    pub fn is_unsealed(&self) -> bool {
        !matches!(self.plain, Plain::Sealed)
    }
}

impl<C: PayloadCodec + Default> SealedValue<C> {
    /// Create an empty value using the codec's default instance.
    pub fn empty(registry: KeyProfileRegistry) -> Self {
        Self::new(registry, C::default())
    }
}

impl<C: PayloadCodec> fmt::Debug for SealedValue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Plaintext is never rendered.
        f.debug_struct("SealedValue")
            .field("cipher_text", &self.cipher_text)
            .field("key_profile", &self.key_profile)
            .field("dirty", &self.is_dirty())
            .field("unsealed", &self.is_unsealed())
            .finish_non_exhaustive()
    }
}
