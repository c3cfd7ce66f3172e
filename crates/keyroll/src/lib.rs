//! Sealed field values with named key profiles and automatic key rolling.
//!
//! A [`SealedValue`] holds one persisted attribute either as plaintext or as
//! ciphertext. Alongside the ciphertext it records the name of the
//! [`KeyProfile`] that produced it, so the right key is chosen on unseal.
//! When that profile is marked to be rolled, the next modification of the
//! value re-encrypts it under the registry's default profile.
//!
//! ```
//! use keyroll::{KeyBytes, KeyProfileRegistry, SealedString, SymmetricKeyProfile};
//!
//! let registry = KeyProfileRegistry::new();
//! registry.register(SymmetricKeyProfile::new("2024", KeyBytes::new([7; 32])));
//!
//! let mut email = SealedString::empty(registry.clone());
//! email.set_value("alice@example.com".into());
//! email.seal()?;
//! let stored = email.stored();
//! assert_eq!(stored.key_profile.as_deref(), Some("2024"));
//!
//! let mut loaded = SealedString::from_stored(registry, Default::default(), stored);
//! assert_eq!(loaded.get_value()?.map(String::as_str), Some("alice@example.com"));
//! # Ok::<(), keyroll::SealError>(())
//! ```

pub mod codec;
pub mod crypto;
pub mod error;
pub mod lifecycle;
pub mod profile;
pub mod registry;
pub mod value;

pub use codec::{JsonCodec, PayloadCodec, StringCodec};
pub use crypto::{AesGcmSivCipher, Cipher};
pub use error::{CipherError, CodecError, SealError};
pub use lifecycle::{after_load, before_save, Sealable, SealedField, SealedFields};
pub use profile::{KeyBytes, KeyProfile, KeyProfileSpec, SymmetricKeyProfile};
pub use registry::KeyProfileRegistry;
pub use value::{SealedJson, SealedString, SealedValue, StoredSealedValue};
