//! Save/load hooks for entities that own sealed fields.
//!
//! A persistence layer calls [`before_save`] right before writing an entity
//! and [`after_load`] right after reading one. The entity lists its sealed
//! fields through [`SealedFields`]; absent optional fields are simply left
//! out of the list.
//!
//! ```
//! use keyroll::{SealedField, SealedFields, SealedString};
//!
//! struct Customer {
//!     email: SealedString,
//!     phone: Option<SealedString>,
//! }
//!
//! impl SealedFields for Customer {
//!     fn sealed_fields(&mut self) -> Vec<SealedField<'_>> {
//!         let mut fields = vec![SealedField::new("email", &mut self.email)];
//!         if let Some(phone) = self.phone.as_mut() {
//!             fields.push(SealedField::new("phone", phone));
//!         }
//!         fields
//!     }
//! }
//! ```

use tracing::warn;

use crate::codec::PayloadCodec;
use crate::error::SealError;
use crate::value::SealedValue;

/// Anything that can be sealed before save and unsealed after load.
pub trait Sealable {
    /// Encrypt pending changes.
    fn seal(&mut self) -> Result<(), SealError>;

    /// Decrypt stored ciphertext.
    fn unseal(&mut self) -> Result<(), SealError>;
}

impl<C: PayloadCodec> Sealable for SealedValue<C> {
    fn seal(&mut self) -> Result<(), SealError> {
        SealedValue::seal(self)
    }

    fn unseal(&mut self) -> Result<(), SealError> {
        SealedValue::unseal(self)
    }
}

/// A named, mutably borrowed sealed field of an entity.
pub struct SealedField<'a> {
    /// Field name, used in log events.
    pub name: &'static str,
    /// The field itself.
    pub value: &'a mut dyn Sealable,
}

impl<'a> SealedField<'a> {
    /// Pair a field name with its value.
    pub fn new(name: &'static str, value: &'a mut dyn Sealable) -> Self {
        Self { name, value }
    }
}

/// An entity owning sealed fields.
pub trait SealedFields {
    /// Every sealed field currently present on the entity.
    fn sealed_fields(&mut self) -> Vec<SealedField<'_>>;
}

/// Seal every sealed field of `entity`. Call before persisting it.
///
/// # Errors
///
/// Stops at the first failing field and returns its error unchanged; the
/// save must not go ahead.
pub fn before_save<E: SealedFields + ?Sized>(entity: &mut E) -> Result<(), SealError> {
    for field in entity.sealed_fields() {
        field.value.seal().inspect_err(|e| {
            warn!(field = field.name, error = %e, "sealing field failed");
        })?;
    }
    Ok(())
}

/// Unseal every sealed field of `entity`. Call after loading it.
///
/// # Errors
///
/// Stops at the first failing field and returns its error unchanged; the
/// load must not be treated as successful.
pub fn after_load<E: SealedFields + ?Sized>(entity: &mut E) -> Result<(), SealError> {
    for field in entity.sealed_fields() {
        field.value.unseal().inspect_err(|e| {
            warn!(field = field.name, error = %e, "unsealing field failed");
        })?;
    }
    Ok(())
}
