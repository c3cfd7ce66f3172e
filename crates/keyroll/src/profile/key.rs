//! [`KeyBytes`]: fixed-size symmetric key buffer.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::KEY_LEN;

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// The bytes are zeroized when the buffer is dropped and are never rendered
/// by `Debug`. Not `Clone`: each key lives in exactly one buffer.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyBytes(Box<[u8; KEY_LEN]>);

impl KeyBytes {
    /// Wrap an owned key array.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(Box::new(bytes))
    }

    /// Copy key material from a slice, returning `None` unless it is exactly
    /// [`KEY_LEN`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != KEY_LEN {
            return None;
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Some(Self(buf))
    }

    /// Borrow the raw key bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0[..]
    }
}

impl fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyBytes([REDACTED])")
    }
}
