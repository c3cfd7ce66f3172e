//! End-to-end key rolling through the public API.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use keyroll::{
    after_load, before_save, AesGcmSivCipher, Cipher, CipherError, JsonCodec, KeyBytes,
    KeyProfileRegistry, SealError, SealedField, SealedFields, SealedJson, SealedString,
    SealedValue, StoredSealedValue, StringCodec, SymmetricKeyProfile,
};
use serde::{Deserialize, Serialize};

/// Delegates to AES-GCM-SIV while counting calls.
#[derive(Default)]
struct CountingCipher {
    encrypts: AtomicUsize,
    decrypts: AtomicUsize,
}

impl Cipher for CountingCipher {
    fn encrypt(&self, plaintext: &[u8], key: &KeyBytes) -> Result<String, CipherError> {
        self.encrypts.fetch_add(1, Ordering::SeqCst);
        AesGcmSivCipher.encrypt(plaintext, key)
    }

    fn decrypt(&self, ciphertext: &str, key: &KeyBytes) -> Result<Vec<u8>, CipherError> {
        self.decrypts.fetch_add(1, Ordering::SeqCst);
        AesGcmSivCipher.decrypt(ciphertext, key)
    }
}

fn key(byte: u8) -> KeyBytes {
    KeyBytes::new([byte; 32])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Address {
    street: String,
    postcode: String,
}

struct Customer {
    id: u64,
    email: SealedString,
    address: Option<SealedJson<Address>>,
}

impl SealedFields for Customer {
    fn sealed_fields(&mut self) -> Vec<SealedField<'_>> {
        let mut fields = vec![SealedField::new("email", &mut self.email)];
        if let Some(address) = self.address.as_mut() {
            fields.push(SealedField::new("address", address));
        }
        fields
    }
}

/// Row layout a storage layer would write: two columns per sealed field.
struct CustomerRow {
    id: u64,
    email: StoredSealedValue,
    address: Option<StoredSealedValue>,
}

fn save(customer: &mut Customer) -> Result<CustomerRow, SealError> {
    before_save(customer)?;
    Ok(CustomerRow {
        id: customer.id,
        email: customer.email.stored(),
        address: customer.address.as_ref().map(SealedValue::stored),
    })
}

fn load(registry: &KeyProfileRegistry, row: &CustomerRow) -> Result<Customer, SealError> {
    let mut customer = Customer {
        id: row.id,
        email: SealedString::from_stored(registry.clone(), StringCodec, row.email.clone()),
        address: row
            .address
            .clone()
            .map(|stored| SealedValue::from_stored(registry.clone(), JsonCodec::new(), stored)),
    };
    after_load(&mut customer)?;
    Ok(customer)
}

#[test]
fn rolled_profile_moves_to_new_default_on_change() {
    let registry = KeyProfileRegistry::new();
    registry.register(SymmetricKeyProfile::new("A", key(1)));

    let mut value = SealedString::empty(registry.clone());
    value.set_value("secret".into());
    value.seal().unwrap();
    let c1 = value.cipher_text().unwrap().to_owned();
    assert_eq!(value.key_profile(), Some("A"));

    registry.register(SymmetricKeyProfile::new("A", key(1)).rolled(true));
    registry.set_default(SymmetricKeyProfile::new("B", key(2)));

    value.set_value("secret2".into());
    value.seal().unwrap();
    assert_eq!(value.key_profile(), Some("B"));
    assert_ne!(value.cipher_text().unwrap(), c1);

    value.unseal().unwrap();
    assert_eq!(value.get_value().unwrap().unwrap(), "secret2");
}

#[test]
fn entity_round_trip_through_rows() {
    let registry = KeyProfileRegistry::new();
    registry.register(SymmetricKeyProfile::new("2024", key(1)));

    let address = Address {
        street: "1 Main St".into(),
        postcode: "90210".into(),
    };
    let mut customer = Customer {
        id: 7,
        email: SealedString::with_value(registry.clone(), StringCodec, "a@example.com".into()),
        address: Some(SealedValue::with_value(registry.clone(), JsonCodec::new(), address.clone())),
    };

    let row = save(&mut customer).unwrap();
    assert_eq!(row.email.key_profile.as_deref(), Some("2024"));
    assert!(!row.email.cipher_text.as_deref().unwrap().contains("example.com"));

    let mut loaded = load(&registry, &row).unwrap();
    assert_eq!(loaded.email.get_value().unwrap().unwrap(), "a@example.com");
    assert_eq!(loaded.address.as_mut().unwrap().get_value().unwrap(), Some(&address));
}

#[test]
fn untouched_rows_keep_their_profile_after_resave() {
    let registry = KeyProfileRegistry::new();
    registry.register(SymmetricKeyProfile::new("old", key(1)));

    let mut customer = Customer {
        id: 1,
        email: SealedString::with_value(registry.clone(), StringCodec, "a@example.com".into()),
        address: None,
    };
    let row = save(&mut customer).unwrap();

    registry.register(SymmetricKeyProfile::new("old", key(1)).rolled(true));
    registry.set_default(SymmetricKeyProfile::new("new", key(2)));

    let mut loaded = load(&registry, &row).unwrap();
    assert_eq!(loaded.email.get_value().unwrap().unwrap(), "a@example.com");
    let resaved = save(&mut loaded).unwrap();
    assert_eq!(resaved.email, row.email);

    loaded.email.set_value("b@example.com".into());
    let changed = save(&mut loaded).unwrap();
    assert_eq!(changed.email.key_profile.as_deref(), Some("new"));
}

#[test]
fn unseal_decrypts_once_and_clean_seal_never_encrypts() {
    let cipher = Arc::new(CountingCipher::default());
    let registry = KeyProfileRegistry::new();
    registry.register(SymmetricKeyProfile::with_cipher("A", key(1), cipher.clone()));

    let mut value = SealedString::with_value(registry.clone(), StringCodec, "v".into());
    value.seal().unwrap();
    value.seal().unwrap();
    assert_eq!(cipher.encrypts.load(Ordering::SeqCst), 1);

    let mut loaded = SealedString::from_stored(registry, StringCodec, value.stored());
    loaded.unseal().unwrap();
    loaded.unseal().unwrap();
    assert_eq!(loaded.get_value().unwrap().unwrap(), "v");
    assert_eq!(cipher.decrypts.load(Ordering::SeqCst), 1);

    loaded.seal().unwrap();
    assert_eq!(cipher.encrypts.load(Ordering::SeqCst), 1);
}

#[test]
fn retired_profile_without_migration_fails_load() {
    let registry = KeyProfileRegistry::new();
    registry.register(SymmetricKeyProfile::new("A", key(1)));
    let row = CustomerRow {
        id: 3,
        email: StoredSealedValue {
            cipher_text: Some("v1.AAAAAAAAAAAAAAAA.AAAA".into()),
            key_profile: Some("ghost".into()),
        },
        address: None,
    };

    match load(&registry, &row) {
        Err(SealError::KeyProfileNotFound(name)) => assert_eq!(name, "ghost"),
        other => panic!("expected KeyProfileNotFound, got {:?}", other.map(|c| c.id)),
    }
}

#[test]
fn batch_roll_migrates_only_retired_values() {
    let registry = KeyProfileRegistry::new();
    registry.register(SymmetricKeyProfile::new("old", key(1)));
    registry.register(SymmetricKeyProfile::new("keep", key(3)));

    let mut on_old = SealedString::with_value(registry.clone(), StringCodec, "x".into());
    on_old.seal().unwrap();

    let mut on_keep = SealedString::from_stored(
        registry.clone(),
        StringCodec,
        StoredSealedValue {
            cipher_text: None,
            key_profile: Some("keep".into()),
        },
    );
    on_keep.set_value("y".into());
    on_keep.seal().unwrap();
    assert_eq!(on_keep.key_profile(), Some("keep"));

    registry.register(SymmetricKeyProfile::new("old", key(1)).rolled(true));
    registry.set_default(SymmetricKeyProfile::new("new", key(2)));

    let mut values = [on_old, on_keep];
    let migrated = values
        .iter_mut()
        .map(|v| v.roll())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(migrated, [true, false]);
    assert_eq!(values[0].key_profile(), Some("new"));
    assert_eq!(values[1].key_profile(), Some("keep"));
    assert_eq!(values[0].get_value().unwrap().unwrap(), "x");
}
