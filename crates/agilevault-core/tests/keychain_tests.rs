mod common;

use agilevault_core::Keychain;
use agilevault_core::error::{CryptoError, DecryptError, KeyError, KeychainError};
use agilevault_core::vault::SecurityLevel;
use common::{ItemSpec, KeySpec, build_vault, simple_vault};
use serde_json::json;

#[test]
fn fuzzy_lookup_decrypts_the_matched_item() {
    let vault = simple_vault();
    let mut keychain = Keychain::open(vault.path()).unwrap();

    assert!(keychain.unlock("correct-pw"));
    assert!(!keychain.locked());

    let item = keychain.item("Example Logn", 70).unwrap().expect("match");
    assert_eq!(item.name(), "Example Login");
    assert!(item.is_decrypted());
    assert_eq!(item.password(), Some("p@ss"));
    assert_eq!(item.username(), Some("alice"));

    // The same typo at an exact-match threshold finds nothing.
    assert!(keychain.item("Example Logn", 100).unwrap().is_none());
}

#[test]
fn lookup_is_repeatable() {
    let vault = simple_vault();
    let mut keychain = Keychain::open(vault.path()).unwrap();
    assert!(keychain.unlock("correct-pw"));

    for _ in 0..2 {
        let item = keychain.item("Example Login", 100).unwrap().expect("match");
        assert_eq!(item.password(), Some("p@ss"));
    }
}

#[test]
fn wrong_password_leaves_the_vault_locked() {
    let vault = simple_vault();
    let mut keychain = Keychain::open(vault.path()).unwrap();

    assert!(!keychain.unlock("wrong-pw"));
    assert!(keychain.locked());

    // A lookup that reaches the decrypt step fails as a state error.
    assert!(matches!(
        keychain.item("Example Login", 100),
        Err(DecryptError::Key(KeyError::Locked { .. }))
    ));
}

#[test]
fn unlock_is_the_conjunction_of_all_keys() {
    let vault = build_vault(
        &[
            KeySpec {
                identifier: "K1",
                level: "SL3",
                password: "tier-three",
            },
            KeySpec {
                identifier: "K2",
                level: "SL5",
                password: "tier-five",
            },
        ],
        &[],
    );
    let mut keychain = Keychain::open(vault.path()).unwrap();

    // The password is right for one tier only, so the vault stays locked,
    // but the matching key's own state is observable.
    assert!(!keychain.unlock("tier-three"));
    assert!(keychain.locked());
    let states: Vec<(&str, bool)> = keychain
        .keys()
        .map(|key| (key.identifier(), key.is_unlocked()))
        .collect();
    assert_eq!(states, vec![("K1", true), ("K2", false)]);
}

#[test]
fn key_resolution_prefers_identifier_over_level() {
    let vault = build_vault(
        &[
            KeySpec {
                identifier: "K1",
                level: "SL5",
                password: "pw",
            },
            KeySpec {
                identifier: "K2",
                level: "SL5",
                password: "pw",
            },
        ],
        &[ItemSpec {
            security_level: Some("SL5"),
            ..ItemSpec::password_item("A1", "Account", "K2", json!({"password": "x"}))
        }],
    );
    let mut keychain = Keychain::open(vault.path()).unwrap();

    let level = SecurityLevel::new("SL5");
    // K1 also carries SL5, but the explicit identifier wins.
    assert_eq!(
        keychain.key(Some("K2"), Some(&level)).unwrap().identifier(),
        "K2"
    );
    // An unknown identifier falls back to the first SL5 key.
    assert_eq!(
        keychain
            .key(Some("missing"), Some(&level))
            .unwrap()
            .identifier(),
        "K1"
    );
    assert!(keychain.key(None, None).is_none());

    // The item records both criteria; decryption must pick K2.
    assert!(keychain.unlock("pw"));
    let item = keychain.item("Account", 100).unwrap().expect("match");
    assert_eq!(item.password(), Some("x"));
}

#[test]
fn item_without_key_identifier_resolves_by_level() {
    let vault = build_vault(
        &[
            KeySpec {
                identifier: "K1",
                level: "SL3",
                password: "pw",
            },
            KeySpec {
                identifier: "K2",
                level: "SL5",
                password: "pw",
            },
        ],
        &[ItemSpec {
            identifier: "A1",
            type_name: "passwords.Password",
            name: "Tiered",
            key_id: None,
            security_level: Some("SL5"),
            payload: json!({"password": "tiered-pw"}),
            padding: 0,
        }],
    );
    let mut keychain = Keychain::open(vault.path()).unwrap();
    assert!(keychain.unlock("pw"));
    let item = keychain.item("Tiered", 100).unwrap().expect("match");
    assert_eq!(item.password(), Some("tiered-pw"));
}

#[test]
fn unresolvable_key_reference_is_an_error() {
    let vault = build_vault(
        &[KeySpec {
            identifier: "K1",
            level: "SL5",
            password: "pw",
        }],
        &[ItemSpec {
            identifier: "A1",
            type_name: "passwords.Password",
            name: "Orphan",
            key_id: Some("missing"),
            security_level: Some("SL99"),
            payload: json!({"password": "x"}),
            padding: 0,
        }],
    );
    let mut keychain = Keychain::open(vault.path()).unwrap();
    assert!(keychain.unlock("pw"));
    assert!(matches!(
        keychain.item("Orphan", 100),
        Err(DecryptError::KeyNotFound { .. })
    ));
}

#[test]
fn get_items_is_sorted_and_idempotent() {
    let vault = build_vault(
        &[KeySpec {
            identifier: "K1",
            level: "SL5",
            password: "pw",
        }],
        &[
            ItemSpec::password_item("A1", "zebra", "K1", json!({"password": "z"})),
            ItemSpec::password_item("A2", "Apple", "K1", json!({"password": "a"})),
            ItemSpec::password_item("A3", "mango", "K1", json!({"password": "m"})),
        ],
    );
    let keychain = Keychain::open(vault.path()).unwrap();

    let first = keychain.get_items();
    let second = keychain.get_items();
    assert_eq!(first, second);
    assert_eq!(first, vec!["Apple", "mango", "zebra"]);
}

#[test]
fn duplicate_item_names_keep_the_later_record() {
    let vault = build_vault(
        &[KeySpec {
            identifier: "K1",
            level: "SL5",
            password: "pw",
        }],
        &[
            ItemSpec::password_item("A1", "Twin", "K1", json!({"password": "first"})),
            ItemSpec::password_item("A2", "Twin", "K1", json!({"password": "second"})),
        ],
    );
    let mut keychain = Keychain::open(vault.path()).unwrap();
    assert!(keychain.unlock("pw"));

    assert_eq!(keychain.get_items(), vec!["Twin"]);
    let item = keychain.item("Twin", 100).unwrap().expect("match");
    assert_eq!(item.identifier(), "A2");
    assert_eq!(item.password(), Some("second"));
}

#[test]
fn webform_items_extract_labeled_fields() {
    let vault = build_vault(
        &[KeySpec {
            identifier: "K1",
            level: "SL5",
            password: "pw",
        }],
        &[ItemSpec {
            identifier: "W1",
            type_name: "webforms.WebForm",
            name: "Example Site",
            key_id: Some("K1"),
            security_level: None,
            payload: json!({
                "fields": [
                    {"designation": "username", "name": "email", "value": "alice@example.com"},
                    {"designation": "password", "name": "pw", "value": "s3cret"},
                ]
            }),
            padding: 0,
        }],
    );
    let mut keychain = Keychain::open(vault.path()).unwrap();
    assert!(keychain.unlock("pw"));

    let item = keychain.item("Example Site", 100).unwrap().expect("match");
    assert_eq!(item.username(), Some("alice@example.com"));
    assert_eq!(item.password(), Some("s3cret"));
}

#[test]
fn generic_items_cannot_yield_credentials() {
    let vault = build_vault(
        &[KeySpec {
            identifier: "K1",
            level: "SL5",
            password: "pw",
        }],
        &[ItemSpec {
            identifier: "N1",
            type_name: "notes.SecureNote",
            name: "Shopping List",
            key_id: Some("K1"),
            security_level: None,
            payload: json!({"note": "eggs, milk"}),
            padding: 0,
        }],
    );
    let mut keychain = Keychain::open(vault.path()).unwrap();
    assert!(keychain.unlock("pw"));
    assert!(matches!(
        keychain.item("Shopping List", 100),
        Err(DecryptError::UnsupportedItemType { .. })
    ));
}

#[test]
fn padded_payloads_decrypt_cleanly() {
    let vault = build_vault(
        &[KeySpec {
            identifier: "K1",
            level: "SL5",
            password: "pw",
        }],
        &[ItemSpec {
            padding: 9,
            ..ItemSpec::password_item("A1", "Padded", "K1", json!({"password": "padded-pw"}))
        }],
    );
    let mut keychain = Keychain::open(vault.path()).unwrap();
    assert!(keychain.unlock("pw"));
    let item = keychain.item("Padded", 100).unwrap().expect("match");
    assert_eq!(item.password(), Some("padded-pw"));
}

#[test]
fn unlocked_keys_roundtrip_payloads() {
    let vault = simple_vault();
    let mut keychain = Keychain::open(vault.path()).unwrap();
    assert!(keychain.unlock("correct-pw"));

    let key = keychain.key(Some("K1"), None).expect("key");
    let blob = key.encrypt(b"{\"password\":\"round\"}").unwrap();
    assert_eq!(key.decrypt(&blob).unwrap(), b"{\"password\":\"round\"}");

    // Tampering with the blob is detected, not decrypted to garbage.
    let mut tampered = blob;
    tampered[20] ^= 0x01;
    assert!(matches!(
        key.decrypt(&tampered),
        Err(KeyError::Crypto(CryptoError::IntegrityCheckFailed))
    ));
}

#[test]
fn missing_documents_surface_as_storage_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Keychain::open(dir.path()),
        Err(KeychainError::Storage { .. })
    ));
}
