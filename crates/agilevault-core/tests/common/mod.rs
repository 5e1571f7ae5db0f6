//! Shared fixture that writes real vault directories for integration tests.
//!
//! The reader has no write path, so the fixture assembles the on-disk
//! documents itself through the public crypto primitives.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use serde_json::{Value, json};
use tempfile::TempDir;

use agilevault_core::crypto::{KdfParams, KeyMaterial, cipher, kdf};

/// Cheap scrypt parameters so tests stay fast.
pub const TEST_COST: u64 = 16;
pub const TEST_BLOCK_SIZE: u32 = 8;

pub struct KeySpec {
    pub identifier: &'static str,
    pub level: &'static str,
    pub password: &'static str,
}

pub struct ItemSpec {
    pub identifier: &'static str,
    pub type_name: &'static str,
    pub name: &'static str,
    /// `keyID` recorded in the backing record, if any.
    pub key_id: Option<&'static str>,
    /// `securityLevel` recorded in the backing record, if any.
    pub security_level: Option<&'static str>,
    pub payload: Value,
    /// Number of trailing 0x10 sentinel bytes appended to the plaintext.
    pub padding: usize,
}

impl ItemSpec {
    pub fn password_item(
        identifier: &'static str,
        name: &'static str,
        key_id: &'static str,
        payload: Value,
    ) -> Self {
        Self {
            identifier,
            type_name: "passwords.Password",
            name,
            key_id: Some(key_id),
            security_level: None,
            payload,
            padding: 0,
        }
    }
}

pub struct VaultFixture {
    dir: TempDir,
}

impl VaultFixture {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Write a complete vault directory from the given key and item specs.
pub fn build_vault(keys: &[KeySpec], items: &[ItemSpec]) -> VaultFixture {
    let dir = TempDir::new().expect("create temp dir");
    let data_dir = dir.path().join("data").join("default");
    fs::create_dir_all(&data_dir).expect("create data dir");

    let mut materials: HashMap<&str, KeyMaterial> = HashMap::new();
    let mut key_records = Vec::new();
    for spec in keys {
        let mut salt = [0u8; 16];
        rand::rng().fill_bytes(&mut salt);
        let mut material_bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut material_bytes);
        let material = KeyMaterial::from_bytes(&material_bytes).expect("key material");
        let params = KdfParams::new(TEST_COST, TEST_BLOCK_SIZE).expect("kdf params");
        let kek = kdf::derive_key(spec.password, &salt, &params).expect("derive kek");
        let data = cipher::seal(&kek, &material_bytes).expect("wrap material");
        let validation = cipher::seal(&material, &material_bytes).expect("validation blob");
        key_records.push(json!({
            "identifier": spec.identifier,
            "level": spec.level,
            "scryptSalt": BASE64.encode(salt),
            "scryptCostParam": TEST_COST,
            "scryptBlockSize": TEST_BLOCK_SIZE,
            "data": BASE64.encode(&data),
            "validation": BASE64.encode(&validation),
        }));
        materials.insert(spec.identifier, material);
    }
    fs::write(
        data_dir.join("encryptionKeys.js"),
        serde_json::to_vec_pretty(&json!({ "list": key_records })).expect("serialize key list"),
    )
    .expect("write key list");

    let mut index = Vec::new();
    for spec in items {
        index.push(json!([spec.identifier, spec.type_name, spec.name]));

        let material = material_for(&materials, keys, spec);
        let mut plaintext = serde_json::to_vec(&spec.payload).expect("serialize payload");
        plaintext.resize(plaintext.len() + spec.padding, 0x10);
        let encrypted = cipher::seal(material, &plaintext).expect("seal payload");

        let mut record = json!({ "encrypted": BASE64.encode(&encrypted) });
        if let Some(key_id) = spec.key_id {
            record["keyID"] = json!(key_id);
        }
        if let Some(level) = spec.security_level {
            record["securityLevel"] = json!(level);
        }
        fs::write(
            data_dir.join(format!("{}.1password", spec.identifier)),
            serde_json::to_vec_pretty(&record).expect("serialize item record"),
        )
        .expect("write item record");
    }
    fs::write(
        data_dir.join("contents.js"),
        serde_json::to_vec_pretty(&index).expect("serialize item index"),
    )
    .expect("write item index");

    VaultFixture { dir }
}

/// Pick the material the reader will resolve for this item: exact key id
/// first, then the first key with the item's level, then the first key.
fn material_for<'a>(
    materials: &'a HashMap<&str, KeyMaterial>,
    keys: &[KeySpec],
    item: &ItemSpec,
) -> &'a KeyMaterial {
    if let Some(id) = item.key_id {
        if let Some(material) = materials.get(id) {
            return material;
        }
    }
    if let Some(level) = item.security_level {
        if let Some(spec) = keys.iter().find(|key| key.level == level) {
            return &materials[spec.identifier];
        }
    }
    &materials[keys[0].identifier]
}

/// One key (`K1`/`SL5`, password `correct-pw`) protecting one password item
/// named "Example Login".
pub fn simple_vault() -> VaultFixture {
    build_vault(
        &[KeySpec {
            identifier: "K1",
            level: "SL5",
            password: "correct-pw",
        }],
        &[ItemSpec {
            padding: 4,
            ..ItemSpec::password_item(
                "A1B2C3",
                "Example Login",
                "K1",
                json!({"password": "p@ss", "username": "alice"}),
            )
        }],
    )
}
