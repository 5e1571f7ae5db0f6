//! Encryption keys and the vault's key collection.
//!
//! Each persisted key record wraps 32 bytes of item-encryption material
//! under a passphrase-derived key. Unlocking follows the legacy validation
//! protocol: unwrap the material, then decrypt the record's validation blob
//! with the material itself and compare the two in constant time.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::{CryptoError, KdfParams, KeyMaterial, cipher, kdf};

/// Named security tier a key belongs to, for example `"SL5"`.
///
/// Items that do not record an exact key identifier fall back to the first
/// key carrying their tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct SecurityLevel(String);

impl SecurityLevel {
    pub fn new(level: impl Into<String>) -> Self {
        Self(level.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One record from the vault's key-list document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionKeyRecord {
    pub identifier: String,
    pub level: SecurityLevel,
    /// Base64 scrypt salt.
    pub scrypt_salt: String,
    /// Scrypt N parameter, a power of two.
    pub scrypt_cost_param: u64,
    /// Scrypt r parameter.
    pub scrypt_block_size: u32,
    /// Base64 wrapped key material.
    pub data: String,
    /// Base64 validation blob: the material sealed under itself.
    pub validation: String,
}

/// Errors from parsing a persisted key record.
#[derive(Error, Debug)]
pub enum KeyRecordError {
    #[error("key {identifier}: field `{field}` is not valid base64")]
    Base64 {
        identifier: String,
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("key {identifier}: invalid key-derivation parameters")]
    Kdf {
        identifier: String,
        #[source]
        source: CryptoError,
    },
}

/// Errors from using an encryption key.
#[derive(Error, Debug)]
pub enum KeyError {
    /// Decrypt or encrypt was attempted while the key is locked.
    ///
    /// This is a caller state error, not a recoverable condition.
    #[error("encryption key {identifier} is locked")]
    Locked { identifier: String },

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

enum KeyState {
    Locked,
    Unlocked(KeyMaterial),
}

/// One password-derived encryption key.
///
/// Constructed locked; [`EncryptionKey::unlock`] is the only transition to
/// the unlocked state and there is no way back within a process.
pub struct EncryptionKey {
    identifier: String,
    level: SecurityLevel,
    salt: Vec<u8>,
    kdf: KdfParams,
    data: Vec<u8>,
    validation: Vec<u8>,
    state: KeyState,
}

impl EncryptionKey {
    /// Build a key from its persisted record. The key starts locked.
    pub fn from_record(record: EncryptionKeyRecord) -> Result<Self, KeyRecordError> {
        let decode = |field: &'static str, value: &str| {
            BASE64
                .decode(value)
                .map_err(|source| KeyRecordError::Base64 {
                    identifier: record.identifier.clone(),
                    field,
                    source,
                })
        };
        let salt = decode("scryptSalt", &record.scrypt_salt)?;
        let data = decode("data", &record.data)?;
        let validation = decode("validation", &record.validation)?;
        let kdf = KdfParams::new(record.scrypt_cost_param, record.scrypt_block_size).map_err(
            |source| KeyRecordError::Kdf {
                identifier: record.identifier.clone(),
                source,
            },
        )?;
        Ok(Self {
            identifier: record.identifier,
            level: record.level,
            salt,
            kdf,
            data,
            validation,
            state: KeyState::Locked,
        })
    }

    /// Validate `password` against this key's stored integrity check.
    ///
    /// On success the key transitions to unlocked and `true` is returned.
    /// Any failure leaves the key locked with no partial state and returns
    /// `false`; a wrong password and a tampered record are indistinguishable
    /// here, which is inherent to the format.
    pub fn unlock(&mut self, password: &str) -> bool {
        let Ok(kek) = kdf::derive_key(password, &self.salt, &self.kdf) else {
            return false;
        };
        let Ok(unwrapped) = cipher::open(&kek, &self.data).map(Zeroizing::new) else {
            return false;
        };
        let Ok(material) = KeyMaterial::from_bytes(&unwrapped) else {
            return false;
        };
        // Legacy validation protocol: the validation blob decrypts to the
        // key material itself.
        match cipher::open(&material, &self.validation).map(Zeroizing::new) {
            Ok(check) if material.ct_eq_bytes(&check) => {
                self.state = KeyState::Unlocked(material);
                true
            }
            _ => false,
        }
    }

    /// Decrypt an item ciphertext blob with this key.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, KeyError> {
        Ok(cipher::open(self.material()?, blob)?)
    }

    /// Encrypt an item payload with this key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
        Ok(cipher::seal(self.material()?, plaintext)?)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn level(&self) -> &SecurityLevel {
        &self.level
    }

    /// Whether this key has been unlocked.
    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, KeyState::Unlocked(_))
    }

    fn material(&self) -> Result<&KeyMaterial, KeyError> {
        match &self.state {
            KeyState::Unlocked(material) => Ok(material),
            KeyState::Locked => Err(KeyError::Locked {
                identifier: self.identifier.clone(),
            }),
        }
    }
}

/// All encryption keys of a vault, in key-list document order.
#[derive(Default)]
pub struct KeyRing {
    keys: Vec<EncryptionKey>,
}

impl KeyRing {
    pub fn from_records(records: Vec<EncryptionKeyRecord>) -> Result<Self, KeyRecordError> {
        let keys = records
            .into_iter()
            .map(EncryptionKey::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { keys })
    }

    /// Attempt to unlock every key with `password`.
    ///
    /// Every key is attempted even after a failure, so per-key lock state
    /// stays observable for diagnostics. The return value is the
    /// conjunction of all outcomes.
    pub fn unlock_all(&mut self, password: &str) -> bool {
        let mut all_unlocked = true;
        for key in &mut self.keys {
            let unlocked = key.unlock(password);
            debug!(identifier = key.identifier(), unlocked, "key unlock attempt");
            all_unlocked &= unlocked;
        }
        all_unlocked
    }

    /// Resolve a key by exact identifier, falling back to the first key in
    /// document order carrying `level`.
    pub fn find(
        &self,
        identifier: Option<&str>,
        level: Option<&SecurityLevel>,
    ) -> Option<&EncryptionKey> {
        if let Some(identifier) = identifier {
            if let Some(key) = self.keys.iter().find(|key| key.identifier() == identifier) {
                return Some(key);
            }
        }
        let level = level?;
        self.keys.iter().find(|key| key.level() == level)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EncryptionKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
