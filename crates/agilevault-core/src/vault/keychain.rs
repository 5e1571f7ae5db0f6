//! The vault aggregate: keys, items, unlock protocol, and name lookup.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::item::{DecryptError, ItemKind, KeychainItem};
use super::key::{EncryptionKey, EncryptionKeyRecord, KeyRecordError, KeyRing, SecurityLevel};
use super::matcher;

const KEY_LIST_FILE: &str = "encryptionKeys.js";
const ITEM_INDEX_FILE: &str = "contents.js";

/// Serde mirror of the key-list document.
#[derive(Deserialize)]
struct KeyListDocument {
    list: Vec<EncryptionKeyRecord>,
}

/// Errors from opening a vault.
#[derive(Error, Debug)]
pub enum KeychainError {
    #[error("failed to read vault document {path}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed vault document {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An item-index row does not have the (identifier, type, name) shape.
    #[error("malformed item index row {index} in {path}")]
    MalformedRow { path: PathBuf, index: usize },

    #[error(transparent)]
    KeyRecord(#[from] KeyRecordError),
}

/// Vault-wide lock state. Individual keys stay queryable, but the aggregate
/// decision is owned here and transitioned only by [`Keychain::unlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockState {
    Locked,
    Unlocked,
}

/// An open vault.
pub struct Keychain {
    keys: KeyRing,
    items: BTreeMap<String, KeychainItem>,
    state: LockState,
}

impl Keychain {
    /// Open the vault at `path`, loading the key list and the item index.
    ///
    /// Per-item backing records are not touched here; each item loads its
    /// own record lazily on first access.
    #[instrument(level = "info", name = "keychain::open", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KeychainError> {
        let data_dir = path.as_ref().join("data").join("default");
        let keys = Self::load_keys(&data_dir)?;
        let items = Self::load_items(&data_dir)?;
        info!(keys = keys.len(), items = items.len(), "opened vault");
        Ok(Self {
            keys,
            items,
            state: LockState::Locked,
        })
    }

    /// Unlock the vault by validating `password` against every key.
    ///
    /// All keys are attempted; the vault unlocks only when every key
    /// validates. A wrong password returns `false` and leaves the vault
    /// locked rather than erroring. Repeated calls are safe.
    #[instrument(level = "info", name = "keychain::unlock", skip_all)]
    pub fn unlock(&mut self, password: &str) -> bool {
        let unlocked = self.keys.unlock_all(password);
        self.state = if unlocked {
            LockState::Unlocked
        } else {
            LockState::Locked
        };
        info!(unlocked, "vault unlock attempt");
        unlocked
    }

    /// Whether the vault is still locked.
    pub fn locked(&self) -> bool {
        self.state == LockState::Locked
    }

    /// Resolve an encryption key by exact identifier, falling back to the
    /// first key carrying `level`. Returns `None` when neither matches or
    /// neither criterion was given.
    pub fn key(
        &self,
        identifier: Option<&str>,
        level: Option<&SecurityLevel>,
    ) -> Option<&EncryptionKey> {
        self.keys.find(identifier, level)
    }

    /// All encryption keys, in key-list document order.
    pub fn keys(&self) -> impl Iterator<Item = &EncryptionKey> {
        self.keys.iter()
    }

    /// Item names, alphabetically sorted.
    pub fn get_items(&self) -> Vec<&str> {
        self.items.keys().map(String::as_str).collect()
    }

    /// Loaded items, in name order.
    pub fn items(&self) -> impl Iterator<Item = &KeychainItem> {
        self.items.values()
    }

    /// Look up an item by fuzzy name match and decrypt it.
    ///
    /// `fuzzy_threshold` is the minimum similarity score (0-100) a stored
    /// name must reach; 100 requires an exact match. Returns `Ok(None)`
    /// when no name qualifies. On a match the item is decrypted before it
    /// is returned, so the caller always receives a fully populated item or
    /// an error.
    #[instrument(level = "debug", name = "keychain::item", skip(self))]
    pub fn item(
        &mut self,
        name: &str,
        fuzzy_threshold: u8,
    ) -> Result<Option<&KeychainItem>, DecryptError> {
        let Some(matched) = matcher::best_match(
            name,
            self.items.keys().map(String::as_str),
            fuzzy_threshold,
        ) else {
            return Ok(None);
        };
        let matched = matched.to_owned();
        let Some(item) = self.items.get_mut(&matched) else {
            return Ok(None);
        };
        item.decrypt_with(&self.keys)?;
        Ok(Some(item))
    }

    fn load_keys(data_dir: &Path) -> Result<KeyRing, KeychainError> {
        let path = data_dir.join(KEY_LIST_FILE);
        let raw = fs::read_to_string(&path).map_err(|source| KeychainError::Storage {
            path: path.clone(),
            source,
        })?;
        let document: KeyListDocument =
            serde_json::from_str(&raw).map_err(|source| KeychainError::Parse { path, source })?;
        Ok(KeyRing::from_records(document.list)?)
    }

    fn load_items(data_dir: &Path) -> Result<BTreeMap<String, KeychainItem>, KeychainError> {
        let path = data_dir.join(ITEM_INDEX_FILE);
        let raw = fs::read_to_string(&path).map_err(|source| KeychainError::Storage {
            path: path.clone(),
            source,
        })?;
        let rows: Vec<Vec<Value>> = serde_json::from_str(&raw).map_err(|source| {
            KeychainError::Parse {
                path: path.clone(),
                source,
            }
        })?;

        let mut items = BTreeMap::new();
        for (index, row) in rows.iter().enumerate() {
            // Rows may carry trailing elements (URLs, folders); only the
            // leading triple matters.
            let (Some(identifier), Some(type_name), Some(name)) = (
                row.first().and_then(Value::as_str),
                row.get(1).and_then(Value::as_str),
                row.get(2).and_then(Value::as_str),
            ) else {
                return Err(KeychainError::MalformedRow { path, index });
            };
            let kind = ItemKind::from_type_name(type_name);
            let item = KeychainItem::new(
                identifier.to_owned(),
                name.to_owned(),
                kind,
                data_dir.to_path_buf(),
            );
            if let Some(previous) = items.insert(name.to_owned(), item) {
                // Last record wins, matching the legacy reader.
                warn!(
                    name = previous.name(),
                    "duplicate item name in index, keeping the later record"
                );
            }
        }
        Ok(items)
    }
}
