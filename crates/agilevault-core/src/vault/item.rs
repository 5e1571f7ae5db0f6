//! Keychain items: lazy metadata loading and credential extraction.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::key::{KeyError, KeyRing, SecurityLevel};

/// Padding sentinel byte appended to payloads by the historical format.
const PADDING_SENTINEL: u8 = 0x10;

/// Closed set of item variants, mapped once from the persisted type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// No recoverable credential fields.
    Generic,
    /// Saved web form; credentials live in a labeled field list.
    WebForm,
    /// Standalone password or online-service account.
    PasswordAccount,
}

impl ItemKind {
    /// Map a persisted type name to its variant. Unrecognized names fall
    /// back to [`ItemKind::Generic`].
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name {
            "webforms.WebForm" => ItemKind::WebForm,
            "passwords.Password" | "wallet.onlineservices.GenericAccount" => {
                ItemKind::PasswordAccount
            }
            _ => ItemKind::Generic,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemKind::Generic => "generic",
            ItemKind::WebForm => "web form",
            ItemKind::PasswordAccount => "password",
        };
        f.write_str(name)
    }
}

/// Serde mirror of a per-item backing record on disk.
#[derive(Deserialize)]
struct ItemDocument {
    #[serde(rename = "keyID")]
    key_id: Option<String>,
    #[serde(rename = "securityLevel")]
    security_level: Option<SecurityLevel>,
    encrypted: String,
}

/// Lazily-loaded metadata of one item.
#[derive(Debug, Clone)]
pub struct ItemRecord {
    key_identifier: Option<String>,
    security_level: Option<SecurityLevel>,
    ciphertext: Vec<u8>,
}

/// Errors from reading an item's backing record.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("failed to read item record {path}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed item record {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("item record {path}: field `encrypted` is not valid base64")]
    Base64 {
        path: PathBuf,
        #[source]
        source: base64::DecodeError,
    },
}

/// Errors from decrypting an item.
#[derive(Error, Debug)]
pub enum DecryptError {
    #[error(transparent)]
    Record(#[from] ItemError),

    /// No key matched the item's recorded identifier or security level.
    #[error(
        "no encryption key matches item {item} (key id {key_identifier:?}, level {security_level:?})"
    )]
    KeyNotFound {
        item: String,
        key_identifier: Option<String>,
        security_level: Option<SecurityLevel>,
    },

    #[error(transparent)]
    Key(#[from] KeyError),

    /// The decrypted bytes are not the JSON structure the variant expects.
    #[error("item {item}: decrypted payload is not valid JSON")]
    Payload {
        item: String,
        #[source]
        source: serde_json::Error,
    },

    /// The variant carries no recoverable credential fields.
    #[error("cannot extract credentials from a {kind} item")]
    UnsupportedItemType { kind: ItemKind },
}

enum ItemState {
    Unloaded,
    MetadataLoaded(ItemRecord),
    Decrypted { record: ItemRecord, payload: Value },
}

/// One stored credential.
///
/// Lifecycle: `Unloaded` → first metadata access reads the backing record →
/// `MetadataLoaded` → [`KeychainItem::decrypt_with`] → `Decrypted`. There is
/// no transition back; the record loads at most once, while repeated decrypt
/// calls re-run decryption.
pub struct KeychainItem {
    identifier: String,
    name: String,
    kind: ItemKind,
    data_dir: PathBuf,
    username: Option<String>,
    password: Option<String>,
    state: ItemState,
}

impl KeychainItem {
    pub(crate) fn new(identifier: String, name: String, kind: ItemKind, data_dir: PathBuf) -> Self {
        Self {
            identifier,
            name,
            kind,
            data_dir,
            username: None,
            password: None,
            state: ItemState::Unloaded,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Username extracted by the last successful decryption.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Password extracted by the last successful decryption.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn is_decrypted(&self) -> bool {
        matches!(self.state, ItemState::Decrypted { .. })
    }

    /// Decrypted structured payload, present once decryption succeeded.
    pub fn payload(&self) -> Option<&Value> {
        match &self.state {
            ItemState::Decrypted { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Key identifier from the backing record, loading it on first access.
    pub fn key_identifier(&mut self) -> Result<Option<&str>, ItemError> {
        Ok(self.record()?.key_identifier.as_deref())
    }

    /// Security level from the backing record, loading it on first access.
    pub fn security_level(&mut self) -> Result<Option<&SecurityLevel>, ItemError> {
        Ok(self.record()?.security_level.as_ref())
    }

    /// Decrypt this item against the vault's key ring.
    ///
    /// Resolves the protecting key by the recorded key identifier, falling
    /// back to the recorded security level; decrypts the ciphertext blob;
    /// strips the historical padding sentinel; and extracts the variant's
    /// credential fields. The item is mutated only after the whole chain
    /// succeeded, so callers never observe a partially decrypted item.
    pub fn decrypt_with(&mut self, keys: &KeyRing) -> Result<(), DecryptError> {
        let record = self.record()?.clone();
        let key = keys
            .find(record.key_identifier.as_deref(), record.security_level.as_ref())
            .ok_or_else(|| DecryptError::KeyNotFound {
                item: self.name.clone(),
                key_identifier: record.key_identifier.clone(),
                security_level: record.security_level.clone(),
            })?;
        let mut plaintext = key.decrypt(&record.ciphertext)?;
        while plaintext.last() == Some(&PADDING_SENTINEL) {
            plaintext.pop();
        }
        let payload: Value =
            serde_json::from_slice(&plaintext).map_err(|source| DecryptError::Payload {
                item: self.name.clone(),
                source,
            })?;
        let (username, password) = extract_credentials(self.kind, &payload)?;
        debug!(item = %self.name, kind = %self.kind, "item decrypted");
        self.username = username;
        self.password = password;
        self.state = ItemState::Decrypted { record, payload };
        Ok(())
    }

    /// Guarded lazy-load transition: `Unloaded` → `MetadataLoaded`.
    fn record(&mut self) -> Result<&ItemRecord, ItemError> {
        if matches!(self.state, ItemState::Unloaded) {
            let record = self.read_record()?;
            debug!(item = %self.name, "loaded item record");
            self.state = ItemState::MetadataLoaded(record);
        }
        match &self.state {
            ItemState::MetadataLoaded(record) | ItemState::Decrypted { record, .. } => Ok(record),
            ItemState::Unloaded => unreachable!("record was just loaded"),
        }
    }

    fn record_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.1password", self.identifier))
    }

    fn read_record(&self) -> Result<ItemRecord, ItemError> {
        let path = self.record_path();
        let raw = fs::read_to_string(&path).map_err(|source| ItemError::Storage {
            path: path.clone(),
            source,
        })?;
        let document: ItemDocument =
            serde_json::from_str(&raw).map_err(|source| ItemError::Malformed {
                path: path.clone(),
                source,
            })?;
        let ciphertext = BASE64
            .decode(&document.encrypted)
            .map_err(|source| ItemError::Base64 { path, source })?;
        Ok(ItemRecord {
            key_identifier: document.key_id,
            security_level: document.security_level,
            ciphertext,
        })
    }
}

/// Variant-specific credential extraction, as `(username, password)`.
fn extract_credentials(
    kind: ItemKind,
    payload: &Value,
) -> Result<(Option<String>, Option<String>), DecryptError> {
    match kind {
        ItemKind::Generic => Err(DecryptError::UnsupportedItemType { kind }),
        ItemKind::WebForm => Ok((
            find_form_field(payload, "username", "username"),
            find_form_field(payload, "password", "Password"),
        )),
        ItemKind::PasswordAccount => Ok((
            payload
                .get("username")
                .and_then(Value::as_str)
                .map(str::to_owned),
            payload
                .get("password")
                .and_then(Value::as_str)
                .map(str::to_owned),
        )),
    }
}

/// First form field whose `designation` matches, falling back to an exact
/// `name` match, per the legacy web-form layout.
fn find_form_field(payload: &Value, designation: &str, name: &str) -> Option<String> {
    let fields = payload.get("fields")?.as_array()?;
    fields
        .iter()
        .find(|field| {
            field.get("designation").and_then(Value::as_str) == Some(designation)
                || field.get("name").and_then(Value::as_str) == Some(name)
        })
        .and_then(|field| field.get("value").and_then(Value::as_str))
        .map(str::to_owned)
}
