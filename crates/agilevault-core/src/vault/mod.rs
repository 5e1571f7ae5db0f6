//! Vault-level abstractions: keys, items, and the keychain aggregate.

pub mod item;
pub mod key;
pub mod keychain;
pub mod matcher;

// Re-export commonly used types
pub use item::{DecryptError, ItemError, ItemKind, KeychainItem};
pub use key::{
    EncryptionKey, EncryptionKeyRecord, KeyError, KeyRecordError, KeyRing, SecurityLevel,
};
pub use keychain::{Keychain, KeychainError};
pub use matcher::best_match;
