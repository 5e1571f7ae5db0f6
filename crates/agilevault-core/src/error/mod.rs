//! Error types for the crate, re-exported in one place.

pub use crate::crypto::CryptoError;
pub use crate::vault::item::{DecryptError, ItemError};
pub use crate::vault::key::{KeyError, KeyRecordError};
pub use crate::vault::keychain::KeychainError;
