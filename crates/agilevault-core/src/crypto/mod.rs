//! Cryptographic primitives for vault unlock and item decryption.

pub mod cipher;
pub mod kdf;
pub mod keys;

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
///
/// Integrity failures indicate tampered or corrupted ciphertext. They are
/// surfaced to the caller as-is and never silently ignored.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// AEAD authentication failed during decryption.
    ///
    /// For a wrapped key this typically means a wrong passphrase; for an
    /// item blob it means the ciphertext was tampered with or corrupted.
    /// The two causes are cryptographically indistinguishable.
    #[error("integrity check failed - ciphertext tampered or corrupted")]
    IntegrityCheckFailed,

    /// The ciphertext blob cannot even hold a nonce.
    #[error("ciphertext too short: {len} bytes")]
    CiphertextTooShort { len: usize },

    /// AEAD encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Key derivation failed or its parameters were invalid.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// Key material had an unexpected length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

// Re-export commonly used types
pub use kdf::KdfParams;
pub use keys::KeyMaterial;
