//! AEAD sealing of vault blobs.
//!
//! Blob layout: a 12-byte random nonce followed by the AES-256-GCM
//! ciphertext and tag. Authentication failure surfaces as
//! [`CryptoError::IntegrityCheckFailed`]; a tampered blob is never returned
//! as plaintext.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

use super::{CryptoError, KeyMaterial};

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Seal `plaintext` under `key`, prepending a random nonce.
pub fn seal(key: &KeyMaterial, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Open a nonce-prefixed blob produced by [`seal`].
pub fn open(key: &KeyMaterial, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < NONCE_LEN {
        return Err(CryptoError::CiphertextTooShort { len: blob.len() });
    }
    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::IntegrityCheckFailed)
}
