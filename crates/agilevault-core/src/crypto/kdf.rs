//! Password-based key derivation.
//!
//! Each key record carries its own salt and scrypt cost parameters, so
//! derivation is deterministic per record. This is CPU-bound work; cost
//! scales with the persisted parameters.

use scrypt::Params;
use zeroize::Zeroize;

use super::keys::KEY_LEN;
use super::{CryptoError, KeyMaterial};

/// Scrypt cost parameters as persisted in a key record.
///
/// Parallelism is fixed at 1 by the vault format.
#[derive(Debug, Clone, Copy)]
pub struct KdfParams {
    params: Params,
}

impl KdfParams {
    /// Validate persisted scrypt parameters.
    ///
    /// `cost` is the scrypt N parameter and must be a power of two greater
    /// than one; `block_size` is r. Rejecting bad parameters here keeps
    /// unlock itself infallible apart from the password check.
    pub fn new(cost: u64, block_size: u32) -> Result<Self, CryptoError> {
        if cost < 2 || !cost.is_power_of_two() {
            return Err(CryptoError::KeyDerivationFailed(format!(
                "cost parameter must be a power of two >= 2, got {cost}"
            )));
        }
        let log_n = u8::try_from(cost.trailing_zeros())
            .map_err(|_| CryptoError::KeyDerivationFailed(format!("cost parameter {cost} out of range")))?;
        let params = Params::new(log_n, block_size, 1, KEY_LEN)
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
        Ok(Self { params })
    }
}

/// Derive 32 bytes of key material from a password and salt.
pub fn derive_key(
    password: &str,
    salt: &[u8],
    params: &KdfParams,
) -> Result<KeyMaterial, CryptoError> {
    let mut out = [0u8; KEY_LEN];
    scrypt::scrypt(password.as_bytes(), salt, &params.params, &mut out)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    let material = KeyMaterial::from_bytes(&out);
    out.zeroize();
    material
}
