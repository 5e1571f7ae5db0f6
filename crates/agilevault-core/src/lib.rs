//! Reader for legacy AgileKeychain password vaults.
//!
//! A vault is a directory of JSON documents: a key-list document describing
//! the password-derived encryption keys, an item index naming the stored
//! credentials, and one ciphertext record per item. The vault is locked by
//! default; a single master password must validate every embedded key before
//! any item becomes decryptable.
//!
//! # Example
//!
//! ```no_run
//! use agilevault_core::Keychain;
//!
//! let mut keychain = Keychain::open("/path/to/vault.agilekeychain")?;
//! if keychain.unlock("master password") {
//!     if let Some(item) = keychain.item("github", 70)? {
//!         println!("{:?} / {:?}", item.username(), item.password());
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod crypto;
pub mod error;
pub mod vault;

pub use vault::{Keychain, KeychainItem};
