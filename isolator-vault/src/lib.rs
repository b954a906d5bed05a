//! # Isolator Vault
//!
//! Protects environment variables marked secret while they sit in the store.
//!
//! A single 256-bit master key is generated on first use and persisted next to
//! the database with owner-only permissions. Every value is sealed with
//! AES-256-GCM under a fresh random nonce, so encrypting the same plaintext
//! twice yields different ciphertexts. Losing the key file makes previously
//! stored secrets unrecoverable.
//!
//! ```rust,no_run
//! use isolator_vault::SecretVault;
//! use std::path::Path;
//!
//! # fn example() -> isolator_vault::Result<()> {
//! let vault = SecretVault::load_or_create(Path::new("/home/me/.isolator/master.key"))?;
//! let sealed = vault.encrypt("hunter2")?;
//! assert_eq!(vault.decrypt(&sealed)?, "hunter2");
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod key_file;

pub use crypto::{SecretVault, DECRYPTION_PLACEHOLDER};
pub use error::{Result, VaultError};
