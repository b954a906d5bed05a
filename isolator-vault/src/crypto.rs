//! Cryptographic operations for secret encryption and decryption

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Result, VaultError};
use crate::key_file::{self, KEY_LENGTH};

/// AES-GCM nonce length in bytes
const NONCE_LENGTH: usize = 12;

/// AES-GCM authentication tag length in bytes
const TAG_LENGTH: usize = 16;

/// Value substituted for a secret that can no longer be decrypted.
pub const DECRYPTION_PLACEHOLDER: &str = "***ENCRYPTED***";

/// Symmetric vault keyed by the process-wide master key.
///
/// The key is read once at construction and never changes afterwards.
#[derive(Clone)]
pub struct SecretVault {
    cipher: Aes256Gcm,
    key_path: Option<PathBuf>,
}

impl fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretVault")
            .field("key_path", &self.key_path)
            .finish_non_exhaustive()
    }
}

impl SecretVault {
    /// Load the master key from `key_path`, generating it on first use.
    pub fn load_or_create(key_path: &Path) -> Result<Self> {
        let key = key_file::load_or_create(key_path, generate_key)?;
        let mut vault = Self::from_key(&key)?;
        vault.key_path = Some(key_path.to_path_buf());
        Ok(vault)
    }

    /// Build a vault from raw key bytes.
    pub fn from_key(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LENGTH {
            return Err(VaultError::InvalidKey(format!(
                "expected {} bytes, found {}",
                KEY_LENGTH,
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| VaultError::InvalidKey(format!("Failed to create cipher: {}", e)))?;

        Ok(Self {
            cipher,
            key_path: None,
        })
    }

    /// A vault with a fresh in-memory key that is never written to disk.
    pub fn ephemeral() -> Self {
        Self {
            cipher: Aes256Gcm::new(&Aes256Gcm::generate_key(&mut OsRng)),
            key_path: None,
        }
    }

    /// Where the master key lives, if this vault was loaded from disk.
    pub fn key_path(&self) -> Option<&Path> {
        self.key_path.as_deref()
    }

    /// Encrypt a plaintext value. Empty input is returned unchanged.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(combined))
    }

    /// Decrypt a value produced by [`encrypt`](Self::encrypt) under the same key.
    pub fn decrypt(&self, encrypted: &str) -> Result<String> {
        if encrypted.is_empty() {
            return Ok(String::new());
        }

        let combined = STANDARD
            .decode(encrypted.trim())
            .map_err(|e| VaultError::Decryption(format!("invalid base64: {}", e)))?;

        if combined.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(VaultError::Decryption("encrypted data too short".into()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| {
                VaultError::Decryption("authentication failed (wrong key or tampered data)".into())
            })?;

        String::from_utf8(plaintext)
            .map_err(|_| VaultError::Decryption("decrypted data is not valid UTF-8".into()))
    }

    /// Decrypt for display, substituting [`DECRYPTION_PLACEHOLDER`] on failure.
    pub fn decrypt_or_placeholder(&self, encrypted: &str) -> String {
        match self.decrypt(encrypted) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "secret could not be decrypted, substituting placeholder");
                DECRYPTION_PLACEHOLDER.to_string()
            }
        }
    }

    /// Best-effort probe for diagnostics: does `value` decrypt under this key?
    pub fn is_encrypted(&self, value: &str) -> bool {
        !value.is_empty() && self.decrypt(value).is_ok()
    }
}

fn generate_key() -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    key.copy_from_slice(Aes256Gcm::generate_key(&mut OsRng).as_slice());
    key
}
