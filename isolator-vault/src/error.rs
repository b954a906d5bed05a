use thiserror::Error;

pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Master key file error: {0}")]
    KeyFile(#[from] std::io::Error),

    #[error("Invalid master key: {0}")]
    InvalidKey(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// The value is malformed or was sealed under a different key.
    #[error("Failed to decrypt value: {0}")]
    Decryption(String),

    #[error(transparent)]
    Core(#[from] isolator_core::CoreError),
}
