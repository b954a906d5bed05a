use isolator_core::CoreError;
use isolator_interchange::InterchangeError;
use isolator_provider::ProviderError;
use isolator_store::StoreError;
use isolator_vault::VaultError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Interchange(#[from] InterchangeError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::Store(e) if e.is_not_found())
    }
}
