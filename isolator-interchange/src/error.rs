use isolator_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InterchangeError>;

/// Every structural problem found in a workspace document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .errors.join("; "))]
pub struct ValidationError {
    pub errors: Vec<String>,
}

impl ValidationError {
    pub fn contains(&self, needle: &str) -> bool {
        self.errors.iter().any(|e| e.contains(needle))
    }
}

#[derive(Error, Debug)]
pub enum InterchangeError {
    #[error("Invalid workspace document: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} '{name}' already exists. Use overwrite to replace it.")]
    WouldOverwrite { entity: &'static str, name: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
