use isolator_core::CoreError;
use isolator_vault::VaultError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{entity} already exists: {key}")]
    Conflict { entity: &'static str, key: String },

    #[error("Parent {entity} does not exist: {key}")]
    MissingParent { entity: &'static str, key: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn conflict(entity: &'static str, key: impl Into<String>) -> Self {
        StoreError::Conflict {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn missing_parent(entity: &'static str, key: impl Into<String>) -> Self {
        StoreError::MissingParent {
            entity,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Translate constraint violations raised by SQLite into domain errors.
///
/// `entity`/`key` describe the row being written, `parent`/`parent_key` the
/// row its foreign key points at. Anything else stays a database error.
pub(crate) fn from_constraint(
    err: sqlx::Error,
    entity: &'static str,
    key: &str,
    parent: &'static str,
    parent_key: &str,
) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::conflict(entity, key);
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::missing_parent(parent, parent_key);
        }
        if db_err.is_check_violation() {
            return StoreError::InvalidInput(format!(
                "{} '{}' violates a constraint: {}",
                entity,
                key,
                db_err.message()
            ));
        }
    }
    StoreError::Database(err)
}
