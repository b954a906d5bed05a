use chrono::{DateTime, Utc};
use isolator_vault::SecretVault;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// Handle to the relational store.
///
/// Cheap to clone; every clone shares the same connection pool and vault.
/// Each operation runs in its own transaction and releases its connection
/// before returning.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
    vault: SecretVault,
}

impl Store {
    pub fn new(pool: SqlitePool, vault: SecretVault) -> Self {
        Self { pool, vault }
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn vault(&self) -> &SecretVault {
        &self.vault
    }
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

pub(crate) fn require_name(entity: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidInput(format!(
            "{} name must not be empty",
            entity
        )));
    }
    Ok(())
}

pub(crate) fn metadata_to_text(metadata: Option<&serde_json::Value>) -> Result<String> {
    match metadata {
        Some(value) if !value.is_null() => Ok(serde_json::to_string(value)?),
        _ => Ok("{}".to_string()),
    }
}

pub(crate) fn metadata_from_text(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::json!({}))
}
