use isolator_vault::SecretVault;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::Store;

/// Helper to create an in-memory test database with migrations applied
///
/// The pool holds exactly one connection that never expires, since every
/// connection to `sqlite::memory:` would otherwise see its own empty database.
pub async fn create_test_db() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("Invalid in-memory database URL")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// A store over a fresh in-memory database and a throwaway vault key
pub async fn create_test_store() -> Store {
    Store::new(create_test_db().await, SecretVault::ephemeral())
}
