//! Relational persistence for Isolator
//!
//! Workspaces own projects; projects own services and networks; services own
//! environment variables. Deletion cascades down that tree and foreign keys
//! make orphans impossible. Secret variables are encrypted with the
//! [`isolator_vault::SecretVault`] before they are written.
//!
//! The store is consumed by the interchange layer (export/import) and by the
//! engine that drives providers, but it has no knowledge of either.

pub mod db;
pub mod error;
pub mod models;
pub mod network;
pub mod project;
pub mod service;
pub mod store;
pub mod transaction;
pub mod workspace;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{Result, StoreError};
pub use models::{
    EnvironmentVariable, FullProject, FullService, Network, NewNetwork, NewProject, NewService,
    Project, ProjectStatus, ProjectUpdate, ProviderKind, Service, ServiceUpdate, Workspace,
    WorkspaceUpdate,
};
pub use network::DEFAULT_NETWORK_DRIVER;
pub use store::Store;
pub use transaction::StoreTransaction;
pub use workspace::DEFAULT_WORKSPACE_NAME;
