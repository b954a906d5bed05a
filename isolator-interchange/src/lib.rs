//! Workspace interchange for Isolator
//!
//! A workspace and everything in it can be written to a versioned JSON
//! document and read back into another store. Documents are validated
//! structurally before import and after export, and secret values are
//! redacted on export unless explicitly requested.
//!
//! ```rust,no_run
//! use isolator_interchange::WorkspaceManager;
//! use isolator_store::Store;
//! use std::path::Path;
//!
//! # async fn example(store: Store) -> isolator_interchange::Result<()> {
//! let manager = WorkspaceManager::new(store);
//! manager.export_to_file(Path::new("workspace.json"), None, false).await?;
//! let summary = manager.import_from_file(Path::new("workspace.json"), true).await?;
//! println!("imported {} projects", summary.projects_imported);
//! # Ok(())
//! # }
//! ```

pub mod converter;
pub mod document;
pub mod error;
pub mod manager;
pub mod secrets;
pub mod validator;

pub use converter::{to_document, to_relational, NetworkDraft, ProjectDraft, ServiceDraft, WorkspaceDraft};
pub use document::{
    example_document, NetworkEntry, ProjectEntry, ServiceEntry, WorkspaceDocument, WorkspaceEntry,
    DOCUMENT_VERSION,
};
pub use error::{InterchangeError, Result, ValidationError};
pub use manager::{ImportSummary, WorkspaceManager};
pub use secrets::{looks_like_secret_key, redact_secrets, SECRET_PLACEHOLDER};
pub use validator::{validate_document, ValidationReport};
