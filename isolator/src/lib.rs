//! # Isolator
//!
//! Persistence and orchestration for local multi-service development
//! environments. Workspaces hold projects; a project is a set of services
//! and networks run through an isolation provider (Docker by default).
//!
//! [`Engine`] wires the layers together:
//!
//! - `isolator-store` keeps workspaces, projects, services, environment
//!   variables and networks in SQLite, with secrets sealed by `isolator-vault`
//! - `isolator-interchange` exports and imports whole workspaces as JSON
//! - `isolator-provider` starts and stops projects with rollback
//!
//! ```rust,no_run
//! use isolator::{Config, Engine};
//!
//! # async fn example() -> isolator::Result<()> {
//! let engine = Engine::open(Config::from_env()).await?;
//! engine.workspaces().import_from_file("workspace.json".as_ref(), false).await?;
//! engine.start_project("ecommerce-app").await?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod runtime;

pub use engine::Engine;
pub use error::{EngineError, Result};
pub use runtime::project_plan;

pub use isolator_core::Config;
pub use isolator_interchange::{ImportSummary, WorkspaceDocument, WorkspaceManager};
pub use isolator_provider::{HealthReport, ProjectPlan, ProviderRegistry};
pub use isolator_store::{ProjectStatus, Store};
