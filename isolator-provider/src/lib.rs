//! Isolation providers and project orchestration.
//!
//! [`IsolationProvider`] is the capability set a backend offers for services,
//! networks and images. [`ProviderRegistry`] picks and caches backends, and
//! the functions in [`project`] compose provider calls into project-level
//! start/stop/remove with rollback.

pub mod error;
pub mod locks;
pub mod project;
pub mod provider;
pub mod registry;
pub mod runner;
pub mod types;

#[cfg(feature = "docker")]
pub mod docker;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

pub use error::{ProviderError, Result};
pub use locks::{ProjectGuard, ProjectLocks};
pub use project::{
    health_check, remove_project, start_project, stop_project, HealthReport, NetworkPlan,
    ProjectPlan, ServicePlan,
};
pub use provider::{require_available, IsolationProvider};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use runner::{CommandRunner, CommandTimeouts, SystemRunner};
pub use types::{
    NetworkInfo, NetworkSpec, PortMapping, ServiceInfo, ServiceLaunch, ServiceState, ServiceStats,
    MANAGED_LABEL, PROJECT_LABEL,
};

#[cfg(feature = "docker")]
pub use docker::DockerProvider;
