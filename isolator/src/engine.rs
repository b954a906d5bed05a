//! The engine: one place that owns the store, the vault and the providers.

use isolator_core::user_paths::ensure_private_dir;
use isolator_core::Config;
use isolator_interchange::WorkspaceManager;
use isolator_provider::{
    CommandTimeouts, HealthReport, IsolationProvider, ProjectGuard, ProjectLocks, ProviderRegistry,
};
use isolator_store::db::{create_pool, run_migrations};
use isolator_store::{Project, ProjectStatus, ProviderKind, Store};
use isolator_vault::SecretVault;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{EngineError, Result};
use crate::runtime::project_plan;

/// Entry point for callers (CLI, HTTP control plane).
///
/// Everything is constructed once and passed in; clones share the same
/// database pool, vault key, provider cache and project locks.
#[derive(Clone, Debug)]
pub struct Engine {
    config: Config,
    store: Store,
    registry: Arc<ProviderRegistry>,
    locks: ProjectLocks,
}

impl Engine {
    /// Open (creating on first use) the state directory, key file and database.
    pub async fn open(config: Config) -> Result<Self> {
        ensure_private_dir(&config.home_dir)?;

        let vault = SecretVault::load_or_create(&config.master_key_path)?;
        let pool = create_pool(&config.db_path).await?;
        run_migrations(&pool).await?;

        let mut registry = ProviderRegistry::with_defaults(CommandTimeouts::from(&config));
        if let Some(preferred) = &config.default_provider {
            registry = registry.with_preference(preferred.clone());
        }

        info!(db = %config.db_path.display(), "engine ready");
        Ok(Self::from_parts(config, Store::new(pool, vault), registry))
    }

    pub fn from_parts(config: Config, store: Store, registry: ProviderRegistry) -> Self {
        Self {
            config,
            store,
            registry: Arc::new(registry),
            locks: ProjectLocks::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn workspaces(&self) -> WorkspaceManager {
        WorkspaceManager::new(self.store.clone())
    }

    /// Whether a start, stop or remove is currently running for `name`.
    pub fn is_busy(&self, name: &str) -> bool {
        self.locks.is_locked(name)
    }

    /// Start every network and service of a stored project.
    ///
    /// The project is marked `starting` while it runs and `running` or
    /// `error` afterwards. Operations on the same project wait for each other.
    #[instrument(skip(self))]
    pub async fn start_project(&self, name: &str) -> Result<()> {
        let _guard = self.lock_project(name).await?;
        let project = self.store.get_project_by_name(name).await?;
        let plan = project_plan(&self.store.get_project_full_data(&project.id).await?);

        self.set_status(&project, ProjectStatus::Starting).await?;
        let outcome = self
            .with_provider(project.provider, move |provider| {
                isolator_provider::start_project(provider, &plan)
            })
            .await
            .and_then(|started| started.map_err(EngineError::from));

        let status = match &outcome {
            Ok(()) => ProjectStatus::Running,
            Err(e) => {
                warn!(project = %name, error = %e, "project failed to start");
                ProjectStatus::Error
            }
        };
        self.set_status(&project, status).await?;
        outcome
    }

    /// Stop every service of a project; `false` if any did not stop.
    #[instrument(skip(self))]
    pub async fn stop_project(&self, name: &str) -> Result<bool> {
        let _guard = self.lock_project(name).await?;
        let project = self.store.get_project_by_name(name).await?;
        let plan = project_plan(&self.store.get_project_full_data(&project.id).await?);

        self.set_status(&project, ProjectStatus::Stopping).await?;
        let outcome = self
            .with_provider(project.provider, move |provider| {
                isolator_provider::stop_project(provider, &plan)
            })
            .await;

        let status = match outcome {
            Ok(true) => ProjectStatus::Stopped,
            _ => ProjectStatus::Error,
        };
        self.set_status(&project, status).await?;
        outcome
    }

    /// Remove a project's runtime resources. The stored definition is kept.
    #[instrument(skip(self))]
    pub async fn remove_project(&self, name: &str) -> Result<bool> {
        let _guard = self.lock_project(name).await?;
        let project = self.store.get_project_by_name(name).await?;
        let plan = project_plan(&self.store.get_project_full_data(&project.id).await?);

        let removed = self
            .with_provider(project.provider, move |provider| {
                isolator_provider::remove_project(provider, &plan)
            })
            .await?;

        let status = if removed {
            ProjectStatus::Stopped
        } else {
            ProjectStatus::Error
        };
        self.set_status(&project, status).await?;
        Ok(removed)
    }

    /// Health of a provider (the default one when `None`). Never fails.
    pub async fn health_check(&self, provider: Option<&str>) -> HealthReport {
        let registry = Arc::clone(&self.registry);
        let requested = provider.map(str::to_string);
        let label = requested.clone().unwrap_or_else(|| "default".to_string());

        let unavailable = |provider: String| HealthReport {
            provider,
            available: false,
            version: None,
            services_count: 0,
            networks_count: 0,
        };

        let probe = tokio::task::spawn_blocking(move || {
            let provider = match &requested {
                Some(name) => registry.get_provider(name),
                None => registry.get_default_provider(),
            };
            provider.map(|p| isolator_provider::health_check(p.as_ref()))
        })
        .await;

        match probe {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                warn!(provider = %label, error = %e, "health check found no provider");
                unavailable(label)
            }
            Err(e) => {
                warn!(provider = %label, error = %e, "health check task failed");
                unavailable(label)
            }
        }
    }

    /// Availability of every registered provider. Never fails.
    pub async fn available_providers(&self) -> BTreeMap<String, bool> {
        let registry = Arc::clone(&self.registry);
        tokio::task::spawn_blocking(move || registry.list_available_providers())
            .await
            .unwrap_or_default()
    }

    async fn set_status(&self, project: &Project, status: ProjectStatus) -> Result<()> {
        Ok(self.store.update_project_status(&project.id, status).await?)
    }

    /// Take the project's lock, waiting off the async runtime if it is held.
    async fn lock_project(&self, name: &str) -> Result<ProjectGuard> {
        if let Some(guard) = self.locks.try_acquire(name) {
            return Ok(guard);
        }

        debug!(project = %name, "project busy, waiting");
        let locks = self.locks.clone();
        let name = name.to_string();
        Ok(tokio::task::spawn_blocking(move || locks.acquire(&name)).await?)
    }

    /// Run a blocking provider operation off the async runtime.
    async fn with_provider<T, F>(&self, kind: ProviderKind, op: F) -> Result<T>
    where
        F: FnOnce(&dyn IsolationProvider) -> T + Send + 'static,
        T: Send + 'static,
    {
        let registry = Arc::clone(&self.registry);

        tokio::task::spawn_blocking(move || -> Result<T> {
            let provider = registry.get_provider(kind.as_str())?;
            Ok(op(provider.as_ref()))
        })
        .await?
    }
}
