//! Provider lookup and caching.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, Result};
use crate::provider::{require_available, IsolationProvider};
use crate::runner::CommandTimeouts;

/// Builds a provider instance on demand.
pub type ProviderFactory = Box<dyn Fn() -> Result<Arc<dyn IsolationProvider>> + Send + Sync>;

/// Maps provider names to implementations.
///
/// An instance is constructed on first request and cached only once it has
/// passed its availability check, so a provider that comes up later (the
/// daemon was started) is picked up on the next lookup.
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
    instances: Mutex<HashMap<String, Arc<dyn IsolationProvider>>>,
    preferred: Vec<String>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("preferred", &self.preferred)
            .finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// An empty registry that prefers `docker`, then `vm`.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
            instances: Mutex::new(HashMap::new()),
            preferred: vec!["docker".to_string(), "vm".to_string()],
        }
    }

    /// A registry holding every provider compiled into this build.
    #[allow(unused_mut, unused_variables)]
    pub fn with_defaults(timeouts: CommandTimeouts) -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "docker")]
        registry.register("docker", move || {
            let provider = crate::docker::DockerProvider::new().with_timeouts(timeouts);
            Ok(Arc::new(provider) as Arc<dyn IsolationProvider>)
        });

        registry
    }

    /// Register (or replace) a provider factory.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Arc<dyn IsolationProvider>> + Send + Sync + 'static,
    {
        let name = name.into();
        self.instances().remove(&name);
        debug!(provider = %name, "registered provider");
        self.factories.insert(name, Box::new(factory));
    }

    /// Register an already-built provider under `name`.
    pub fn register_instance(&mut self, name: impl Into<String>, provider: Arc<dyn IsolationProvider>) {
        self.register(name, move || Ok(Arc::clone(&provider)));
    }

    /// Put `name` first in the default-provider search order.
    pub fn with_preference(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.preferred.retain(|p| p != &name);
        self.preferred.insert(0, name);
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    fn instances(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn IsolationProvider>>> {
        self.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a provider by name, failing if it is unknown or unavailable.
    pub fn get_provider(&self, name: &str) -> Result<Arc<dyn IsolationProvider>> {
        if let Some(cached) = self.instances().get(name) {
            return Ok(Arc::clone(cached));
        }

        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))?;

        let provider = factory()?;
        require_available(provider.as_ref())?;

        info!(provider = %name, "provider ready");
        self.instances()
            .insert(name.to_string(), Arc::clone(&provider));
        Ok(provider)
    }

    /// Availability of every registered provider. Never fails.
    pub fn list_available_providers(&self) -> BTreeMap<String, bool> {
        self.factories
            .iter()
            .map(|(name, factory)| {
                let available = match factory() {
                    Ok(provider) => provider.is_available(),
                    Err(e) => {
                        debug!(provider = %name, error = %e, "provider could not be constructed");
                        false
                    }
                };
                (name.clone(), available)
            })
            .collect()
    }

    /// The first available provider in preference order, then any other.
    pub fn get_default_provider(&self) -> Result<Arc<dyn IsolationProvider>> {
        let others = self
            .factories
            .keys()
            .filter(|name| !self.preferred.contains(name));

        for name in self.preferred.iter().chain(others) {
            if !self.factories.contains_key(name) {
                continue;
            }
            match self.get_provider(name) {
                Ok(provider) => return Ok(provider),
                Err(e) => debug!(provider = %name, error = %e, "skipping provider"),
            }
        }

        warn!("no isolation provider is available");
        Err(ProviderError::Unavailable(
            "No isolation providers are available".to_string(),
        ))
    }
}
