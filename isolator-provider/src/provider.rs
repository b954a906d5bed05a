use crate::error::{ProviderError, Result};
use crate::types::{NetworkInfo, NetworkSpec, ServiceInfo, ServiceLaunch, ServiceState, ServiceStats};
use tracing::debug;

/// Capabilities every isolation backend must offer.
///
/// Mutating operations return typed errors. The check-style operations
/// (`*_exists`, `stop_service`, `remove_service`, `delete_network`) fold a
/// tool-level failure into `false` instead.
pub trait IsolationProvider: Send + Sync {
    /// Registry name of the provider (e.g., "docker").
    fn name(&self) -> &str;

    /// Whether the underlying tool is installed and reachable.
    fn is_available(&self) -> bool;

    fn version(&self) -> Result<String>;

    // Networks

    fn create_network(&self, spec: &NetworkSpec) -> Result<NetworkInfo>;

    fn delete_network(&self, name: &str) -> bool;

    /// Networks managed by Isolator.
    fn list_networks(&self) -> Result<Vec<NetworkInfo>>;

    /// Look a network up by name; `Ok(None)` when it does not exist.
    fn inspect_network(&self, name: &str) -> Result<Option<NetworkInfo>>;

    fn network_exists(&self, name: &str) -> bool {
        matches!(self.inspect_network(name), Ok(Some(_)))
    }

    /// Return the named network, creating it first if it is missing.
    ///
    /// Calling this repeatedly yields the same network each time.
    fn ensure_network(&self, spec: &NetworkSpec) -> Result<NetworkInfo> {
        if let Some(existing) = self.inspect_network(&spec.name)? {
            debug!(network = %spec.name, "network already present");
            return Ok(existing);
        }

        match self.create_network(spec) {
            Ok(created) => Ok(created),
            // Lost a race with another creator
            Err(e) => match self.inspect_network(&spec.name) {
                Ok(Some(existing)) => Ok(existing),
                _ => Err(e),
            },
        }
    }

    // Services

    fn start_service(&self, launch: &ServiceLaunch) -> Result<ServiceInfo>;

    fn stop_service(&self, name: &str) -> bool;

    fn restart_service(&self, name: &str) -> bool;

    /// Stop (if needed) and delete a service.
    fn remove_service(&self, name: &str) -> bool;

    /// Current state; [`ServiceState::Error`] when it cannot be determined.
    fn service_status(&self, name: &str) -> ServiceState;

    fn service_exists(&self, name: &str) -> bool;

    /// Services managed by Isolator, running or not.
    fn list_services(&self) -> Result<Vec<ServiceInfo>>;

    /// The last `lines` lines of a service's output.
    fn service_logs(&self, name: &str, lines: usize) -> Result<Vec<String>>;

    fn service_stats(&self, name: &str) -> Result<ServiceStats>;

    // Images

    fn build_image(&self, dockerfile_path: &str, tag: &str, context: &str) -> Result<()>;

    fn pull_image(&self, image: &str) -> Result<()>;

    fn image_exists(&self, image: &str) -> bool;
}

/// Convenience for callers that need an error rather than a boolean.
pub fn require_available(provider: &dyn IsolationProvider) -> Result<()> {
    if provider.is_available() {
        Ok(())
    } else {
        Err(ProviderError::Unavailable(format!(
            "Provider {} is not available",
            provider.name()
        )))
    }
}
