use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{ProviderError, Result};
use crate::provider::IsolationProvider;
use crate::types::{NetworkInfo, NetworkSpec, ServiceInfo, ServiceLaunch, ServiceState, ServiceStats};

#[derive(Debug, Default)]
struct MockState {
    networks: BTreeMap<String, NetworkInfo>,
    services: BTreeMap<String, ServiceInfo>,
    calls: Vec<String>,
}

/// In-memory provider that records every mutating call.
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    available: bool,
    fail_on_start: BTreeSet<String>,
    fail_on_stop: BTreeSet<String>,
    start_delay: Option<Duration>,
    state: Mutex<MockState>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            available: true,
            fail_on_start: BTreeSet::new(),
            fail_on_stop: BTreeSet::new(),
            start_delay: None,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Report a different registry name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make `start_service` fail for this runtime name.
    pub fn fail_on_start(mut self, service: impl Into<String>) -> Self {
        self.fail_on_start.insert(service.into());
        self
    }

    /// Make `stop_service` report failure for this runtime name.
    pub fn fail_on_stop(mut self, service: impl Into<String>) -> Self {
        self.fail_on_stop.insert(service.into());
        self
    }

    /// Sleep this long inside every `start_service`, like a slow image pull.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutating calls in order, e.g. `"start shop-api"`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn state_of(&self, service: &str) -> Option<ServiceState> {
        self.state().services.get(service).map(|s| s.state)
    }

    pub fn has_network(&self, name: &str) -> bool {
        self.state().networks.contains_key(name)
    }

    fn record(state: &mut MockState, call: String) {
        state.calls.push(call);
    }
}

impl IsolationProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn version(&self) -> Result<String> {
        if self.available {
            Ok("mock 1.0".to_string())
        } else {
            Err(ProviderError::Unavailable("mock provider disabled".to_string()))
        }
    }

    fn create_network(&self, spec: &NetworkSpec) -> Result<NetworkInfo> {
        let mut state = self.state();
        Self::record(&mut state, format!("network create {}", spec.name));

        if state.networks.contains_key(&spec.name) {
            return Err(ProviderError::network(&spec.name, "already exists"));
        }

        let info = NetworkInfo {
            id: format!("net-{}", spec.name),
            name: spec.name.clone(),
            driver: spec.driver.clone(),
            subnet: spec.subnet.clone(),
            scope: Some("local".to_string()),
        };
        state.networks.insert(spec.name.clone(), info.clone());
        Ok(info)
    }

    fn delete_network(&self, name: &str) -> bool {
        let mut state = self.state();
        Self::record(&mut state, format!("network rm {}", name));
        state.networks.remove(name).is_some()
    }

    fn list_networks(&self) -> Result<Vec<NetworkInfo>> {
        Ok(self.state().networks.values().cloned().collect())
    }

    fn inspect_network(&self, name: &str) -> Result<Option<NetworkInfo>> {
        Ok(self.state().networks.get(name).cloned())
    }

    fn start_service(&self, launch: &ServiceLaunch) -> Result<ServiceInfo> {
        if let Some(delay) = self.start_delay {
            std::thread::sleep(delay);
        }

        let mut state = self.state();
        Self::record(&mut state, format!("start {}", launch.name));

        if self.fail_on_start.contains(&launch.name) {
            return Err(ProviderError::service(&launch.name, "mock start failure"));
        }

        let info = ServiceInfo {
            id: format!("ctr-{}", launch.name),
            name: launch.name.clone(),
            state: ServiceState::Running,
            ports: launch.ports.clone(),
            image: launch.image.clone(),
            raw_status: None,
        };
        state.services.insert(launch.name.clone(), info.clone());
        Ok(info)
    }

    fn stop_service(&self, name: &str) -> bool {
        let mut state = self.state();
        Self::record(&mut state, format!("stop {}", name));

        if self.fail_on_stop.contains(name) {
            return false;
        }
        match state.services.get_mut(name) {
            Some(service) => {
                service.state = ServiceState::Stopped;
                true
            }
            None => false,
        }
    }

    fn restart_service(&self, name: &str) -> bool {
        let mut state = self.state();
        Self::record(&mut state, format!("restart {}", name));
        match state.services.get_mut(name) {
            Some(service) => {
                service.state = ServiceState::Running;
                true
            }
            None => false,
        }
    }

    fn remove_service(&self, name: &str) -> bool {
        let mut state = self.state();
        Self::record(&mut state, format!("remove {}", name));
        state.services.remove(name).is_some()
    }

    fn service_status(&self, name: &str) -> ServiceState {
        self.state_of(name).unwrap_or(ServiceState::Error)
    }

    fn service_exists(&self, name: &str) -> bool {
        self.state().services.contains_key(name)
    }

    fn list_services(&self) -> Result<Vec<ServiceInfo>> {
        Ok(self.state().services.values().cloned().collect())
    }

    fn service_logs(&self, name: &str, lines: usize) -> Result<Vec<String>> {
        if !self.service_exists(name) {
            return Err(ProviderError::service(name, "no such service"));
        }
        Ok((1..=lines.min(3)).map(|i| format!("mock log line {}", i)).collect())
    }

    fn service_stats(&self, name: &str) -> Result<ServiceStats> {
        if !self.service_exists(name) {
            return Err(ProviderError::service(name, "no such service"));
        }
        Ok(ServiceStats {
            cpu_percent: Some(0.0),
            ..Default::default()
        })
    }

    fn build_image(&self, _dockerfile_path: &str, tag: &str, _context: &str) -> Result<()> {
        Self::record(&mut self.state(), format!("build {}", tag));
        Ok(())
    }

    fn pull_image(&self, image: &str) -> Result<()> {
        Self::record(&mut self.state(), format!("pull {}", image));
        Ok(())
    }

    fn image_exists(&self, _image: &str) -> bool {
        true
    }
}
