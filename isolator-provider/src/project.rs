//! Project-level operations composed from provider primitives.
//!
//! The functions work with any [`IsolationProvider`]. They take no lock;
//! callers serialise operations on one project with
//! [`ProjectLocks`](crate::locks::ProjectLocks).

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::provider::IsolationProvider;
use crate::types::{NetworkSpec, PortMapping, ServiceLaunch};

/// Runtime description of a project, independent of how it was stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPlan {
    pub name: String,
    pub services: Vec<ServicePlan>,
    pub networks: Vec<NetworkPlan>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicePlan {
    pub name: String,
    pub image: Option<String>,
    pub dockerfile_path: Option<String>,
    pub build_context: Option<String>,
    pub command: Option<String>,
    pub port: Option<u16>,
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPlan {
    pub name: String,
    pub driver: String,
    pub subnet: Option<String>,
}

impl ProjectPlan {
    /// Host-unique name of a service: `<project>-<service>`.
    pub fn service_resource_name(&self, service: &str) -> String {
        format!("{}-{}", self.name, service)
    }

    /// Host-unique name of a network: `<project>-<network>`.
    pub fn network_resource_name(&self, network: &str) -> String {
        format!("{}-{}", self.name, network)
    }

    fn network_spec(&self, network: &NetworkPlan) -> NetworkSpec {
        NetworkSpec {
            name: self.network_resource_name(&network.name),
            driver: network.driver.clone(),
            subnet: network.subnet.clone(),
            project: Some(self.name.clone()),
        }
    }

    fn launch(&self, service: &ServicePlan) -> ServiceLaunch {
        ServiceLaunch {
            name: self.service_resource_name(&service.name),
            project: Some(self.name.clone()),
            image: service.image.clone(),
            dockerfile_path: service.dockerfile_path.clone(),
            build_context: service.build_context.clone(),
            command: service.command.clone(),
            ports: service.port.map(PortMapping::same).into_iter().collect(),
            environment: service.environment.clone(),
            // Services share the first declared network
            network: self
                .networks
                .first()
                .map(|n| self.network_resource_name(&n.name)),
        }
    }
}

/// Snapshot of a provider's state. Fields degrade rather than error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub provider: String,
    pub available: bool,
    pub version: Option<String>,
    pub services_count: usize,
    pub networks_count: usize,
}

/// Create the project's networks, then start its services in order.
///
/// If a service fails, services started by this call are stopped again in
/// reverse order and the original error is returned. Networks are kept.
#[instrument(skip(provider, plan), fields(project = %plan.name, provider = %provider.name()))]
pub fn start_project<P: IsolationProvider + ?Sized>(provider: &P, plan: &ProjectPlan) -> Result<()> {
    for network in &plan.networks {
        provider.ensure_network(&plan.network_spec(network))?;
    }

    let mut started: Vec<String> = Vec::new();

    for service in &plan.services {
        let launch = plan.launch(service);
        match provider.start_service(&launch) {
            Ok(_) => started.push(launch.name),
            Err(e) => {
                warn!(
                    service = %launch.name,
                    error = %e,
                    rolling_back = started.len(),
                    "service failed to start, rolling back"
                );
                for name in started.iter().rev() {
                    if !provider.stop_service(name) {
                        warn!(service = %name, "rollback could not stop service");
                    }
                }
                return Err(e);
            }
        }
    }

    info!(services = started.len(), "project started");
    Ok(())
}

/// Stop every service; `true` only if all of them stopped.
#[instrument(skip(provider, plan), fields(project = %plan.name))]
pub fn stop_project<P: IsolationProvider + ?Sized>(provider: &P, plan: &ProjectPlan) -> bool {
    let mut all_stopped = true;
    for service in &plan.services {
        all_stopped &= provider.stop_service(&plan.service_resource_name(&service.name));
    }

    if all_stopped {
        info!("project stopped");
    } else {
        warn!("some services did not stop");
    }
    all_stopped
}

/// Remove every service, then every network; `true` only if all succeeded.
#[instrument(skip(provider, plan), fields(project = %plan.name))]
pub fn remove_project<P: IsolationProvider + ?Sized>(provider: &P, plan: &ProjectPlan) -> bool {
    let mut all_removed = true;
    for service in &plan.services {
        all_removed &= provider.remove_service(&plan.service_resource_name(&service.name));
    }
    for network in &plan.networks {
        all_removed &= provider.delete_network(&plan.network_resource_name(&network.name));
    }

    if !all_removed {
        warn!("some project resources could not be removed");
    }
    all_removed
}

pub fn health_check<P: IsolationProvider + ?Sized>(provider: &P) -> HealthReport {
    let available = provider.is_available();
    if !available {
        return HealthReport {
            provider: provider.name().to_string(),
            available,
            version: None,
            services_count: 0,
            networks_count: 0,
        };
    }

    HealthReport {
        provider: provider.name().to_string(),
        available,
        version: provider.version().ok(),
        services_count: provider.list_services().map(|s| s.len()).unwrap_or(0),
        networks_count: provider.list_networks().map(|n| n.len()).unwrap_or(0),
    }
}
