//! Typed views of the resources a provider manages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label attached to every container and network created by Isolator.
pub const MANAGED_LABEL: &str = "isolator.managed";

/// Label carrying the owning project's name.
pub const PROJECT_LABEL: &str = "isolator.project";

/// Runtime state of a service, normalised across providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Running,
    Stopped,
    Starting,
    Stopping,
    Error,
    Building,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Running => "running",
            ServiceState::Stopped => "stopped",
            ServiceState::Starting => "starting",
            ServiceState::Stopping => "stopping",
            ServiceState::Error => "error",
            ServiceState::Building => "building",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl PortMapping {
    pub fn same(port: u16) -> Self {
        Self {
            host: port,
            container: port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    pub state: ServiceState,
    pub ports: Vec<PortMapping>,
    pub image: Option<String>,
    /// Status text exactly as reported by the tool, when it gave one.
    pub raw_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub subnet: Option<String>,
    pub scope: Option<String>,
}

/// Request to create a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSpec {
    pub name: String,
    pub driver: String,
    pub subnet: Option<String>,
    pub project: Option<String>,
}

impl NetworkSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: "bridge".to_string(),
            subnet: None,
            project: None,
        }
    }
}

/// Everything needed to run one service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceLaunch {
    /// Runtime name, unique on the host.
    pub name: String,
    pub project: Option<String>,
    pub image: Option<String>,
    pub dockerfile_path: Option<String>,
    pub build_context: Option<String>,
    pub command: Option<String>,
    pub ports: Vec<PortMapping>,
    pub environment: BTreeMap<String, String>,
    pub network: Option<String>,
}

/// Point-in-time resource usage of a service. Fields the tool omits stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub cpu_percent: Option<f64>,
    pub memory_usage: Option<String>,
    pub network_io: Option<String>,
    pub block_io: Option<String>,
}
