//! Domain entities persisted by the store and the inputs used to create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub path: String,
    pub provider: ProviderKind,
    pub status: ProjectStatus,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub service_type: String,
    pub port: Option<u16>,
    pub image: Option<String>,
    pub dockerfile_path: Option<String>,
    pub command: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored environment variable. For secrets `value` is ciphertext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub id: String,
    pub service_id: String,
    pub key: String,
    pub value: String,
    pub is_secret: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub driver: String,
    pub subnet: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Docker,
    Vm,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Docker, ProviderKind::Vm];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Docker => "docker",
            ProviderKind::Vm => "vm",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "docker" => Ok(ProviderKind::Docker),
            "vm" => Ok(ProviderKind::Vm),
            other => Err(StoreError::InvalidInput(format!(
                "unknown provider '{}', expected one of: docker, vm",
                other
            ))),
        }
    }
}

/// Runtime state of a project as last recorded by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
    Building,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Stopped => "stopped",
            ProjectStatus::Starting => "starting",
            ProjectStatus::Running => "running",
            ProjectStatus::Stopping => "stopping",
            ProjectStatus::Error => "error",
            ProjectStatus::Building => "building",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkspaceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub workspace_id: String,
    pub name: String,
    pub path: String,
    pub provider: ProviderKind,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub path: Option<String>,
    pub provider: Option<ProviderKind>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct NewService {
    pub project_id: String,
    pub name: String,
    pub service_type: String,
    pub port: Option<u16>,
    pub image: Option<String>,
    pub dockerfile_path: Option<String>,
    pub command: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub service_type: Option<String>,
    pub port: Option<u16>,
    pub image: Option<String>,
    pub dockerfile_path: Option<String>,
    pub command: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct NewNetwork {
    pub project_id: String,
    pub name: String,
    pub driver: Option<String>,
    pub subnet: Option<String>,
}

/// A service together with its decrypted environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullService {
    pub service: Service,
    pub environment: BTreeMap<String, String>,
    /// Keys of `environment` that are flagged secret in the store.
    pub secret_keys: BTreeSet<String>,
}

/// A project with everything needed to export or run it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullProject {
    pub project: Project,
    pub services: Vec<FullService>,
    pub networks: Vec<Network>,
}

impl FullProject {
    pub fn service(&self, name: &str) -> Option<&FullService> {
        self.services.iter().find(|s| s.service.name == name)
    }
}
