//! Conversion between stored entities and workspace documents.

use isolator_store::{FullProject, ProviderKind, Workspace, DEFAULT_NETWORK_DRIVER};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::document::{
    NetworkEntry, ProjectEntry, ServiceEntry, WorkspaceDocument, WorkspaceEntry, DOCUMENT_VERSION,
};

/// Workspace fields as they will be written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceDraft {
    /// Identifier carried by the document; informational only.
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
}

/// A project graph ready to be written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub id: Option<String>,
    pub name: String,
    pub path: String,
    pub provider: ProviderKind,
    pub metadata: Value,
    pub services: Vec<ServiceDraft>,
    pub networks: Vec<NetworkDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDraft {
    pub name: String,
    pub service_type: String,
    pub port: Option<u16>,
    pub image: Option<String>,
    pub dockerfile_path: Option<String>,
    pub command: Option<String>,
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkDraft {
    pub name: String,
    pub driver: String,
    pub subnet: Option<String>,
}

/// Build a document from a workspace and its assembled projects.
///
/// Environment values are copied as given; redact them first if needed.
pub fn to_document(workspace: &Workspace, projects: &[FullProject]) -> WorkspaceDocument {
    WorkspaceDocument {
        version: DOCUMENT_VERSION.to_string(),
        workspace: WorkspaceEntry {
            id: Some(workspace.id.clone()),
            name: workspace.name.clone(),
            description: workspace.description.clone(),
            projects: projects.iter().map(project_entry).collect(),
            created_at: Some(workspace.created_at.to_rfc3339()),
            updated_at: Some(workspace.updated_at.to_rfc3339()),
        },
    }
}

fn project_entry(full: &FullProject) -> ProjectEntry {
    ProjectEntry {
        id: Some(full.project.id.clone()),
        name: full.project.name.clone(),
        path: full.project.path.clone(),
        provider: full.project.provider,
        services: full
            .services
            .iter()
            .map(|s| ServiceEntry {
                name: s.service.name.clone(),
                service_type: s.service.service_type.clone(),
                port: s.service.port,
                image: s.service.image.clone(),
                dockerfile_path: s.service.dockerfile_path.clone(),
                command: s.service.command.clone(),
                environment: s.environment.clone(),
            })
            .collect(),
        networks: full
            .networks
            .iter()
            .map(|n| NetworkEntry {
                name: n.name.clone(),
                driver: Some(n.driver.clone()),
                subnet: n.subnet.clone(),
            })
            .collect(),
        metadata: full.project.metadata.clone(),
    }
}

/// Split a document into the workspace and project drafts to persist.
pub fn to_relational(document: &WorkspaceDocument) -> (WorkspaceDraft, Vec<ProjectDraft>) {
    let workspace = &document.workspace;

    let draft = WorkspaceDraft {
        id: workspace.id.clone(),
        name: workspace.name.clone(),
        description: workspace.description.clone(),
    };

    let projects = workspace
        .projects
        .iter()
        .map(|p| ProjectDraft {
            id: p.id.clone(),
            name: p.name.clone(),
            path: p.path.clone(),
            provider: p.provider,
            metadata: if p.metadata.is_null() {
                Value::Object(Default::default())
            } else {
                p.metadata.clone()
            },
            services: p
                .services
                .iter()
                .map(|s| ServiceDraft {
                    name: s.name.clone(),
                    service_type: s.service_type.clone(),
                    port: s.port,
                    image: s.image.clone(),
                    dockerfile_path: s.dockerfile_path.clone(),
                    command: s.command.clone(),
                    environment: s.environment.clone(),
                })
                .collect(),
            networks: p
                .networks
                .iter()
                .map(|n| NetworkDraft {
                    name: n.name.clone(),
                    driver: n
                        .driver
                        .clone()
                        .unwrap_or_else(|| DEFAULT_NETWORK_DRIVER.to_string()),
                    subnet: n.subnet.clone(),
                })
                .collect(),
        })
        .collect();

    (draft, projects)
}

impl From<&FullProject> for ProjectDraft {
    fn from(full: &FullProject) -> Self {
        Self {
            id: Some(full.project.id.clone()),
            name: full.project.name.clone(),
            path: full.project.path.clone(),
            provider: full.project.provider,
            metadata: full.project.metadata.clone(),
            services: full
                .services
                .iter()
                .map(|s| ServiceDraft {
                    name: s.service.name.clone(),
                    service_type: s.service.service_type.clone(),
                    port: s.service.port,
                    image: s.service.image.clone(),
                    dockerfile_path: s.service.dockerfile_path.clone(),
                    command: s.service.command.clone(),
                    environment: s.environment.clone(),
                })
                .collect(),
            networks: full
                .networks
                .iter()
                .map(|n| NetworkDraft {
                    name: n.name.clone(),
                    driver: n.driver.clone(),
                    subnet: n.subnet.clone(),
                })
                .collect(),
        }
    }
}

impl From<&Workspace> for WorkspaceDraft {
    fn from(workspace: &Workspace) -> Self {
        Self {
            id: Some(workspace.id.clone()),
            name: workspace.name.clone(),
            description: workspace.description.clone(),
        }
    }
}
