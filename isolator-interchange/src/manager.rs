//! Export and import of whole workspaces.

use isolator_store::{NewNetwork, NewProject, NewService, Store, StoreTransaction, Workspace};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::converter::{to_document, to_relational, ProjectDraft};
use crate::document::{example_document, WorkspaceDocument};
use crate::error::{InterchangeError, Result};
use crate::secrets::{looks_like_secret_key, redact_secrets, SECRET_PLACEHOLDER};
use crate::validator::{validate_document, ValidationReport};

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub workspace_id: String,
    pub projects_imported: usize,
    /// Projects left untouched because a project with that name already exists.
    pub skipped_projects: Vec<String>,
    /// Environment variables dropped because they held the redaction placeholder.
    pub skipped_variables: usize,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct WorkspaceManager {
    store: Store,
}

impl WorkspaceManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Export a workspace (by id or name; the current one when `None`).
    ///
    /// Unless `include_secrets` is set, sensitive values are replaced by
    /// [`SECRET_PLACEHOLDER`]. The result is validated before it is returned.
    #[instrument(skip(self))]
    pub async fn export_workspace(
        &self,
        workspace: Option<&str>,
        include_secrets: bool,
    ) -> Result<WorkspaceDocument> {
        let workspace = self.resolve_workspace(workspace).await?;

        let mut projects = Vec::new();
        for project in self.store.list_projects(Some(&workspace.id)).await? {
            let mut full = self.store.get_project_full_data(&project.id).await?;
            if !include_secrets {
                let redacted = redact_secrets(&mut full);
                if redacted > 0 {
                    info!(project = %full.project.name, redacted, "redacted secret values");
                }
            }
            projects.push(full);
        }

        let document = to_document(&workspace, &projects);
        validate_document(&serde_json::to_value(&document)?)?;

        info!(workspace = %workspace.name, projects = projects.len(), "exported workspace");
        Ok(document)
    }

    /// Export to a pretty-printed JSON file, creating parent directories.
    pub async fn export_to_file(
        &self,
        path: &Path,
        workspace: Option<&str>,
        include_secrets: bool,
    ) -> Result<WorkspaceDocument> {
        let document = self.export_workspace(workspace, include_secrets).await?;
        write_json(path, &document).await?;
        Ok(document)
    }

    /// Import an untyped document.
    ///
    /// A workspace whose name already exists aborts the import unless
    /// `overwrite` is set, in which case it is deleted first. A project whose
    /// name already exists is skipped, or replaced when `overwrite` is set.
    ///
    /// Everything, including the deletes, runs in one transaction: a failed
    /// import leaves the store exactly as it was.
    #[instrument(skip(self, document))]
    pub async fn import_workspace(&self, document: &Value, overwrite: bool) -> Result<ImportSummary> {
        let report = validate_document(document)?;
        let parsed: WorkspaceDocument = serde_json::from_value(document.clone())?;
        let (workspace_draft, project_drafts) = to_relational(&parsed);

        let mut tx = self.store.begin().await?;

        if let Some(existing) = tx.find_workspace_by_name(&workspace_draft.name).await? {
            if !overwrite {
                return Err(InterchangeError::WouldOverwrite {
                    entity: "Workspace",
                    name: workspace_draft.name,
                });
            }
            warn!(workspace = %existing.name, "replacing existing workspace");
            tx.delete_workspace(&existing.id).await?;
        }

        let workspace = tx
            .create_workspace(&workspace_draft.name, workspace_draft.description.as_deref())
            .await?;

        let mut summary = ImportSummary {
            workspace_id: workspace.id.clone(),
            warnings: report.warnings,
            ..Default::default()
        };

        for draft in project_drafts {
            if let Some(existing) = tx.find_project_by_name(&draft.name).await? {
                if !overwrite {
                    warn!(project = %draft.name, "project already exists, skipping");
                    summary.skipped_projects.push(draft.name);
                    continue;
                }
                warn!(project = %draft.name, "replacing existing project");
                tx.delete_project(&existing.id).await?;
            }

            summary.skipped_variables += import_project(&mut tx, &workspace.id, draft).await?;
            summary.projects_imported += 1;
        }

        tx.commit().await?;

        info!(
            workspace = %workspace.name,
            imported = summary.projects_imported,
            skipped = summary.skipped_projects.len(),
            "imported workspace"
        );
        Ok(summary)
    }

    /// Import a document from a JSON file.
    pub async fn import_from_file(&self, path: &Path, overwrite: bool) -> Result<ImportSummary> {
        let document = read_json(path).await?;
        self.import_workspace(&document, overwrite).await
    }

    /// Validate a document on disk without importing it.
    pub async fn validate_file(&self, path: &Path) -> Result<ValidationReport> {
        let document = read_json(path).await?;
        Ok(validate_document(&document)?)
    }

    /// Write the bundled example document to `path`.
    pub async fn write_example_file(&self, path: &Path) -> Result<()> {
        write_json(path, &example_document()).await
    }

    async fn resolve_workspace(&self, workspace: Option<&str>) -> Result<Workspace> {
        match workspace {
            Some(key) => match self.store.get_workspace(key).await {
                Ok(found) => Ok(found),
                Err(e) if e.is_not_found() => self
                    .store
                    .find_workspace_by_name(key)
                    .await?
                    .ok_or_else(|| InterchangeError::NotFound(format!("Workspace '{}'", key))),
                Err(e) => Err(e.into()),
            },
            None => self
                .store
                .get_current_workspace()
                .await?
                .ok_or_else(|| InterchangeError::NotFound("No workspace found".to_string())),
        }
    }
}

/// Persist one project graph; returns the number of placeholder values skipped.
async fn import_project(
    tx: &mut StoreTransaction<'_>,
    workspace_id: &str,
    draft: ProjectDraft,
) -> Result<usize> {
    let project = tx
        .create_project(NewProject {
            workspace_id: workspace_id.to_string(),
            name: draft.name,
            path: draft.path,
            provider: draft.provider,
            metadata: Some(draft.metadata),
        })
        .await?;

    let mut skipped = 0;

    for service in draft.services {
        let created = tx
            .create_service(NewService {
                project_id: project.id.clone(),
                name: service.name,
                service_type: service.service_type,
                port: service.port,
                image: service.image,
                dockerfile_path: service.dockerfile_path,
                command: service.command,
                metadata: None,
            })
            .await?;

        for (key, value) in service.environment {
            if value == SECRET_PLACEHOLDER {
                warn!(service = %created.name, key = %key, "placeholder value, skipping variable");
                skipped += 1;
                continue;
            }

            let is_secret = looks_like_secret_key(&key);
            tx.set_environment_variable(&created.id, &key, &value, is_secret)
                .await?;
        }
    }

    for network in draft.networks {
        tx.create_network(NewNetwork {
            project_id: project.id.clone(),
            name: network.name,
            driver: Some(network.driver),
            subnet: network.subnet,
        })
        .await?;
    }

    Ok(skipped)
}

async fn read_json(path: &Path) -> Result<Value> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}

async fn write_json(path: &Path, document: &WorkspaceDocument) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut text = serde_json::to_string_pretty(document)?;
    text.push('\n');
    tokio::fs::write(path, text).await?;
    Ok(())
}
