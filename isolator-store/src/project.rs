use std::collections::BTreeMap;

use sqlx::{SqliteConnection, SqliteExecutor};
use tracing::{debug, info, instrument};

use crate::error::{from_constraint, Result, StoreError};
use crate::models::{
    FullProject, FullService, NewProject, Project, ProjectStatus, ProjectUpdate, ProviderKind,
};
use crate::network::list_networks_in;
use crate::service::{list_environment_rows_for_project, list_services_in};
use crate::store::{
    from_millis, metadata_from_text, metadata_to_text, new_id, now_millis, require_name, Store,
};
use crate::workspace::fetch_workspace;

const SELECT_PROJECT: &str = "SELECT id, workspace_id, name, path, provider, status, metadata, \
     created_at, updated_at FROM projects";

impl Store {
    #[instrument(skip(self, project), fields(name = %project.name))]
    pub async fn create_project(&self, project: NewProject) -> Result<Project> {
        let mut tx = self.pool().begin().await?;
        let created = insert_project(&mut tx, &project).await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn get_project(&self, id: &str) -> Result<Project> {
        fetch_project(self.pool(), id)
            .await?
            .ok_or_else(|| StoreError::not_found("Project", id))
    }

    pub async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        find_project_by_name_in(self.pool(), name).await
    }

    pub async fn get_project_by_name(&self, name: &str) -> Result<Project> {
        self.find_project_by_name(name)
            .await?
            .ok_or_else(|| StoreError::not_found("Project", name))
    }

    /// List projects ordered by name, optionally restricted to one workspace
    pub async fn list_projects(&self, workspace_id: Option<&str>) -> Result<Vec<Project>> {
        let mut query = format!("{} WHERE 1=1", SELECT_PROJECT);
        if workspace_id.is_some() {
            query.push_str(" AND workspace_id = ?");
        }
        query.push_str(" ORDER BY name");

        let mut q = sqlx::query_as::<_, ProjectRow>(&query);
        if let Some(workspace_id) = workspace_id {
            q = q.bind(workspace_id);
        }

        let rows = q.fetch_all(self.pool()).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, update))]
    pub async fn update_project(&self, id: &str, update: ProjectUpdate) -> Result<Project> {
        if let Some(name) = &update.name {
            require_name("Project", name)?;
        }
        let metadata = match &update.metadata {
            Some(value) => Some(metadata_to_text(Some(value))?),
            None => None,
        };
        let key = update.name.as_deref().unwrap_or(id).to_string();

        let result = sqlx::query(
            "UPDATE projects
             SET name = COALESCE(?, name), path = COALESCE(?, path),
                 provider = COALESCE(?, provider), metadata = COALESCE(?, metadata),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(&update.name)
        .bind(&update.path)
        .bind(update.provider)
        .bind(&metadata)
        .bind(now_millis())
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| from_constraint(e, "Project", &key, "Project", id))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Project", id));
        }

        self.get_project(id).await
    }

    /// Record the runtime status of a project
    pub async fn update_project_status(&self, id: &str, status: ProjectStatus) -> Result<()> {
        let result = sqlx::query("UPDATE projects SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(now_millis())
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Project", id));
        }

        debug!(project_id = %id, status = %status, "updated project status");
        Ok(())
    }

    /// Delete a project together with its services, variables and networks
    #[instrument(skip(self))]
    pub async fn delete_project(&self, id: &str) -> Result<()> {
        delete_project_in(self.pool(), id).await
    }

    /// Assemble a project with its services (environment resolved) and networks.
    ///
    /// Secret values are decrypted; any that fail come back as
    /// [`isolator_vault::DECRYPTION_PLACEHOLDER`] instead of aborting the read.
    pub async fn get_project_full_data(&self, id: &str) -> Result<FullProject> {
        let mut tx = self.pool().begin().await?;

        let project = fetch_project(&mut *tx, id)
            .await?
            .ok_or_else(|| StoreError::not_found("Project", id))?;
        let services = list_services_in(&mut *tx, id).await?;
        let env_rows = list_environment_rows_for_project(&mut *tx, id).await?;
        let networks = list_networks_in(&mut *tx, id).await?;

        tx.commit().await?;

        let mut full_services: Vec<FullService> = services
            .into_iter()
            .map(|service| FullService {
                service,
                environment: BTreeMap::new(),
                secret_keys: Default::default(),
            })
            .collect();

        for var in env_rows {
            let Some(entry) = full_services
                .iter_mut()
                .find(|s| s.service.id == var.service_id)
            else {
                continue;
            };

            let value = if var.is_secret {
                entry.secret_keys.insert(var.key.clone());
                self.vault().decrypt_or_placeholder(&var.value)
            } else {
                var.value
            };
            entry.environment.insert(var.key, value);
        }

        Ok(FullProject {
            project,
            services: full_services,
            networks,
        })
    }
}

pub(crate) async fn insert_project(conn: &mut SqliteConnection, project: &NewProject) -> Result<Project> {
    require_name("Project", &project.name)?;
    if project.path.trim().is_empty() {
        return Err(StoreError::InvalidInput("Project path must not be empty".into()));
    }

    let id = new_id();
    let now = now_millis();
    let metadata = metadata_to_text(project.metadata.as_ref())?;

    if fetch_workspace(&mut *conn, &project.workspace_id).await?.is_none() {
        return Err(StoreError::missing_parent("Workspace", &project.workspace_id));
    }

    sqlx::query(
        "INSERT INTO projects (id, workspace_id, name, path, provider, status, metadata, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&project.workspace_id)
    .bind(&project.name)
    .bind(&project.path)
    .bind(project.provider)
    .bind(ProjectStatus::Stopped)
    .bind(&metadata)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        from_constraint(e, "Project", &project.name, "Workspace", &project.workspace_id)
    })?;

    info!(project_id = %id, workspace_id = %project.workspace_id, "created project");
    fetch_project(&mut *conn, &id)
        .await?
        .ok_or_else(|| StoreError::not_found("Project", &id))
}

pub(crate) async fn find_project_by_name_in<'e, E>(executor: E, name: &str) -> Result<Option<Project>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, ProjectRow>(&format!("{} WHERE name = ?", SELECT_PROJECT))
        .bind(name)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Into::into))
}

pub(crate) async fn delete_project_in<'e, E>(executor: E, id: &str) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("Project", id));
    }

    info!(project_id = %id, "deleted project");
    Ok(())
}

pub(crate) async fn fetch_project<'e, E>(executor: E, id: &str) -> Result<Option<Project>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, ProjectRow>(&format!("{} WHERE id = ?", SELECT_PROJECT))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Into::into))
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    workspace_id: String,
    name: String,
    path: String,
    provider: ProviderKind,
    status: ProjectStatus,
    metadata: String,
    created_at: i64,
    updated_at: i64,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            name: row.name,
            path: row.path,
            provider: row.provider,
            status: row.status,
            metadata: metadata_from_text(&row.metadata),
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        }
    }
}
