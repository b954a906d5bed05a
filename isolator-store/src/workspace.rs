use sqlx::{SqliteConnection, SqliteExecutor};
use tracing::{info, instrument};

use crate::error::{from_constraint, Result, StoreError};
use crate::models::{Workspace, WorkspaceUpdate};
use crate::store::{from_millis, new_id, now_millis, require_name, Store};

/// Name given to the workspace created on demand when none exists yet.
pub const DEFAULT_WORKSPACE_NAME: &str = "Default Workspace";

const SELECT_WORKSPACE: &str =
    "SELECT id, name, description, created_at, updated_at FROM workspaces";

impl Store {
    /// Create a new workspace
    #[instrument(skip(self, description))]
    pub async fn create_workspace(&self, name: &str, description: Option<&str>) -> Result<Workspace> {
        let mut tx = self.pool().begin().await?;
        let workspace = insert_workspace(&mut tx, name, description).await?;
        tx.commit().await?;
        Ok(workspace)
    }

    /// Get a single workspace by ID
    pub async fn get_workspace(&self, id: &str) -> Result<Workspace> {
        fetch_workspace(self.pool(), id)
            .await?
            .ok_or_else(|| StoreError::not_found("Workspace", id))
    }

    pub async fn find_workspace_by_name(&self, name: &str) -> Result<Option<Workspace>> {
        find_workspace_by_name_in(self.pool(), name).await
    }

    pub async fn get_workspace_by_name(&self, name: &str) -> Result<Workspace> {
        self.find_workspace_by_name(name)
            .await?
            .ok_or_else(|| StoreError::not_found("Workspace", name))
    }

    /// The most recently updated workspace, if any exist.
    pub async fn get_current_workspace(&self) -> Result<Option<Workspace>> {
        let row = sqlx::query_as::<_, WorkspaceRow>(&format!(
            "{} ORDER BY updated_at DESC, rowid DESC LIMIT 1",
            SELECT_WORKSPACE
        ))
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Into::into))
    }

    /// The current workspace, creating [`DEFAULT_WORKSPACE_NAME`] on an empty store.
    pub async fn get_or_create_default_workspace(&self) -> Result<Workspace> {
        if let Some(workspace) = self.get_current_workspace().await? {
            return Ok(workspace);
        }

        self.create_workspace(DEFAULT_WORKSPACE_NAME, Some("Default workspace for projects"))
            .await
    }

    /// List all workspaces ordered by name
    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let rows = sqlx::query_as::<_, WorkspaceRow>(&format!("{} ORDER BY name", SELECT_WORKSPACE))
            .fetch_all(self.pool())
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, update))]
    pub async fn update_workspace(&self, id: &str, update: WorkspaceUpdate) -> Result<Workspace> {
        if let Some(name) = &update.name {
            require_name("Workspace", name)?;
        }
        let key = update.name.as_deref().unwrap_or(id).to_string();

        let result = sqlx::query(
            "UPDATE workspaces
             SET name = COALESCE(?, name), description = COALESCE(?, description), updated_at = ?
             WHERE id = ?",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(now_millis())
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| from_constraint(e, "Workspace", &key, "workspace", id))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Workspace", id));
        }

        self.get_workspace(id).await
    }

    /// Delete a workspace together with all of its projects
    #[instrument(skip(self))]
    pub async fn delete_workspace(&self, id: &str) -> Result<()> {
        delete_workspace_in(self.pool(), id).await
    }
}

pub(crate) async fn insert_workspace(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<&str>,
) -> Result<Workspace> {
    require_name("Workspace", name)?;

    let id = new_id();
    let now = now_millis();

    sqlx::query(
        "INSERT INTO workspaces (id, name, description, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(description)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| from_constraint(e, "Workspace", name, "workspace", name))?;

    info!(workspace_id = %id, "created workspace");
    fetch_workspace(&mut *conn, &id)
        .await?
        .ok_or_else(|| StoreError::not_found("Workspace", &id))
}

pub(crate) async fn find_workspace_by_name_in<'e, E>(executor: E, name: &str) -> Result<Option<Workspace>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, WorkspaceRow>(&format!("{} WHERE name = ?", SELECT_WORKSPACE))
        .bind(name)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Into::into))
}

pub(crate) async fn delete_workspace_in<'e, E>(executor: E, id: &str) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM workspaces WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("Workspace", id));
    }

    info!(workspace_id = %id, "deleted workspace");
    Ok(())
}

pub(crate) async fn fetch_workspace<'e, E>(executor: E, id: &str) -> Result<Option<Workspace>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, WorkspaceRow>(&format!("{} WHERE id = ?", SELECT_WORKSPACE))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Into::into))
}

#[derive(sqlx::FromRow)]
struct WorkspaceRow {
    id: String,
    name: String,
    description: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl From<WorkspaceRow> for Workspace {
    fn from(row: WorkspaceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        }
    }
}
