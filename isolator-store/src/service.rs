use std::collections::BTreeMap;

use isolator_vault::SecretVault;
use sqlx::{SqliteConnection, SqliteExecutor};
use tracing::{debug, info, instrument};

use crate::error::{from_constraint, Result, StoreError};
use crate::models::{EnvironmentVariable, NewService, Service, ServiceUpdate};
use crate::project::fetch_project;
use crate::store::{
    from_millis, metadata_from_text, metadata_to_text, new_id, now_millis, require_name, Store,
};

const SELECT_SERVICE: &str = "SELECT id, project_id, name, service_type, port, image, \
     dockerfile_path, command, metadata, created_at, updated_at FROM services";

const SELECT_ENV: &str = "SELECT id, service_id, key, value, is_secret, created_at, updated_at \
     FROM environment_variables";

impl Store {
    #[instrument(skip(self, service), fields(name = %service.name))]
    pub async fn create_service(&self, service: NewService) -> Result<Service> {
        let mut tx = self.pool().begin().await?;
        let created = insert_service(&mut tx, &service).await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn get_service(&self, id: &str) -> Result<Service> {
        fetch_service(self.pool(), id)
            .await?
            .ok_or_else(|| StoreError::not_found("Service", id))
    }

    pub async fn find_service_by_name(&self, project_id: &str, name: &str) -> Result<Option<Service>> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            "{} WHERE project_id = ? AND name = ?",
            SELECT_SERVICE
        ))
        .bind(project_id)
        .bind(name)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Into::into))
    }

    /// List a project's services ordered by name
    pub async fn list_services(&self, project_id: &str) -> Result<Vec<Service>> {
        list_services_in(self.pool(), project_id).await
    }

    #[instrument(skip(self, update))]
    pub async fn update_service(&self, id: &str, update: ServiceUpdate) -> Result<Service> {
        if let Some(name) = &update.name {
            require_name("Service", name)?;
        }
        check_port(update.port)?;
        let metadata = match &update.metadata {
            Some(value) => Some(metadata_to_text(Some(value))?),
            None => None,
        };
        let key = update.name.as_deref().unwrap_or(id).to_string();

        let result = sqlx::query(
            "UPDATE services
             SET name = COALESCE(?, name), service_type = COALESCE(?, service_type),
                 port = COALESCE(?, port), image = COALESCE(?, image),
                 dockerfile_path = COALESCE(?, dockerfile_path), command = COALESCE(?, command),
                 metadata = COALESCE(?, metadata), updated_at = ?
             WHERE id = ?",
        )
        .bind(&update.name)
        .bind(&update.service_type)
        .bind(update.port.map(i64::from))
        .bind(&update.image)
        .bind(&update.dockerfile_path)
        .bind(&update.command)
        .bind(&metadata)
        .bind(now_millis())
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| from_constraint(e, "Service", &key, "Project", id))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Service", id));
        }

        self.get_service(id).await
    }

    /// Delete a service and its environment variables
    pub async fn delete_service(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM services WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Service", id));
        }

        info!(service_id = %id, "deleted service");
        Ok(())
    }

    /// Set a variable on a service, replacing any existing value for `key`.
    ///
    /// Secret values are encrypted before they reach the database; the
    /// returned row therefore carries ciphertext for secrets.
    #[instrument(skip(self, value))]
    pub async fn set_environment_variable(
        &self,
        service_id: &str,
        key: &str,
        value: &str,
        is_secret: bool,
    ) -> Result<EnvironmentVariable> {
        let mut tx = self.pool().begin().await?;
        let row = upsert_environment_variable(&mut tx, self.vault(), service_id, key, value, is_secret)
            .await?;
        tx.commit().await?;
        Ok(row)
    }

    /// A service's environment with secrets decrypted.
    ///
    /// Values that cannot be decrypted are returned as
    /// [`isolator_vault::DECRYPTION_PLACEHOLDER`].
    pub async fn get_environment_variables(&self, service_id: &str) -> Result<BTreeMap<String, String>> {
        let vars = self.list_environment_variables(service_id).await?;

        Ok(vars
            .into_iter()
            .map(|var| {
                let value = if var.is_secret {
                    self.vault().decrypt_or_placeholder(&var.value)
                } else {
                    var.value
                };
                (var.key, value)
            })
            .collect())
    }

    /// Raw variable rows ordered by key, secrets still encrypted
    pub async fn list_environment_variables(&self, service_id: &str) -> Result<Vec<EnvironmentVariable>> {
        let mut tx = self.pool().begin().await?;

        if fetch_service(&mut *tx, service_id).await?.is_none() {
            return Err(StoreError::not_found("Service", service_id));
        }

        let rows = sqlx::query_as::<_, EnvironmentRow>(&format!(
            "{} WHERE service_id = ? ORDER BY key",
            SELECT_ENV
        ))
        .bind(service_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn delete_environment_variable(&self, service_id: &str, key: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM environment_variables WHERE service_id = ? AND key = ?")
            .bind(service_id)
            .bind(key)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Environment variable", key));
        }

        Ok(())
    }
}

pub(crate) async fn insert_service(conn: &mut SqliteConnection, service: &NewService) -> Result<Service> {
    require_name("Service", &service.name)?;
    check_port(service.port)?;

    let id = new_id();
    let now = now_millis();
    let metadata = metadata_to_text(service.metadata.as_ref())?;

    if fetch_project(&mut *conn, &service.project_id).await?.is_none() {
        return Err(StoreError::missing_parent("Project", &service.project_id));
    }

    sqlx::query(
        "INSERT INTO services (id, project_id, name, service_type, port, image, dockerfile_path,
                               command, metadata, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&service.project_id)
    .bind(&service.name)
    .bind(&service.service_type)
    .bind(service.port.map(i64::from))
    .bind(&service.image)
    .bind(&service.dockerfile_path)
    .bind(&service.command)
    .bind(&metadata)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| from_constraint(e, "Service", &service.name, "Project", &service.project_id))?;

    debug!(service_id = %id, project_id = %service.project_id, "created service");
    fetch_service(&mut *conn, &id)
        .await?
        .ok_or_else(|| StoreError::not_found("Service", &id))
}

pub(crate) async fn upsert_environment_variable(
    conn: &mut SqliteConnection,
    vault: &SecretVault,
    service_id: &str,
    key: &str,
    value: &str,
    is_secret: bool,
) -> Result<EnvironmentVariable> {
    if key.trim().is_empty() {
        return Err(StoreError::InvalidInput(
            "Environment variable key must not be empty".into(),
        ));
    }

    let stored = if is_secret {
        vault.encrypt(value)?
    } else {
        value.to_string()
    };
    let now = now_millis();

    if fetch_service(&mut *conn, service_id).await?.is_none() {
        return Err(StoreError::missing_parent("Service", service_id));
    }

    sqlx::query(
        "INSERT INTO environment_variables (id, service_id, key, value, is_secret, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (service_id, key) DO UPDATE SET
             value = excluded.value,
             is_secret = excluded.is_secret,
             updated_at = excluded.updated_at",
    )
    .bind(new_id())
    .bind(service_id)
    .bind(key)
    .bind(&stored)
    .bind(is_secret)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| from_constraint(e, "Environment variable", key, "Service", service_id))?;

    let row = sqlx::query_as::<_, EnvironmentRow>(&format!(
        "{} WHERE service_id = ? AND key = ?",
        SELECT_ENV
    ))
    .bind(service_id)
    .bind(key)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

fn check_port(port: Option<u16>) -> Result<()> {
    if port == Some(0) {
        return Err(StoreError::InvalidInput(
            "Service port must be between 1 and 65535".into(),
        ));
    }
    Ok(())
}

pub(crate) async fn fetch_service<'e, E>(executor: E, id: &str) -> Result<Option<Service>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, ServiceRow>(&format!("{} WHERE id = ?", SELECT_SERVICE))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Into::into))
}

pub(crate) async fn list_services_in<'e, E>(executor: E, project_id: &str) -> Result<Vec<Service>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, ServiceRow>(&format!(
        "{} WHERE project_id = ? ORDER BY name",
        SELECT_SERVICE
    ))
    .bind(project_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Every variable of every service in a project, ordered by key.
pub(crate) async fn list_environment_rows_for_project<'e, E>(
    executor: E,
    project_id: &str,
) -> Result<Vec<EnvironmentVariable>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, EnvironmentRow>(
        "SELECT e.id, e.service_id, e.key, e.value, e.is_secret, e.created_at, e.updated_at
         FROM environment_variables e
         JOIN services s ON s.id = e.service_id
         WHERE s.project_id = ?
         ORDER BY e.key",
    )
    .bind(project_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: String,
    project_id: String,
    name: String,
    service_type: String,
    port: Option<i64>,
    image: Option<String>,
    dockerfile_path: Option<String>,
    command: Option<String>,
    metadata: String,
    created_at: i64,
    updated_at: i64,
}

#[derive(sqlx::FromRow)]
struct EnvironmentRow {
    id: String,
    service_id: String,
    key: String,
    value: String,
    is_secret: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            service_type: row.service_type,
            port: row.port.and_then(|p| u16::try_from(p).ok()),
            image: row.image,
            dockerfile_path: row.dockerfile_path,
            command: row.command,
            metadata: metadata_from_text(&row.metadata),
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        }
    }
}

impl From<EnvironmentRow> for EnvironmentVariable {
    fn from(row: EnvironmentRow) -> Self {
        Self {
            id: row.id,
            service_id: row.service_id,
            key: row.key,
            value: row.value,
            is_secret: row.is_secret,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        }
    }
}
