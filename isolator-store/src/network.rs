use sqlx::{SqliteConnection, SqliteExecutor};
use tracing::{debug, instrument};

use crate::error::{from_constraint, Result, StoreError};
use crate::models::{Network, NewNetwork};
use crate::project::fetch_project;
use crate::store::{from_millis, new_id, now_millis, require_name, Store};

/// Driver used when a network does not name one.
pub const DEFAULT_NETWORK_DRIVER: &str = "bridge";

const SELECT_NETWORK: &str =
    "SELECT id, project_id, name, driver, subnet, created_at FROM networks";

impl Store {
    #[instrument(skip(self, network), fields(name = %network.name))]
    pub async fn create_network(&self, network: NewNetwork) -> Result<Network> {
        let mut tx = self.pool().begin().await?;
        let created = insert_network(&mut tx, &network).await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn get_network(&self, id: &str) -> Result<Network> {
        fetch_network(self.pool(), id)
            .await?
            .ok_or_else(|| StoreError::not_found("Network", id))
    }

    /// List a project's networks ordered by name
    pub async fn list_networks(&self, project_id: &str) -> Result<Vec<Network>> {
        list_networks_in(self.pool(), project_id).await
    }

    pub async fn delete_network(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM networks WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Network", id));
        }

        Ok(())
    }
}

pub(crate) async fn insert_network(conn: &mut SqliteConnection, network: &NewNetwork) -> Result<Network> {
    require_name("Network", &network.name)?;

    let id = new_id();
    let driver = network
        .driver
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(DEFAULT_NETWORK_DRIVER);

    if fetch_project(&mut *conn, &network.project_id).await?.is_none() {
        return Err(StoreError::missing_parent("Project", &network.project_id));
    }

    sqlx::query(
        "INSERT INTO networks (id, project_id, name, driver, subnet, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&network.project_id)
    .bind(&network.name)
    .bind(driver)
    .bind(&network.subnet)
    .bind(now_millis())
    .execute(&mut *conn)
    .await
    .map_err(|e| from_constraint(e, "Network", &network.name, "Project", &network.project_id))?;

    debug!(network_id = %id, project_id = %network.project_id, "created network");
    fetch_network(&mut *conn, &id)
        .await?
        .ok_or_else(|| StoreError::not_found("Network", &id))
}

async fn fetch_network<'e, E>(executor: E, id: &str) -> Result<Option<Network>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, NetworkRow>(&format!("{} WHERE id = ?", SELECT_NETWORK))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Into::into))
}

pub(crate) async fn list_networks_in<'e, E>(executor: E, project_id: &str) -> Result<Vec<Network>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, NetworkRow>(&format!(
        "{} WHERE project_id = ? ORDER BY name",
        SELECT_NETWORK
    ))
    .bind(project_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

#[derive(sqlx::FromRow)]
struct NetworkRow {
    id: String,
    project_id: String,
    name: String,
    driver: String,
    subnet: Option<String>,
    created_at: i64,
}

impl From<NetworkRow> for Network {
    fn from(row: NetworkRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            driver: row.driver,
            subnet: row.subnet,
            created_at: from_millis(row.created_at),
        }
    }
}
