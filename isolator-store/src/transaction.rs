//! Several writes committed together.

use isolator_vault::SecretVault;
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use crate::error::Result;
use crate::models::{
    EnvironmentVariable, Network, NewNetwork, NewProject, NewService, Project, Service, Workspace,
};
use crate::network::insert_network;
use crate::project::{delete_project_in, find_project_by_name_in, insert_project};
use crate::service::{insert_service, upsert_environment_variable};
use crate::store::Store;
use crate::workspace::{delete_workspace_in, find_workspace_by_name_in, insert_workspace};

/// A write transaction over the store.
///
/// Nothing is visible to other connections until [`commit`](Self::commit);
/// dropping the value without committing rolls every write back.
pub struct StoreTransaction<'s> {
    tx: Transaction<'static, Sqlite>,
    vault: &'s SecretVault,
}

impl Store {
    pub async fn begin(&self) -> Result<StoreTransaction<'_>> {
        Ok(StoreTransaction {
            tx: self.pool().begin().await?,
            vault: self.vault(),
        })
    }
}

impl StoreTransaction<'_> {
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        debug!("committed store transaction");
        Ok(())
    }

    pub async fn create_workspace(&mut self, name: &str, description: Option<&str>) -> Result<Workspace> {
        insert_workspace(&mut self.tx, name, description).await
    }

    pub async fn find_workspace_by_name(&mut self, name: &str) -> Result<Option<Workspace>> {
        find_workspace_by_name_in(&mut *self.tx, name).await
    }

    pub async fn delete_workspace(&mut self, id: &str) -> Result<()> {
        delete_workspace_in(&mut *self.tx, id).await
    }

    pub async fn create_project(&mut self, project: NewProject) -> Result<Project> {
        insert_project(&mut self.tx, &project).await
    }

    pub async fn find_project_by_name(&mut self, name: &str) -> Result<Option<Project>> {
        find_project_by_name_in(&mut *self.tx, name).await
    }

    pub async fn delete_project(&mut self, id: &str) -> Result<()> {
        delete_project_in(&mut *self.tx, id).await
    }

    pub async fn create_service(&mut self, service: NewService) -> Result<Service> {
        insert_service(&mut self.tx, &service).await
    }

    /// Secret values are encrypted with the store's vault, as with
    /// [`Store::set_environment_variable`].
    pub async fn set_environment_variable(
        &mut self,
        service_id: &str,
        key: &str,
        value: &str,
        is_secret: bool,
    ) -> Result<EnvironmentVariable> {
        upsert_environment_variable(&mut self.tx, self.vault, service_id, key, value, is_secret).await
    }

    pub async fn create_network(&mut self, network: NewNetwork) -> Result<Network> {
        insert_network(&mut self.tx, &network).await
    }
}
