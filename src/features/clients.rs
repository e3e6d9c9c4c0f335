//! Clients List
//!
//! The agent's client list: filter by onboarding status, optionally scoped
//! to one agent. New clients show up at the top as soon as the backend
//! accepts them.

use std::sync::Arc;

use tracing::info;

use super::apply_filter;
use crate::domain::{Client, ClientStatus, NewClient, Record};
use crate::error::{Error, Result};
use crate::services::{ApiClient, RestFetcher, SyncHub};
use crate::sync::{FetchOutcome, ListController};

/// Filters shown above the client list
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientFilters {
    pub status: Option<ClientStatus>,
}

/// Controller of the client list view
pub struct ClientsList {
    api: Arc<ApiClient>,
    list: ListController<RestFetcher<Client>>,
}

impl ClientsList {
    /// Clients assigned to `agent_id`, or all clients when `None`
    pub fn new(hub: &SyncHub, agent_id: Option<&str>) -> Self {
        let mut list = hub.controller(hub.clients());
        list.set_owner(agent_id);
        Self {
            api: hub.api().clone(),
            list,
        }
    }

    pub fn list(&self) -> &ListController<RestFetcher<Client>> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListController<RestFetcher<Client>> {
        &mut self.list
    }

    /// Apply `filters` and reload if the key changed
    pub async fn set_filters(&mut self, filters: &ClientFilters) -> Result<Option<FetchOutcome>> {
        apply_filter(&mut self.list, "status", filters.status.map(|s| s.as_str()));
        self.list.sync().await
    }

    /// Onboard a client; it is shown first in the current list on success
    pub async fn create(&mut self, client: &NewClient) -> Result<Client> {
        if client.first_name.trim().is_empty() && client.last_name.trim().is_empty() {
            return Err(Error::Mutation {
                message: "a client needs a name".to_string(),
            });
        }

        let created = self
            .list
            .prepend(self.api.create::<Client, _>(client))
            .await?;
        info!(id = %created.id, "client created");
        Ok(created)
    }

    /// Delete a client; it disappears from the current list on success
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        self.list
            .remove(id, self.api.delete(Client::KIND, id))
            .await?;
        info!(id, "client deleted");
        Ok(())
    }
}
