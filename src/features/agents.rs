//! Agents List
//!
//! Administrator view of CRM users, filtered by role and active flag.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::apply_filter;
use crate::domain::{Agent, AgentRole};
use crate::error::Result;
use crate::services::{ApiClient, RestFetcher, SyncHub};
use crate::sync::{FetchOutcome, ListController};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentFilters {
    pub role: Option<AgentRole>,
    pub active: Option<bool>,
}

#[derive(Serialize)]
struct ActiveChange {
    active: bool,
}

pub struct AgentsList {
    api: Arc<ApiClient>,
    list: ListController<RestFetcher<Agent>>,
}

impl AgentsList {
    pub fn new(hub: &SyncHub) -> Self {
        Self {
            api: hub.api().clone(),
            list: hub.controller(hub.agents()),
        }
    }

    pub fn list(&self) -> &ListController<RestFetcher<Agent>> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListController<RestFetcher<Agent>> {
        &mut self.list
    }

    pub async fn set_filters(&mut self, filters: &AgentFilters) -> Result<Option<FetchOutcome>> {
        apply_filter(&mut self.list, "role", filters.role.map(|r| r.as_str()));
        apply_filter(
            &mut self.list,
            "active",
            filters.active.map(|a| if a { "true" } else { "false" }),
        );
        self.list.sync().await
    }

    /// Deactivate an agent; the row's flag flips once the backend agrees
    ///
    /// A list of active agents only drops the row instead.
    pub async fn deactivate(&mut self, id: &str) -> Result<Agent> {
        let key = self.list.target_key();
        let update = self
            .api
            .update::<Agent, _>(id, &ActiveChange { active: false });

        let agent = if key.filter("active") == Some("true") {
            self.list.remove(id, update).await?
        } else {
            self.list
                .update(id, update, |row, fresh: &Agent| row.active = fresh.active)
                .await?
        };
        info!(id, "agent deactivated");
        Ok(agent)
    }
}
