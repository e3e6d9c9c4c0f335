//! Admin Logs List
//!
//! Audit trail of administrative actions, filtered by action name.

use super::apply_filter;
use crate::domain::AdminLog;
use crate::error::Result;
use crate::services::{RestFetcher, SyncHub};
use crate::sync::{FetchOutcome, ListController};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdminLogFilters {
    /// e.g. "account.close"
    pub action: Option<String>,
}

pub struct AdminLogsList {
    list: ListController<RestFetcher<AdminLog>>,
}

impl AdminLogsList {
    pub fn new(hub: &SyncHub) -> Self {
        Self {
            list: hub.controller(hub.admin_logs()),
        }
    }

    pub fn list(&self) -> &ListController<RestFetcher<AdminLog>> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListController<RestFetcher<AdminLog>> {
        &mut self.list
    }

    pub async fn set_filters(&mut self, filters: &AdminLogFilters) -> Result<Option<FetchOutcome>> {
        self.apply(filters);
        self.list.sync().await
    }

    /// Blank action text clears the filter
    fn apply(&mut self, filters: &AdminLogFilters) {
        let action = filters
            .action
            .as_deref()
            .map(str::trim)
            .filter(|action| !action.is_empty());
        apply_filter(&mut self.list, "action", action);
    }
}
