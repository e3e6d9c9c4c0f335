//! Accounts List
//!
//! Accounts of one client, filtered by status and product type.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::apply_filter;
use crate::domain::{Account, AccountStatus, AccountType, Record};
use crate::error::Result;
use crate::services::{ApiClient, RestFetcher, SyncHub};
use crate::sync::{FetchOutcome, ListController};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountFilters {
    pub status: Option<AccountStatus>,
    pub account_type: Option<AccountType>,
}

#[derive(Serialize)]
struct StatusChange {
    status: AccountStatus,
}

/// Controller of a client's account list
pub struct AccountsList {
    api: Arc<ApiClient>,
    list: ListController<RestFetcher<Account>>,
}

impl AccountsList {
    pub fn new(hub: &SyncHub, client_id: &str) -> Self {
        let mut list = hub.controller(hub.accounts());
        list.set_owner(Some(client_id));
        Self {
            api: hub.api().clone(),
            list,
        }
    }

    pub fn list(&self) -> &ListController<RestFetcher<Account>> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListController<RestFetcher<Account>> {
        &mut self.list
    }

    pub async fn set_filters(&mut self, filters: &AccountFilters) -> Result<Option<FetchOutcome>> {
        apply_filter(&mut self.list, "status", filters.status.map(|s| s.as_str()));
        apply_filter(&mut self.list, "type", filters.account_type.map(|t| t.as_str()));
        self.list.sync().await
    }

    pub async fn delete(&mut self, id: &str) -> Result<()> {
        self.list
            .remove(id, self.api.delete(Account::KIND, id))
            .await?;
        info!(id, "account deleted");
        Ok(())
    }

    /// Close an account
    ///
    /// The row is updated in place, or dropped when the list only shows
    /// another status.
    pub async fn close(&mut self, id: &str) -> Result<Account> {
        let key = self.list.target_key();
        let body = StatusChange {
            status: AccountStatus::Closed,
        };
        let update = self.api.update::<Account, _>(id, &body);

        let closed = if hides_closed(key.filter("status")) {
            self.list.remove(id, update).await?
        } else {
            self.list.replace(id, update).await?
        };
        info!(id, "account closed");
        Ok(closed)
    }
}

/// Whether a status filter excludes closed accounts
fn hides_closed(status_filter: Option<&str>) -> bool {
    status_filter.is_some_and(|status| status != AccountStatus::Closed.as_str())
}
