//! Transactions List
//!
//! Movements of one account, filtered by type and an inclusive date range.
//! Read-only: transactions are never edited from the CRM.

use chrono::NaiveDate;

use super::apply_filter;
use crate::domain::{Transaction, TransactionType};
use crate::error::{Error, Result};
use crate::services::{RestFetcher, SyncHub};
use crate::sync::{FetchOutcome, ListController};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionFilters {
    pub transaction_type: Option<TransactionType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl TransactionFilters {
    /// Reject a range that ends before it starts
    pub fn validate(&self) -> Result<()> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(Error::Invalid {
                message: format!("date range ends before it starts: {from} > {to}"),
            }),
            _ => Ok(()),
        }
    }
}

pub struct TransactionsList {
    list: ListController<RestFetcher<Transaction>>,
}

impl TransactionsList {
    pub fn new(hub: &SyncHub, account_id: &str) -> Self {
        let mut list = hub.controller(hub.transactions());
        list.set_owner(Some(account_id));
        Self { list }
    }

    pub fn list(&self) -> &ListController<RestFetcher<Transaction>> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListController<RestFetcher<Transaction>> {
        &mut self.list
    }

    pub async fn set_filters(&mut self, filters: &TransactionFilters) -> Result<Option<FetchOutcome>> {
        self.apply(filters)?;
        self.list.sync().await
    }

    fn apply(&mut self, filters: &TransactionFilters) -> Result<()> {
        filters.validate()?;
        let from = filters.from.map(|d| d.format(DATE_FORMAT).to_string());
        let to = filters.to.map(|d| d.format(DATE_FORMAT).to_string());

        apply_filter(&mut self.list, "type", filters.transaction_type.map(|t| t.as_str()));
        apply_filter(&mut self.list, "from", from.as_deref());
        apply_filter(&mut self.list, "to", to.as_deref());
        Ok(())
    }
}
