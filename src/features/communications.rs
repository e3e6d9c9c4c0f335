//! Communications List
//!
//! Contact history of one client, filtered by channel.

use super::apply_filter;
use crate::domain::{Channel, Communication};
use crate::error::Result;
use crate::services::{RestFetcher, SyncHub};
use crate::sync::{FetchOutcome, ListController};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommunicationFilters {
    pub channel: Option<Channel>,
}

pub struct CommunicationsList {
    list: ListController<RestFetcher<Communication>>,
}

impl CommunicationsList {
    pub fn new(hub: &SyncHub, client_id: &str) -> Self {
        let mut list = hub.controller(hub.communications());
        list.set_owner(Some(client_id));
        Self { list }
    }

    pub fn list(&self) -> &ListController<RestFetcher<Communication>> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListController<RestFetcher<Communication>> {
        &mut self.list
    }

    pub async fn set_filters(&mut self, filters: &CommunicationFilters) -> Result<Option<FetchOutcome>> {
        apply_filter(&mut self.list, "channel", filters.channel.map(|c| c.as_str()));
        self.list.sync().await
    }
}
