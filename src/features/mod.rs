//! Features - Vertical Feature Slices
//!
//! Each feature wraps a list controller for one record type with its typed
//! filters and the mutations its view offers.

pub mod accounts;
pub mod admin_logs;
pub mod agents;
pub mod clients;
pub mod communications;
pub mod transactions;

#[cfg(test)]
pub(crate) mod testing;

pub use accounts::{AccountFilters, AccountsList};
pub use admin_logs::{AdminLogFilters, AdminLogsList};
pub use agents::{AgentFilters, AgentsList};
pub use clients::{ClientFilters, ClientsList};
pub use communications::{CommunicationFilters, CommunicationsList};
pub use transactions::{TransactionFilters, TransactionsList};

use crate::sync::{ListController, PageFetcher};

/// Set or clear one filter from an optional value
fn apply_filter<F: PageFetcher>(list: &mut ListController<F>, name: &str, value: Option<&str>) {
    match value {
        Some(value) => list.set_filter(name, value),
        None => list.clear_filter(name),
    }
}
