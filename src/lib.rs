//! CRM Sync Library
//!
//! Incremental synchronization of the bank CRM's paginated lists (clients,
//! accounts, transactions, agents, communications, audit logs) into a local
//! infinite cache, with debounced search and optimistic post-mutation patches.

pub mod constants;
pub mod domain;
pub mod error;
pub mod features;
pub mod helpers;
pub mod services;
pub mod sync;

pub use error::{Error, Result};
