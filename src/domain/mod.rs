//! Domain - Pure Data Structures
//!
//! Records served by the CRM backend and the application configuration.
//! None of these types know about caching or transport.

pub mod account;
pub mod admin_log;
pub mod agent;
pub mod client;
pub mod communication;
pub mod config;
pub mod record;
pub mod transaction;

pub use account::{Account, AccountStatus, AccountType};
pub use admin_log::AdminLog;
pub use agent::{Agent, AgentRole};
pub use client::{Client, ClientStatus, NewClient};
pub use communication::{Channel, Communication};
pub use config::{ApiConfig, AppConfig, ListConfig, RetryConfig};
pub use record::{EntityKind, Record};
pub use transaction::{Transaction, TransactionType};
