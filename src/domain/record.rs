//! Record - List Entity Identity
//!
//! Every entity shown in an infinite list is addressed by a stable string id
//! and belongs to one backend resource.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kind of entity a list shows; maps 1:1 to a REST resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Clients,
    Accounts,
    Transactions,
    Agents,
    Communications,
    AdminLogs,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Clients,
        EntityKind::Accounts,
        EntityKind::Transactions,
        EntityKind::Agents,
        EntityKind::Communications,
        EntityKind::AdminLogs,
    ];

    /// Path segment of the REST resource
    pub fn resource(&self) -> &'static str {
        match self {
            EntityKind::Clients => "clients",
            EntityKind::Accounts => "accounts",
            EntityKind::Transactions => "transactions",
            EntityKind::Agents => "agents",
            EntityKind::Communications => "communications",
            EntityKind::AdminLogs => "logs",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "clients" | "client" => Ok(EntityKind::Clients),
            "accounts" | "account" => Ok(EntityKind::Accounts),
            "transactions" | "transaction" => Ok(EntityKind::Transactions),
            "agents" | "agent" | "users" => Ok(EntityKind::Agents),
            "communications" | "communication" => Ok(EntityKind::Communications),
            "logs" | "adminlogs" | "log" => Ok(EntityKind::AdminLogs),
            _ => Err(Error::Invalid {
                message: format!("Unknown entity kind: {s}"),
            }),
        }
    }
}

/// An entity that can live in an infinite list
pub trait Record: Clone + fmt::Debug + DeserializeOwned + Send + Sync + 'static {
    /// Which resource this record is fetched from
    const KIND: EntityKind;

    /// Stable identity used by optimistic patches
    fn record_id(&self) -> &str;
}
