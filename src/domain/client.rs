//! Client - Bank Customer Record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{EntityKind, Record};

/// Onboarding status of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Pending,
    Active,
    Suspended,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Pending => "pending",
            ClientStatus::Active => "active",
            ClientStatus::Suspended => "suspended",
        }
    }
}

/// A client as listed in the agent's client view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Agent the client is assigned to
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

impl Record for Client {
    const KIND: EntityKind = EntityKind::Clients;

    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Body of a client onboarding request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub agent_id: Option<String>,
}
