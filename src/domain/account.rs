//! Account - Bank Account Record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{EntityKind, Record};

/// Lifecycle status of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Frozen,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Frozen => "frozen",
            AccountStatus::Closed => "closed",
        }
    }
}

/// Product type of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
    Loan,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Loan => "loan",
        }
    }
}

/// An account as listed on a client's detail view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub client_id: String,
    pub account_number: String,
    #[serde(default, rename = "type")]
    pub account_type: AccountType,
    /// Balance in minor units
    pub balance: i64,
    pub currency: String,
    #[serde(default)]
    pub status: AccountStatus,
    pub opened_at: DateTime<Utc>,
}

impl Account {
    pub fn is_closed(&self) -> bool {
        self.status == AccountStatus::Closed
    }
}

impl Record for Account {
    const KIND: EntityKind = EntityKind::Accounts;

    fn record_id(&self) -> &str {
        &self.id
    }
}
