//! AdminLog - Administrative Audit Trail Record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{EntityKind, Record};

/// One audited administrative action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminLog {
    pub id: String,
    /// Agent who performed the action
    pub actor_id: String,
    /// Action name, e.g. "account.close"
    pub action: String,
    /// Affected entity id, when any
    #[serde(default)]
    pub target_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for AdminLog {
    const KIND: EntityKind = EntityKind::AdminLogs;

    fn record_id(&self) -> &str {
        &self.id
    }
}
