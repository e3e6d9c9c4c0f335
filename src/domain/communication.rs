//! Communication - Client Contact History Record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{EntityKind, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Phone,
    Letter,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Phone => "phone",
            Channel::Letter => "letter",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub id: String,
    pub client_id: String,
    pub channel: Channel,
    #[serde(default)]
    pub subject: String,
    pub sent_at: DateTime<Utc>,
}

impl Record for Communication {
    const KIND: EntityKind = EntityKind::Communications;

    fn record_id(&self) -> &str {
        &self.id
    }
}
