use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantArray};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    VariantArray,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RegistrationStatus {
    Confirmed,
    Waitlist,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub registered_at: DateTime<Utc>,
    pub status: RegistrationStatus,
    pub check_in_time: Option<DateTime<Utc>>,
}

impl Registration {
    /// Whether this row holds a seat on its event.
    pub fn is_active(&self) -> bool {
        self.status != RegistrationStatus::Cancelled
    }
}
