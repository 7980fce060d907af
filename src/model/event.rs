use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantArray};

use super::percent;

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
pub enum EventStatus {
    Draft,
    Published,
    Ongoing,
    Completed,
    Cancelled,
}

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
pub enum Category {
    Corporate,
    Academic,
    Community,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub time: String,
    pub location: String,
    pub capacity: u32,
    /// Non-cancelled registrations referencing this event. Only the data store
    /// writes this field.
    pub registered_count: u32,
    pub organizer_id: String,
    pub organizer_name: String,
    pub status: EventStatus,
    pub category: Category,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn has_capacity(&self) -> bool {
        self.registered_count < self.capacity
    }

    pub fn fill_percent(&self) -> u32 {
        percent(self.registered_count as usize, self.capacity as usize)
    }
}

/// Partial update merged into an existing event. `registered_count` is
/// deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub status: Option<EventStatus>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub image: Option<Option<String>>,
}

impl EventUpdate {
    pub fn status(status: EventStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub(crate) fn apply(self, event: &mut Event, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(end_date) = self.end_date {
            event.end_date = end_date;
        }
        if let Some(time) = self.time {
            event.time = time;
        }
        if let Some(location) = self.location {
            event.location = location;
        }
        if let Some(capacity) = self.capacity {
            event.capacity = capacity;
        }
        if let Some(status) = self.status {
            event.status = status;
        }
        if let Some(category) = self.category {
            event.category = category;
        }
        if let Some(tags) = self.tags {
            event.tags = tags;
        }
        if let Some(image) = self.image {
            event.image = image;
        }
        event.updated_at = now;
    }
}
