//! In-memory collections behind the dashboard.
//!
//! [`AppData`] owns every collection and exposes the mutators; [`DataStore`]
//! is the cloneable handle handlers receive through `AppState`. Mutators never
//! fail: a missing id is a no-op reported through the return value.

mod registrations;
mod services;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::debug;

use crate::model::{
    Event, EventUpdate, Feedback, Notification, Registration, SiteSettings, Task, TaskUpdate,
    VendorService,
};

#[derive(Debug, Clone, Default)]
pub struct AppData {
    events: Vec<Event>,
    tasks: Vec<Task>,
    registrations: Vec<Registration>,
    feedback: Vec<Feedback>,
    notifications: Vec<Notification>,
    services: Vec<VendorService>,
    settings: SiteSettings,
}

impl AppData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn registration(&self, id: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.id == id)
    }

    pub fn feedback(&self) -> &[Feedback] {
        &self.feedback
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn notification(&self, id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    pub fn services(&self) -> &[VendorService] {
        &self.services
    }

    pub fn settings(&self) -> &SiteSettings {
        &self.settings
    }

    /// Title of the referenced event, or a placeholder once it was deleted.
    pub fn event_title(&self, id: &str) -> &str {
        self.event(id).map_or("Unknown Event", |e| e.title.as_str())
    }

    pub fn add_event(&mut self, event: Event) {
        debug!("add event {} ({})", event.id, event.title);
        self.events.push(event);
    }

    pub fn update_event(&mut self, id: &str, update: EventUpdate) -> bool {
        match self.events.iter_mut().find(|e| e.id == id) {
            Some(event) => {
                update.apply(event, Utc::now());
                debug!("updated event {}", id);
                true
            }
            None => false,
        }
    }

    /// Removes the event only. Tasks, registrations and feedback that
    /// reference it stay in place and resolve to "Unknown Event".
    pub fn delete_event(&mut self, id: &str) -> Option<Event> {
        let index = self.events.iter().position(|e| e.id == id)?;
        debug!("deleted event {}", id);
        Some(self.events.remove(index))
    }

    pub fn add_task(&mut self, task: Task) {
        debug!("add task {} for event {}", task.id, task.event_id);
        self.tasks.push(task);
    }

    pub fn update_task(&mut self, id: &str, update: TaskUpdate) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                update.apply(task);
                debug!("updated task {}", id);
                true
            }
            None => false,
        }
    }

    pub fn add_feedback(&mut self, feedback: Feedback) {
        debug!("feedback {} for event {}", feedback.id, feedback.event_id);
        self.feedback.push(feedback);
    }

    pub fn add_notification(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Idempotent; returns false only when the id is unknown.
    pub fn mark_notification_as_read(&mut self, id: &str) -> bool {
        match self.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    /// Returns how many notifications flipped.
    pub fn mark_all_read(&mut self, user_id: &str) -> usize {
        let mut flipped = 0;
        for notification in self
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            notification.read = true;
            flipped += 1;
        }
        flipped
    }
}

/// Shared handle over [`AppData`]. Guards are never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    inner: Arc<RwLock<AppData>>,
}

impl DataStore {
    pub fn new(data: AppData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, AppData> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, AppData> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::{Category, EventStatus, NotificationType, Priority, TaskStatus};

    pub(crate) fn event(id: &str, status: EventStatus, capacity: u32) -> Event {
        let now = Utc::now();
        Event {
            id: id.to_string(),
            title: format!("Event {id}"),
            description: "A gathering".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            end_date: None,
            time: "09:00".to_string(),
            location: "Main Hall".to_string(),
            capacity,
            registered_count: 0,
            organizer_id: "2".to_string(),
            organizer_name: "Event Organizer".to_string(),
            status,
            category: Category::Corporate,
            tags: vec![],
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn notification(id: &str, user_id: &str) -> Notification {
        Notification {
            id: id.to_string(),
            user_id: user_id.to_string(),
            title: "Heads up".to_string(),
            message: "Something happened".to_string(),
            kind: NotificationType::Info,
            read: false,
            created_at: Utc::now(),
            action_url: None,
        }
    }

    #[test]
    fn update_event_merges_only_given_fields() {
        let mut data = AppData::new();
        data.add_event(event("1", EventStatus::Draft, 10));

        assert!(data.update_event("1", EventUpdate::status(EventStatus::Published)));

        let updated = data.event("1").unwrap();
        assert_eq!(updated.status, EventStatus::Published);
        assert_eq!(updated.capacity, 10);
        assert_eq!(updated.title, "Event 1");
    }

    #[test]
    fn update_of_unknown_event_is_a_no_op() {
        let mut data = AppData::new();
        data.add_event(event("1", EventStatus::Draft, 10));
        let before = data.events().to_vec();

        assert!(!data.update_event("nope", EventUpdate::status(EventStatus::Cancelled)));
        assert_eq!(data.events(), before.as_slice());
    }

    #[test]
    fn deleting_a_missing_event_leaves_the_collection_unchanged() {
        let mut data = AppData::new();
        data.add_event(event("1", EventStatus::Published, 10));

        assert!(data.delete_event("42").is_none());
        assert_eq!(data.events().len(), 1);
    }

    #[test]
    fn delete_event_orphans_dependents() {
        let mut data = AppData::new();
        data.add_event(event("1", EventStatus::Published, 10));
        data.add_task(Task {
            id: "t1".into(),
            event_id: "1".into(),
            title: "Chairs".into(),
            description: String::new(),
            assigned_to: "3".into(),
            assigned_to_name: "Vendor Partner".into(),
            due_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            status: TaskStatus::Pending,
            priority: Priority::Low,
            created_by: "2".into(),
            created_at: Utc::now(),
            completed_at: None,
        });

        assert!(data.delete_event("1").is_some());
        assert_eq!(data.tasks().len(), 1);
        assert_eq!(data.event_title("1"), "Unknown Event");
    }

    #[test]
    fn update_task_applies_status_change() {
        let mut data = AppData::new();
        data.add_task(Task {
            id: "t1".into(),
            event_id: "1".into(),
            title: "Chairs".into(),
            description: String::new(),
            assigned_to: "3".into(),
            assigned_to_name: "Vendor Partner".into(),
            due_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            status: TaskStatus::Pending,
            priority: Priority::Low,
            created_by: "2".into(),
            created_at: Utc::now(),
            completed_at: None,
        });

        assert!(data.update_task(
            "t1",
            TaskUpdate::status_change(TaskStatus::Completed, Utc::now())
        ));
        assert_eq!(data.task("t1").unwrap().status, TaskStatus::Completed);
        assert!(data.task("t1").unwrap().completed_at.is_some());
        assert!(!data.update_task("t2", TaskUpdate::default()));
    }

    #[test]
    fn mark_as_read_is_idempotent() {
        let mut data = AppData::new();
        data.add_notification(notification("n1", "4"));

        assert!(data.mark_notification_as_read("n1"));
        let once = data.notifications().to_vec();
        assert!(data.mark_notification_as_read("n1"));

        assert_eq!(data.notifications(), once.as_slice());
        assert!(!data.mark_notification_as_read("missing"));
    }

    #[test]
    fn mark_all_read_only_touches_one_user() {
        let mut data = AppData::new();
        data.add_notification(notification("n1", "4"));
        data.add_notification(notification("n2", "4"));
        data.add_notification(notification("n3", "3"));

        assert_eq!(data.mark_all_read("4"), 2);
        assert_eq!(data.mark_all_read("4"), 0);
        assert!(!data.notification("n3").unwrap().read);
    }
}
