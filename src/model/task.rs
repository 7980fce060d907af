use chrono::{DateTime, NaiveDate, Utc};
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
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Overdue,
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
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub event_id: String,
    pub title: String,
    pub description: String,
    pub assigned_to: String,
    pub assigned_to_name: String,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
    pub priority: Priority,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date < today && self.status != TaskStatus::Completed
    }

    /// Status as shown to users: a stored status is overridden by `overdue`
    /// once the due date has passed without completion.
    pub fn effective_status(&self, today: NaiveDate) -> TaskStatus {
        if self.is_overdue(today) {
            TaskStatus::Overdue
        } else {
            self.status
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, TaskStatus::Pending | TaskStatus::InProgress)
    }

    /// The status an assignee moves the task to next, if any.
    pub fn next_status(&self) -> Option<TaskStatus> {
        match self.status {
            TaskStatus::Pending => Some(TaskStatus::InProgress),
            TaskStatus::InProgress | TaskStatus::Overdue => Some(TaskStatus::Completed),
            TaskStatus::Completed => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub assigned_to: Option<String>,
    pub assigned_to_name: Option<String>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl TaskUpdate {
    /// Status change that stamps `completed_at` on completion and clears it
    /// otherwise.
    pub fn status_change(status: TaskStatus, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            completed_at: Some((status == TaskStatus::Completed).then_some(now)),
            ..Default::default()
        }
    }

    pub(crate) fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(assigned_to) = self.assigned_to {
            task.assigned_to = assigned_to;
        }
        if let Some(assigned_to_name) = self.assigned_to_name {
            task.assigned_to_name = assigned_to_name;
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = completed_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus, due: NaiveDate) -> Task {
        Task {
            id: "t".into(),
            event_id: "e".into(),
            title: "Book venue".into(),
            description: String::new(),
            assigned_to: "3".into(),
            assigned_to_name: "Vendor Partner".into(),
            due_date: due,
            status,
            priority: Priority::Medium,
            created_by: "2".into(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn overdue_is_derived_from_due_date() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let yesterday = today.pred_opt().unwrap();

        let effective = |status, due| task(status, due).effective_status(today);

        assert_eq!(effective(TaskStatus::Pending, yesterday), TaskStatus::Overdue);
        assert_eq!(effective(TaskStatus::Completed, yesterday), TaskStatus::Completed);
        assert_eq!(effective(TaskStatus::InProgress, today), TaskStatus::InProgress);
    }

    #[test]
    fn status_change_stamps_and_clears_completion() {
        let now = Utc::now();
        let mut t = task(TaskStatus::InProgress, now.date_naive());

        TaskUpdate::status_change(TaskStatus::Completed, now).apply(&mut t);
        assert_eq!(t.completed_at, Some(now));

        TaskUpdate::status_change(TaskStatus::Pending, now).apply(&mut t);
        assert_eq!(t.completed_at, None);
        assert_eq!(t.status, TaskStatus::Pending);
    }
}
