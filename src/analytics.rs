//! Derived statistics for the dashboards and the analytics report. Everything
//! here is recomputed from the collections on each request.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use crate::capability::Viewer;
use crate::model::{percent, Event, EventStatus, Feedback, Task, TaskStatus};
use crate::store::AppData;

/// Share of capacity above which an event is flagged on the admin dashboard.
const NEAR_CAPACITY_PERCENT: u32 = 90;
const DEADLINE_WINDOW_DAYS: u64 = 7;

#[derive(Debug, Clone, Serialize)]
pub struct EventFill {
    pub id: String,
    pub title: String,
    pub registered: u32,
    pub capacity: u32,
    pub percent: u32,
}

impl From<&Event> for EventFill {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            registered: event.registered_count,
            capacity: event.capacity,
            percent: event.fill_percent(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_events: usize,
    pub active_events: usize,
    pub total_registrations: usize,
    pub completion_rate: u32,
    pub recent_events: Vec<Event>,
    pub near_capacity: Vec<EventFill>,
    pub overdue_tasks: usize,
}

pub fn admin_stats(data: &AppData, today: NaiveDate) -> AdminStats {
    let tasks = data.tasks();
    let completed = tasks.iter().filter(|t| t.status == TaskStatus::Completed).count();

    AdminStats {
        total_events: data.events().len(),
        active_events: data
            .events()
            .iter()
            .filter(|e| e.status == EventStatus::Published)
            .count(),
        total_registrations: data.registrations().iter().filter(|r| r.is_active()).count(),
        completion_rate: percent(completed, tasks.len()),
        recent_events: data.events().iter().rev().take(3).cloned().collect(),
        near_capacity: data
            .events()
            .iter()
            .filter(|e| e.capacity > 0 && e.fill_percent() >= NEAR_CAPACITY_PERCENT)
            .map(EventFill::from)
            .collect(),
        overdue_tasks: tasks.iter().filter(|t| t.is_overdue(today)).count(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizerStats {
    pub events: Vec<Event>,
    pub tasks: Vec<Task>,
    pub upcoming_events: usize,
    pub open_tasks: usize,
    pub total_registrations: u32,
    pub fill: Vec<EventFill>,
}

pub fn organizer_stats(data: &AppData, viewer: &Viewer, today: NaiveDate) -> OrganizerStats {
    let events: Vec<Event> = data
        .events()
        .iter()
        .filter(|e| e.organizer_id == viewer.user.id)
        .cloned()
        .collect();
    let tasks: Vec<Task> = viewer.tasks(data).into_iter().cloned().collect();

    OrganizerStats {
        upcoming_events: events.iter().filter(|e| e.date >= today).count(),
        open_tasks: tasks.iter().filter(|t| t.is_open()).count(),
        total_registrations: events.iter().map(|e| e.registered_count).sum(),
        fill: events.iter().map(EventFill::from).collect(),
        events,
        tasks,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VendorStats {
    pub total: usize,
    pub completed: usize,
    pub open: usize,
    pub due_soon: usize,
    pub completion_rate: u32,
}

pub fn vendor_stats(tasks: &[&Task], today: NaiveDate) -> VendorStats {
    let completed = tasks.iter().filter(|t| t.status == TaskStatus::Completed).count();
    let horizon = today
        .checked_add_days(Days::new(DEADLINE_WINDOW_DAYS))
        .unwrap_or(today);

    VendorStats {
        total: tasks.len(),
        completed,
        open: tasks.iter().filter(|t| t.is_open()).count(),
        due_soon: tasks
            .iter()
            .filter(|t| t.status != TaskStatus::Completed && t.due_date < horizon)
            .count(),
        completion_rate: percent(completed, tasks.len()),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendeeStats {
    pub registered: usize,
    pub upcoming: Vec<Event>,
    pub past: Vec<Event>,
    pub available: Vec<Event>,
}

pub fn attendee_stats(data: &AppData, viewer: &Viewer, today: NaiveDate) -> AttendeeStats {
    let registered: Vec<&Event> = data
        .events()
        .iter()
        .filter(|e| data.registration_for(&e.id, &viewer.user.id).is_some())
        .collect();

    AttendeeStats {
        registered: registered.len(),
        upcoming: registered.iter().filter(|e| e.date >= today).map(|e| (*e).clone()).collect(),
        past: registered.iter().filter(|e| e.date < today).map(|e| (*e).clone()).collect(),
        available: data
            .events()
            .iter()
            .filter(|e| {
                e.status == EventStatus::Published
                    && data.registration_for(&e.id, &viewer.user.id).is_none()
            })
            .cloned()
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RatingSummary {
    pub overall: f64,
    pub organization: f64,
    pub content: f64,
    pub venue: f64,
    pub catering: f64,
    pub responses: usize,
}

pub fn rating_summary(feedback: &[&Feedback]) -> RatingSummary {
    if feedback.is_empty() {
        return RatingSummary::default();
    }
    let n = feedback.len() as f64;
    let avg = |f: fn(&Feedback) -> u8| feedback.iter().map(|fb| f(*fb) as f64).sum::<f64>() / n;

    RatingSummary {
        overall: avg(|f| f.rating),
        organization: avg(|f| f.categories.organization),
        content: avg(|f| f.categories.content),
        venue: avg(|f| f.categories.venue),
        catering: avg(|f| f.categories.catering),
        responses: feedback.len(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_events: usize,
    pub total_registrations: usize,
    pub completed_tasks: usize,
    pub task_completion_rate: u32,
    pub avg_registrations_per_event: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub events: usize,
    pub registrations: u32,
    pub avg_per_event: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub range_days: Option<u64>,
    pub summary: Summary,
    pub events_by_category: BTreeMap<String, usize>,
    pub events_by_status: BTreeMap<String, usize>,
    pub monthly: Vec<MonthlyPoint>,
    pub top_events: Vec<EventFill>,
    pub ratings: RatingSummary,
    pub generated_at: DateTime<Utc>,
}

/// Builds the report over events dated within the last `range_days` days
/// (all events when `None`). Task and feedback figures are not ranged.
pub fn report(data: &AppData, range_days: Option<u64>, now: DateTime<Utc>) -> AnalyticsReport {
    let today = now.date_naive();
    let cutoff = range_days.and_then(|days| today.checked_sub_days(Days::new(days)));
    let events: Vec<&Event> = data
        .events()
        .iter()
        .filter(|e| cutoff.is_none_or(|c| e.date >= c))
        .collect();

    let total_registrations: usize = data
        .registrations()
        .iter()
        .filter(|r| r.is_active() && events.iter().any(|e| e.id == r.event_id))
        .count();
    let completed_tasks = data
        .tasks()
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();

    let mut events_by_category = BTreeMap::new();
    let mut events_by_status = BTreeMap::new();
    let mut months: BTreeMap<String, (usize, u32)> = BTreeMap::new();
    for event in &events {
        *events_by_category.entry(event.category.to_string()).or_insert(0) += 1;
        *events_by_status.entry(event.status.to_string()).or_insert(0) += 1;
        let month = months
            .entry(event.date.format("%Y-%m").to_string())
            .or_insert((0, 0));
        month.0 += 1;
        month.1 += event.registered_count;
    }

    let mut ranked = events.clone();
    ranked.sort_by(|a, b| b.registered_count.cmp(&a.registered_count));

    let feedback: Vec<&Feedback> = data.feedback().iter().collect();

    AnalyticsReport {
        range_days,
        summary: Summary {
            total_events: events.len(),
            total_registrations,
            completed_tasks,
            task_completion_rate: percent(completed_tasks, data.tasks().len()),
            avg_registrations_per_event: if events.is_empty() {
                0
            } else {
                (total_registrations as f64 / events.len() as f64).round() as u32
            },
        },
        events_by_category,
        events_by_status,
        monthly: months
            .into_iter()
            .map(|(month, (events, registrations))| MonthlyPoint {
                month,
                events,
                registrations,
                avg_per_event: (registrations as f64 / events as f64).round() as u32,
            })
            .collect(),
        top_events: ranked.into_iter().take(5).map(EventFill::from).collect(),
        ratings: rating_summary(&feedback),
        generated_at: now,
    }
}
