use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use minijinja::context;
use serde::{Deserialize, Serialize};
use strum::VariantArray;
use tracing::info;
use uuid::Uuid;

use super::{back_to, render};
use crate::{
    capability::{Page, Permission, Viewer},
    error::{AppError, AppResult},
    model::{Notification, NotificationType, Priority, Role, Task, TaskStatus, TaskUpdate},
    router::AppState,
    store::AppData,
    util::form,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list))
        .route("/tasks/create", get(new_task).post(create))
        .route("/tasks/{id}/status", post(advance))
}

/// A task as listed, with its derived status and the viewer's allowed action.
#[derive(Debug, Serialize)]
pub struct TaskRow<'a> {
    pub task: &'a Task,
    pub event_title: &'a str,
    pub status: TaskStatus,
    pub overdue: bool,
    pub next_status: Option<TaskStatus>,
}

impl<'a> TaskRow<'a> {
    pub fn new(task: &'a Task, data: &'a AppData, viewer: &Viewer, today: NaiveDate) -> Self {
        Self {
            task,
            event_title: data.event_title(&task.event_id),
            status: task.effective_status(today),
            overdue: task.is_overdue(today),
            next_status: task.next_status().filter(|_| viewer.can_advance_task(task)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskFilter {
    status: Option<String>,
    priority: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(filter): Query<TaskFilter>,
) -> AppResult<Response> {
    viewer.require(Page::Tasks)?;
    let data = state.data.read();
    let today = Utc::now().date_naive();
    let status = form::filter::<TaskStatus>(&filter.status);
    let priority = form::filter::<Priority>(&filter.priority);

    let mut rows: Vec<TaskRow> = viewer
        .tasks(&data)
        .into_iter()
        .map(|t| TaskRow::new(t, &data, &viewer, today))
        .filter(|r| status.is_none_or(|s| r.status == s))
        .filter(|r| priority.is_none_or(|p| r.task.priority == p))
        .collect();
    rows.sort_by_key(|r| r.task.due_date);

    render(
        &state,
        &viewer,
        &data,
        "tasks.html",
        "/tasks",
        context! {
            tasks => rows,
            statuses => TaskStatus::VARIANTS,
            priorities => Priority::VARIANTS,
            status_filter => status,
            priority_filter => priority,
            can_create => viewer.permits(Permission::CreateTask),
        },
    )
}

const ASSIGNABLE: &[Role] = &[Role::Vendor, Role::Organizer, Role::Attendee];

async fn new_task(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    viewer.require(Page::CreateTask)?;
    viewer.require_permission(Permission::CreateTask)?;
    let assignees = state.directory.with_roles(ASSIGNABLE);
    let data = state.data.read();
    let events: Vec<_> = viewer
        .events(&data)
        .into_iter()
        .filter(|e| viewer.can_edit_event(e))
        .collect();

    render(
        &state,
        &viewer,
        &data,
        "task_form.html",
        "/tasks",
        context! {
            events => events,
            assignees => assignees,
            priorities => Priority::VARIANTS,
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct TaskForm {
    event_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    assigned_to: Option<String>,
    due_date: Option<String>,
    priority: Option<String>,
}

async fn create(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(input): Form<TaskForm>,
) -> AppResult<Response> {
    viewer.require(Page::CreateTask)?;
    viewer.require_permission(Permission::CreateTask)?;

    let event_id = form::required(input.event_id, "event")?;
    let title = form::required(input.title, "title")?;
    let description = form::optional(input.description).unwrap_or_default();
    let assigned_to = form::required(input.assigned_to, "assignee")?;
    let due_date = form::date(&form::required(input.due_date, "due date")?, "due date")?;
    let priority = match form::optional(input.priority) {
        Some(raw) => form::parse::<Priority>(&raw, "priority")?,
        None => Priority::Medium,
    };

    let assignee = state
        .directory
        .find(&assigned_to)
        .filter(|u| u.is_active && ASSIGNABLE.contains(&u.role))
        .ok_or_else(|| AppError::invalid("assignee", "no such user"))?;

    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4().to_string(),
        event_id,
        title,
        description,
        assigned_to: assignee.id.clone(),
        assigned_to_name: assignee.name.clone(),
        due_date,
        status: TaskStatus::Pending,
        priority,
        created_by: viewer.user.id.clone(),
        created_at: now,
        completed_at: None,
    };

    let mut data = state.data.write();
    let event = viewer
        .event(&data, &task.event_id)
        .map_err(|_| AppError::invalid("event", "no such event"))?;
    if !viewer.can_edit_event(event) {
        return Err(AppError::Forbidden);
    }

    info!("{} assigned task {} to {}", viewer.user.email, task.title, assignee.email);
    data.add_notification(Notification {
        id: Uuid::new_v4().to_string(),
        user_id: assignee.id,
        title: "New task assigned".to_string(),
        message: format!("You have been assigned \"{}\".", task.title),
        kind: NotificationType::Info,
        read: false,
        created_at: now,
        action_url: Some("/tasks".to_string()),
    });
    data.add_task(task);

    Ok(Redirect::to("/tasks").into_response())
}

#[derive(Debug, Deserialize)]
pub struct Back {
    back: Option<String>,
}

/// Moves a task one step along pending, in-progress, completed.
async fn advance(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Form(Back { back }): Form<Back>,
) -> AppResult<Response> {
    let mut data = state.data.write();
    let task = viewer
        .tasks(&data)
        .into_iter()
        .find(|t| t.id == id)
        .ok_or(AppError::NotFound("Task"))?;
    if !viewer.can_advance_task(task) {
        return Err(AppError::Forbidden);
    }
    let Some(next) = task.next_status() else {
        return Err(AppError::Forbidden);
    };

    data.update_task(&id, TaskUpdate::status_change(next, Utc::now()));
    info!("task {} moved to {}", id, next);

    Ok(back_to(back.as_deref(), "/tasks"))
}
