use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use minijinja::context;
use serde::Deserialize;
use strum::VariantArray;
use tracing::info;
use uuid::Uuid;

use super::{attachment, registrations::RegistrationRow, render, tasks::TaskRow};
use crate::{
    analytics,
    capability::{Page, Permission, Viewer},
    error::{AppError, AppResult},
    export::{self, Download, Ticket},
    model::{
        Category, Event, EventStatus, EventUpdate, Feedback, FeedbackCategories, Notification,
        NotificationType, feedback::{MAX_RATING, MIN_RATING}, split_list,
    },
    router::AppState,
    store::AppData,
    util::form,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list))
        .route("/events/create", get(new_event).post(create))
        .route("/events/{id}", get(detail))
        .route("/events/{id}/edit", get(edit).post(update))
        .route("/events/{id}/publish", post(publish))
        .route("/events/{id}/delete", post(delete))
        .route("/events/{id}/register", post(register))
        .route("/events/{id}/feedback", post(leave_feedback))
        .route("/events/{id}/ticket", get(ticket))
        .route("/events/{id}/receipt", get(receipt))
}

#[derive(Debug, Deserialize)]
pub struct EventFilter {
    search: Option<String>,
    category: Option<String>,
    status: Option<String>,
}

fn matches_search(event: &Event, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    event.title.to_lowercase().contains(&needle)
        || event.description.to_lowercase().contains(&needle)
        || event.location.to_lowercase().contains(&needle)
}

async fn list(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(filter): Query<EventFilter>,
) -> AppResult<Response> {
    viewer.require(Page::Events)?;
    let data = state.data.read();
    let search = form::optional(filter.search);
    let category = form::filter::<Category>(&filter.category);
    let status = form::filter::<EventStatus>(&filter.status);

    let mut events: Vec<&Event> = viewer
        .events(&data)
        .into_iter()
        .filter(|e| search.as_deref().is_none_or(|s| matches_search(e, s)))
        .filter(|e| category.is_none_or(|c| e.category == c))
        .filter(|e| status.is_none_or(|s| e.status == s))
        .collect();
    events.sort_by_key(|e| e.date);

    render(
        &state,
        &viewer,
        &data,
        "events.html",
        "/events",
        context! {
            events => events,
            search => search,
            category_filter => category,
            status_filter => status,
            categories => Category::VARIANTS,
            statuses => EventStatus::VARIANTS,
            can_create => viewer.permits(Permission::CreateEvent),
        },
    )
}

/// Raw event form; every field arrives as text so validation can name it.
#[derive(Debug, Default, Deserialize)]
pub struct EventForm {
    title: Option<String>,
    description: Option<String>,
    date: Option<String>,
    end_date: Option<String>,
    time: Option<String>,
    location: Option<String>,
    capacity: Option<String>,
    category: Option<String>,
    status: Option<String>,
    tags: Option<String>,
    image: Option<String>,
}

struct EventFields {
    title: String,
    description: String,
    date: NaiveDate,
    end_date: Option<NaiveDate>,
    time: String,
    location: String,
    capacity: u32,
    category: Category,
    status: EventStatus,
    tags: Vec<String>,
    image: Option<String>,
}

impl EventForm {
    fn validate(self) -> AppResult<EventFields> {
        let title = form::required(self.title, "title")?;
        let description = form::required(self.description, "description")?;
        let date = form::date(&form::required(self.date, "date")?, "date")?;
        let time = form::required(self.time, "time")?;
        let location = form::required(self.location, "location")?;
        let capacity: u32 = form::parse(&form::required(self.capacity, "capacity")?, "capacity")?;
        if capacity == 0 {
            return Err(AppError::invalid("capacity", "must be at least 1"));
        }
        let end_date = form::optional(self.end_date)
            .map(|raw| form::date(&raw, "end date"))
            .transpose()?;
        if end_date.is_some_and(|end| end < date) {
            return Err(AppError::invalid("end date", "cannot be before the start date"));
        }
        let category = match form::optional(self.category) {
            Some(raw) => form::parse(&raw, "category")?,
            None => Category::Other,
        };
        let status = match form::optional(self.status) {
            Some(raw) => form::parse(&raw, "status")?,
            None => EventStatus::Draft,
        };

        Ok(EventFields {
            title,
            description,
            date,
            end_date,
            time,
            location,
            capacity,
            category,
            status,
            tags: self.tags.as_deref().map(split_list).unwrap_or_default(),
            image: form::optional(self.image),
        })
    }
}

fn render_form(
    state: &AppState,
    viewer: &Viewer,
    data: &AppData,
    event: Option<&Event>,
) -> AppResult<Response> {
    render(
        state,
        viewer,
        data,
        "event_form.html",
        "/events",
        context! {
            event => event,
            categories => Category::VARIANTS,
            statuses => EventStatus::VARIANTS,
        },
    )
}

async fn new_event(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    viewer.require(Page::CreateEvent)?;
    viewer.require_permission(Permission::CreateEvent)?;
    let data = state.data.read();
    render_form(&state, &viewer, &data, None)
}

async fn create(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(input): Form<EventForm>,
) -> AppResult<Response> {
    viewer.require(Page::CreateEvent)?;
    viewer.require_permission(Permission::CreateEvent)?;
    let fields = input.validate()?;
    let now = Utc::now();

    let event = Event {
        id: Uuid::new_v4().to_string(),
        title: fields.title,
        description: fields.description,
        date: fields.date,
        end_date: fields.end_date,
        time: fields.time,
        location: fields.location,
        capacity: fields.capacity,
        registered_count: 0,
        organizer_id: viewer.user.id.clone(),
        organizer_name: viewer.user.name.clone(),
        status: fields.status,
        category: fields.category,
        tags: fields.tags,
        image: fields.image,
        created_at: now,
        updated_at: now,
    };
    let location = format!("/events/{}", event.id);
    info!("{} created event {}", viewer.user.email, event.title);
    state.data.write().add_event(event);

    Ok(Redirect::to(&location).into_response())
}

async fn detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> AppResult<Response> {
    viewer.require(Page::EventDetail)?;
    let data = state.data.read();
    let event = viewer.event(&data, &id)?;
    let today = Utc::now().date_naive();

    let attendees: Vec<RegistrationRow> = viewer
        .registrations(&data)
        .into_iter()
        .filter(|r| r.event_id == event.id)
        .map(|r| RegistrationRow::new(r, &data, &viewer))
        .collect();
    let tasks: Vec<TaskRow> = viewer
        .tasks(&data)
        .into_iter()
        .filter(|t| t.event_id == event.id)
        .map(|t| TaskRow::new(t, &data, &viewer, today))
        .collect();
    let feedback: Vec<&Feedback> = viewer
        .feedback(&data)
        .into_iter()
        .filter(|f| f.event_id == event.id)
        .collect();
    let my_registration = data.registration_for(&event.id, &viewer.user.id);
    let feedback_given = data
        .feedback()
        .iter()
        .any(|f| f.event_id == event.id && f.user_id == viewer.user.id);

    render(
        &state,
        &viewer,
        &data,
        "event_detail.html",
        "/events",
        context! {
            event => event,
            can_edit => viewer.can_edit_event(event),
            attendees => attendees,
            tasks => tasks,
            ratings => analytics::rating_summary(&feedback),
            feedback => feedback,
            my_registration => my_registration,
            can_register => viewer.can_register(event, &data),
            registration_blocked => registration_blocked(event, &data, &viewer),
            can_leave_feedback => viewer.can_leave_feedback(event, &data) && !feedback_given,
            rating_range => (MIN_RATING..=MAX_RATING).collect::<Vec<_>>(),
        },
    )
}

/// Why an attendee without a seat cannot take one, if that is the case.
fn registration_blocked(event: &Event, data: &AppData, viewer: &Viewer) -> Option<&'static str> {
    if !viewer.permits(Permission::RegisterForEvent)
        || data.registration_for(&event.id, &viewer.user.id).is_some()
    {
        return None;
    }
    if !data.settings().registrations_open {
        Some("Registrations are currently closed.")
    } else if event.status != EventStatus::Published {
        Some("This event is not open for registration.")
    } else if !event.has_capacity() {
        Some("This event is full.")
    } else {
        None
    }
}

fn editable<'d>(viewer: &Viewer, data: &'d AppData, id: &str) -> AppResult<&'d Event> {
    let event = viewer.event(data, id)?;
    if viewer.can_edit_event(event) {
        Ok(event)
    } else {
        Err(AppError::Forbidden)
    }
}

async fn edit(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let data = state.data.read();
    let event = editable(&viewer, &data, &id)?;
    render_form(&state, &viewer, &data, Some(event))
}

async fn update(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Form(input): Form<EventForm>,
) -> AppResult<Response> {
    let fields = input.validate()?;
    let mut data = state.data.write();
    let event = editable(&viewer, &data, &id)?;
    if fields.capacity < event.registered_count {
        return Err(AppError::invalid(
            "capacity",
            format!("{} seats are already taken", event.registered_count),
        ));
    }

    data.update_event(
        &id,
        EventUpdate {
            title: Some(fields.title),
            description: Some(fields.description),
            date: Some(fields.date),
            end_date: Some(fields.end_date),
            time: Some(fields.time),
            location: Some(fields.location),
            capacity: Some(fields.capacity),
            status: Some(fields.status),
            category: Some(fields.category),
            tags: Some(fields.tags),
            image: Some(fields.image),
        },
    );
    info!("{} updated event {}", viewer.user.email, id);

    Ok(Redirect::to(&format!("/events/{id}")).into_response())
}

async fn publish(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let mut data = state.data.write();
    let event = editable(&viewer, &data, &id)?;
    if event.status != EventStatus::Draft {
        return Err(AppError::invalid("status", "only drafts can be published"));
    }
    data.update_event(&id, EventUpdate::status(EventStatus::Published));
    info!("{} published event {}", viewer.user.email, id);

    Ok(Redirect::to(&format!("/events/{id}")).into_response())
}

async fn delete(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let mut data = state.data.write();
    editable(&viewer, &data, &id)?;
    if let Some(event) = data.delete_event(&id) {
        info!("{} deleted event {}", viewer.user.email, event.title);
    }

    Ok(Redirect::to("/events").into_response())
}

async fn register(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> AppResult<Response> {
    viewer.require_permission(Permission::RegisterForEvent)?;
    let mut data = state.data.write();
    viewer.event(&data, &id)?;

    let now = Utc::now();
    let registration = data.register_attendee(&id, &viewer.user, now)?;
    let title = data.event_title(&id).to_string();
    data.add_notification(Notification {
        id: Uuid::new_v4().to_string(),
        user_id: registration.user_id,
        title: "Registration confirmed".to_string(),
        message: format!("You're registered for {title}."),
        kind: NotificationType::Success,
        read: false,
        created_at: now,
        action_url: Some(format!("/events/{id}")),
    });

    Ok(Redirect::to(&format!("/events/{id}")).into_response())
}

#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    rating: Option<String>,
    organization: Option<String>,
    content: Option<String>,
    venue: Option<String>,
    catering: Option<String>,
    comment: Option<String>,
}

fn rating(raw: Option<String>, field: &'static str) -> AppResult<u8> {
    let value: u8 = form::parse(&form::required(raw, field)?, field)?;
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(value)
    } else {
        Err(AppError::invalid(
            field,
            format!("must be between {MIN_RATING} and {MAX_RATING}"),
        ))
    }
}

async fn leave_feedback(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Form(input): Form<FeedbackForm>,
) -> AppResult<Response> {
    let feedback = Feedback {
        id: Uuid::new_v4().to_string(),
        event_id: id.clone(),
        user_id: viewer.user.id.clone(),
        user_name: viewer.user.name.clone(),
        rating: rating(input.rating, "rating")?,
        comment: form::optional(input.comment).unwrap_or_default(),
        categories: FeedbackCategories {
            organization: rating(input.organization, "organization")?,
            content: rating(input.content, "content")?,
            venue: rating(input.venue, "venue")?,
            catering: rating(input.catering, "catering")?,
        },
        submitted_at: Utc::now(),
    };

    let mut data = state.data.write();
    let event = viewer.event(&data, &id)?;
    if !viewer.can_leave_feedback(event, &data) {
        return Err(AppError::Forbidden);
    }
    if data
        .feedback()
        .iter()
        .any(|f| f.event_id == id && f.user_id == viewer.user.id)
    {
        return Err(AppError::invalid("feedback", "you already reviewed this event"));
    }
    data.add_feedback(feedback);

    Ok(Redirect::to(&format!("/events/{id}")).into_response())
}

async fn ticket(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let data = state.data.read();
    let event = viewer.event(&data, &id)?;
    let registration = data
        .registration_for(&event.id, &viewer.user.id)
        .ok_or(AppError::NotFound("Registration"))?;
    let ticket = Ticket::new(event, registration);

    let body = state
        .templates
        .get_template("ticket.html")?
        .render(context! { ticket => &ticket, site => data.settings() })?;

    Ok(attachment(Download {
        filename: ticket.filename,
        content_type: "text/html; charset=utf-8",
        body,
    }))
}

async fn receipt(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let data = state.data.read();
    let event = viewer.event(&data, &id)?;
    let registration = data
        .registration_for(&event.id, &viewer.user.id)
        .ok_or(AppError::NotFound("Registration"))?;

    Ok(attachment(export::receipt(event, registration, data.settings())))
}
