use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
};
use chrono::Utc;
use minijinja::context;
use serde::{Deserialize, Serialize};
use strum::VariantArray;
use tracing::info;

use super::{attachment, back_to, render};
use crate::{
    capability::{Page, Permission, Viewer},
    error::{AppError, AppResult},
    export,
    model::{Registration, RegistrationStatus},
    router::AppState,
    store::AppData,
    util::form,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/registrations", get(list))
        .route("/registrations/export.csv", get(export_csv))
        .route("/registrations/{id}/cancel", post(cancel))
        .route("/registrations/{id}/check-in", post(check_in))
}

#[derive(Debug, Serialize)]
pub struct RegistrationRow<'a> {
    pub registration: &'a Registration,
    pub event_title: &'a str,
    pub can_cancel: bool,
    pub can_check_in: bool,
}

impl<'a> RegistrationRow<'a> {
    pub fn new(registration: &'a Registration, data: &'a AppData, viewer: &Viewer) -> Self {
        Self {
            registration,
            event_title: data.event_title(&registration.event_id),
            can_cancel: viewer.can_cancel_registration(registration, data),
            can_check_in: viewer.can_check_in(registration, data),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationFilter {
    search: Option<String>,
    status: Option<String>,
    event: Option<String>,
}

fn filtered<'d>(
    viewer: &Viewer,
    data: &'d AppData,
    filter: &RegistrationFilter,
) -> Vec<&'d Registration> {
    let search = form::optional(filter.search.clone()).map(|s| s.to_lowercase());
    let status = form::filter::<RegistrationStatus>(&filter.status);
    let event = form::optional(filter.event.clone()).filter(|e| e != "all");

    viewer
        .registrations(data)
        .into_iter()
        .filter(|r| status.is_none_or(|s| r.status == s))
        .filter(|r| event.as_deref().is_none_or(|e| r.event_id == e))
        .filter(|r| {
            search.as_deref().is_none_or(|s| {
                r.user_name.to_lowercase().contains(s)
                    || r.user_email.to_lowercase().contains(s)
                    || data.event_title(&r.event_id).to_lowercase().contains(s)
            })
        })
        .collect()
}

async fn list(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(filter): Query<RegistrationFilter>,
) -> AppResult<Response> {
    viewer.require(Page::Registrations)?;
    let data = state.data.read();
    let visible = viewer.registrations(&data);
    let count = |status: RegistrationStatus| visible.iter().filter(|r| r.status == status).count();

    let rows: Vec<RegistrationRow> = filtered(&viewer, &data, &filter)
        .into_iter()
        .map(|r| RegistrationRow::new(r, &data, &viewer))
        .collect();
    let events: Vec<_> = viewer
        .events(&data)
        .into_iter()
        .filter(|e| visible.iter().any(|r| r.event_id == e.id))
        .collect();

    render(
        &state,
        &viewer,
        &data,
        "registrations.html",
        "/registrations",
        context! {
            registrations => rows,
            events => events,
            confirmed => count(RegistrationStatus::Confirmed),
            waitlist => count(RegistrationStatus::Waitlist),
            cancelled => count(RegistrationStatus::Cancelled),
            statuses => RegistrationStatus::VARIANTS,
            search => filter.search,
            status_filter => filter.status,
            event_filter => filter.event,
            can_export => viewer.permits(Permission::ExportRegistrations),
        },
    )
}

async fn export_csv(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(filter): Query<RegistrationFilter>,
) -> AppResult<Response> {
    viewer.require(Page::Registrations)?;
    viewer.require_permission(Permission::ExportRegistrations)?;
    let data = state.data.read();
    let rows = filtered(&viewer, &data, &filter);
    info!("{} exported {} registrations", viewer.user.email, rows.len());

    Ok(attachment(export::registrations_csv(&data, &rows)))
}

#[derive(Debug, Deserialize)]
pub struct Back {
    back: Option<String>,
}

fn visible<'d>(viewer: &Viewer, data: &'d AppData, id: &str) -> AppResult<&'d Registration> {
    viewer
        .registrations(data)
        .into_iter()
        .find(|r| r.id == id)
        .ok_or(AppError::NotFound("Registration"))
}

/// Cancelling twice is a no-op.
async fn cancel(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Form(Back { back }): Form<Back>,
) -> AppResult<Response> {
    let mut data = state.data.write();
    let registration = visible(&viewer, &data, &id)?;
    if registration.is_active() && !viewer.can_cancel_registration(registration, &data) {
        return Err(AppError::Forbidden);
    }
    if data.cancel_registration(&id) {
        info!("{} cancelled registration {}", viewer.user.email, id);
    }

    Ok(back_to(back.as_deref(), "/registrations"))
}

async fn check_in(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Form(Back { back }): Form<Back>,
) -> AppResult<Response> {
    let mut data = state.data.write();
    let registration = visible(&viewer, &data, &id)?;
    if !viewer.can_check_in(registration, &data) {
        return Err(AppError::Forbidden);
    }
    data.check_in(&id, Utc::now());
    info!("{} checked in registration {}", viewer.user.email, id);

    Ok(back_to(back.as_deref(), "/registrations"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    #[test]
    fn filters_combine_search_and_status() {
        let users = seed::demo_users();
        let data = seed::demo_data(&users, Utc::now());
        let admin = Viewer::new(users[0].clone());

        let filter = RegistrationFilter {
            search: Some("jordan".into()),
            status: Some("waitlist".into()),
            event: None,
        };
        let rows = filtered(&admin, &data, &filter);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event_id, "2");

        let by_event = RegistrationFilter {
            event: Some("4".into()),
            ..Default::default()
        };
        assert_eq!(filtered(&admin, &data, &by_event).len(), 2);
    }

    #[test]
    fn attendees_may_cancel_but_not_check_in() {
        let users = seed::demo_users();
        let data = seed::demo_data(&users, Utc::now());
        let attendee = Viewer::new(users[3].clone());

        let row = RegistrationRow::new(data.registration("1").unwrap(), &data, &attendee);
        assert!(row.can_cancel);
        assert!(!row.can_check_in);
        assert_eq!(row.event_title, "Tech Conference 2025");
    }
}
