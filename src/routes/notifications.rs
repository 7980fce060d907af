use axum::{
    Form, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use minijinja::context;
use serde::Deserialize;
use tracing::debug;

use super::{back_to, render};
use crate::{
    capability::{Page, Viewer},
    error::{AppError, AppResult},
    model::Notification,
    router::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list))
        .route("/notifications/{id}/read", post(read))
        .route("/notifications/read-all", post(read_all))
}

async fn list(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    viewer.require(Page::Notifications)?;
    let data = state.data.read();
    let mut mine = viewer.notifications(&data);
    mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let (unread, read): (Vec<&Notification>, Vec<&Notification>) =
        mine.into_iter().partition(|n| !n.read);

    render(
        &state,
        &viewer,
        &data,
        "notifications.html",
        "/notifications",
        context! { unread => unread, read => read },
    )
}

#[derive(Debug, Deserialize)]
pub struct ReadForm {
    /// Follow the notification's link once it is marked read.
    follow: Option<String>,
}

async fn read(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Form(ReadForm { follow }): Form<ReadForm>,
) -> AppResult<Response> {
    let mut data = state.data.write();
    let action_url = data
        .notification(&id)
        .filter(|n| n.user_id == viewer.user.id)
        .ok_or(AppError::NotFound("Notification"))?
        .action_url
        .clone();
    data.mark_notification_as_read(&id);

    let target = follow.and(action_url);
    Ok(back_to(target.as_deref(), "/notifications"))
}

async fn read_all(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    let marked = state.data.write().mark_all_read(&viewer.user.id);
    debug!("marked {} notifications read for {}", marked, viewer.user.email);
    Ok(Redirect::to("/notifications").into_response())
}
