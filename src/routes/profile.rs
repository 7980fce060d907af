use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use minijinja::context;
use serde::Deserialize;

use super::render;
use crate::{
    capability::{Page, Viewer},
    error::{AppError, AppResult},
    router::AppState,
    util::form,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/profile", get(show).post(save))
}

async fn show(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    viewer.require(Page::Profile)?;
    let data = state.data.read();
    let registrations = data
        .registrations()
        .iter()
        .filter(|r| r.user_id == viewer.user.id && r.is_active())
        .count();

    render(
        &state,
        &viewer,
        &data,
        "profile.html",
        "/profile",
        context! { registrations => registrations },
    )
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    name: Option<String>,
}

async fn save(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(input): Form<ProfileForm>,
) -> AppResult<Response> {
    viewer.require(Page::Profile)?;
    let name = form::required(input.name, "name")?;
    state
        .directory
        .update_profile(&viewer.user.id, name)
        .ok_or(AppError::NotFound("User"))?;

    Ok(Redirect::to("/profile").into_response())
}
