use axum::{
    Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use minijinja::context;
use serde::Deserialize;
use strum::VariantArray;
use tracing::info;

use super::render;
use crate::{
    capability::{Page, Permission, Viewer},
    error::{AppError, AppResult},
    model::{Role, User},
    router::AppState,
    util::form,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list))
        .route("/users/{id}/toggle-active", post(toggle_active))
}

#[derive(Debug, Deserialize)]
pub struct UserFilter {
    search: Option<String>,
    role: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(filter): Query<UserFilter>,
) -> AppResult<Response> {
    viewer.require(Page::Users)?;
    viewer.require_permission(Permission::ManageUsers)?;
    let everyone = state.directory.all();
    let search = form::optional(filter.search).map(|s| s.to_lowercase());
    let role = form::filter::<Role>(&filter.role);

    let users: Vec<&User> = everyone
        .iter()
        .filter(|u| role.is_none_or(|r| u.role == r))
        .filter(|u| {
            search.as_deref().is_none_or(|s| {
                u.name.to_lowercase().contains(s) || u.email.to_lowercase().contains(s)
            })
        })
        .collect();
    let role_counts: Vec<(Role, usize)> = Role::VARIANTS
        .iter()
        .map(|r| (*r, everyone.iter().filter(|u| u.role == *r).count()))
        .collect();

    let data = state.data.read();
    render(
        &state,
        &viewer,
        &data,
        "users.html",
        "/users",
        context! {
            users => users,
            role_counts => role_counts,
            active => everyone.iter().filter(|u| u.is_active).count(),
            roles => Role::VARIANTS,
            search => search,
            role_filter => role,
        },
    )
}

async fn toggle_active(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> AppResult<Response> {
    viewer.require_permission(Permission::ManageUsers)?;
    if id == viewer.user.id {
        return Err(AppError::invalid("user", "you cannot deactivate your own account"));
    }
    let active = state
        .directory
        .toggle_active(&id)
        .ok_or(AppError::NotFound("User"))?;
    info!("{} set user {} active={}", viewer.user.email, id, active);

    Ok(Redirect::to("/users").into_response())
}
