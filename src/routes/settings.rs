use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use minijinja::context;
use serde::Deserialize;
use tracing::info;

use super::render;
use crate::{
    capability::{Page, Permission, Viewer},
    error::{AppError, AppResult},
    model::SettingsUpdate,
    router::AppState,
    util::form,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/settings", get(show).post(save))
}

fn guard(viewer: &Viewer) -> AppResult<()> {
    viewer.require(Page::Settings)?;
    viewer.require_permission(Permission::ManageSettings)
}

async fn show(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    guard(&viewer)?;
    let data = state.data.read();
    render(&state, &viewer, &data, "settings.html", "/settings", context! {})
}

#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    site_name: Option<String>,
    support_email: Option<String>,
    registrations_open: Option<String>,
}

impl SettingsForm {
    fn validate(self) -> AppResult<SettingsUpdate> {
        let site_name = form::required(self.site_name, "site name")?;
        let support_email = form::required(self.support_email, "support email")?;
        if !support_email.contains('@') {
            return Err(AppError::invalid("support email", "expected an email address"));
        }

        Ok(SettingsUpdate {
            site_name: Some(site_name),
            support_email: Some(support_email),
            registrations_open: Some(form::checked(&self.registrations_open)),
        })
    }
}

async fn save(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(input): Form<SettingsForm>,
) -> AppResult<Response> {
    guard(&viewer)?;
    let update = input.validate()?;
    let mut data = state.data.write();
    let settings = data.update_settings(update);
    info!(
        "{} saved settings, registrations_open={}",
        viewer.user.email, settings.registrations_open
    );

    Ok(Redirect::to("/settings").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unticked_checkbox_closes_registrations() {
        let update = SettingsForm {
            site_name: Some("EventMS".into()),
            support_email: Some("help@example.com".into()),
            registrations_open: None,
        }
        .validate()
        .unwrap();
        assert_eq!(update.registrations_open, Some(false));
    }

    #[test]
    fn support_email_needs_an_at_sign() {
        let result = SettingsForm {
            site_name: Some("EventMS".into()),
            support_email: Some("nobody".into()),
            registrations_open: Some("on".into()),
        }
        .validate();
        assert!(matches!(result, Err(AppError::InvalidField { field: "support email", .. })));
    }
}
