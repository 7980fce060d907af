pub mod analytics;
pub mod dashboard;
pub mod events;
pub mod feedback;
pub mod notifications;
pub mod profile;
pub mod registrations;
pub mod services;
pub mod settings;
pub mod tasks;
pub mod users;

use axum::{
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
};
use minijinja::{Value, context};

use crate::{
    capability::Viewer, error::AppResult, export::Download, router::AppState, store::AppData,
};

/// Renders a page inside the signed-in layout. `path` selects the highlighted
/// sidebar entry.
pub fn render(
    state: &AppState,
    viewer: &Viewer,
    data: &AppData,
    template: &str,
    path: &str,
    ctx: Value,
) -> AppResult<Response> {
    let unread = viewer
        .notifications(data)
        .iter()
        .filter(|n| !n.read)
        .count();

    let tmpl = state.templates.get_template(template)?;
    let html = tmpl.render(context! {
        user => &viewer.user,
        initial => viewer.user.initial(),
        role => viewer.role(),
        nav => viewer.navigation(path),
        site => data.settings(),
        unread_notifications => unread,
        ..ctx
    })?;

    Ok(Html(html).into_response())
}

pub fn attachment(download: Download) -> Response {
    (
        [
            (header::CONTENT_TYPE, download.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download.filename),
            ),
        ],
        download.body,
    )
        .into_response()
}

/// Local paths only; anything else falls back to `default`.
pub fn local_path(target: Option<&str>, default: &str) -> String {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => default.to_string(),
    }
}

pub fn back_to(target: Option<&str>, default: &str) -> Response {
    Redirect::to(&local_path(target, default)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_local_redirects_are_followed() {
        assert_eq!(local_path(Some("/events/1"), "/"), "/events/1");
        assert_eq!(local_path(Some("//evil.example"), "/"), "/");
        assert_eq!(local_path(Some("https://evil.example"), "/tasks"), "/tasks");
        assert_eq!(local_path(None, "/tasks"), "/tasks");
    }

    #[test]
    fn attachments_name_the_file() {
        let response = attachment(Download {
            filename: "registrations.csv".into(),
            content_type: "text/csv",
            body: "Event".into(),
        });
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"registrations.csv\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    }
}
