use axum::{
    Router,
    extract::{Query, State},
    response::Response,
    routing::get,
};
use minijinja::context;
use serde::{Deserialize, Serialize};

use super::{attachment, render};
use crate::{
    analytics,
    capability::{Page, Permission, Viewer},
    error::AppResult,
    export,
    model::Feedback,
    router::AppState,
    store::AppData,
    util::form,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/feedback", get(list))
        .route("/feedback/export.csv", get(export_csv))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackFilter {
    event: Option<String>,
}

#[derive(Debug, Serialize)]
struct FeedbackRow<'a> {
    feedback: &'a Feedback,
    event_title: &'a str,
}

fn filtered<'d>(viewer: &Viewer, data: &'d AppData, event: Option<&str>) -> Vec<&'d Feedback> {
    viewer
        .feedback(data)
        .into_iter()
        .filter(|f| event.is_none_or(|e| f.event_id == e))
        .collect()
}

async fn list(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(filter): Query<FeedbackFilter>,
) -> AppResult<Response> {
    viewer.require(Page::Feedback)?;
    let data = state.data.read();
    let event = form::optional(filter.event).filter(|e| e != "all");
    let entries = filtered(&viewer, &data, event.as_deref());

    let visible = viewer.feedback(&data);
    let events: Vec<_> = data
        .events()
        .iter()
        .filter(|e| visible.iter().any(|f| f.event_id == e.id))
        .collect();
    let rows: Vec<FeedbackRow> = entries
        .iter()
        .map(|&f| FeedbackRow {
            feedback: f,
            event_title: data.event_title(&f.event_id),
        })
        .collect();

    render(
        &state,
        &viewer,
        &data,
        "feedback.html",
        "/feedback",
        context! {
            summary => analytics::rating_summary(&entries),
            entries => rows,
            events => events,
            event_filter => event,
            can_export => viewer.permits(Permission::ExportFeedback),
        },
    )
}

async fn export_csv(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(filter): Query<FeedbackFilter>,
) -> AppResult<Response> {
    viewer.require(Page::Feedback)?;
    viewer.require_permission(Permission::ExportFeedback)?;
    let data = state.data.read();
    let event = form::optional(filter.event).filter(|e| e != "all");
    let entries = filtered(&viewer, &data, event.as_deref());

    Ok(attachment(export::feedback_csv(&data, &entries)))
}
