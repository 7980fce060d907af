use axum::{Router, extract::State, response::Response, routing::get};
use chrono::Utc;
use minijinja::context;

use super::{render, tasks::TaskRow};
use crate::{
    capability::{Page, Viewer},
    error::AppResult,
    router::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

async fn dashboard(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    viewer.require(Page::Dashboard)?;
    let data = state.data.read();
    let today = Utc::now().date_naive();

    let dashboard = viewer.dashboard(&data, today);
    let mut rows: Vec<TaskRow> = viewer
        .tasks(&data)
        .into_iter()
        .map(|t| TaskRow::new(t, &data, &viewer, today))
        .collect();
    rows.sort_by_key(|r| r.task.due_date);

    render(
        &state,
        &viewer,
        &data,
        dashboard.template,
        "/",
        context! {
            stats => dashboard.stats,
            tasks => rows,
        },
    )
}
