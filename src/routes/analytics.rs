use axum::{
    Router,
    extract::{Query, State},
    response::Response,
    routing::get,
};
use chrono::Utc;
use minijinja::context;
use serde::Deserialize;

use super::{attachment, render};
use crate::{
    analytics,
    capability::{Page, Permission, Viewer},
    error::AppResult,
    export,
    router::AppState,
};

pub const RANGES: &[u64] = &[7, 30, 90, 365];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analytics", get(overview))
        .route("/analytics/export.json", get(export_json))
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    range: Option<String>,
}

impl RangeQuery {
    /// Days to look back; `all`, blank or an unlisted value means no limit.
    fn days(&self) -> Option<u64> {
        self.range
            .as_deref()
            .and_then(|r| r.parse().ok())
            .filter(|d| RANGES.contains(d))
    }
}

async fn overview(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<RangeQuery>,
) -> AppResult<Response> {
    viewer.require(Page::Analytics)?;
    let data = state.data.read();
    let report = analytics::report(&data, query.days(), Utc::now());

    render(
        &state,
        &viewer,
        &data,
        "analytics.html",
        "/analytics",
        context! {
            report => report,
            ranges => RANGES,
            can_export => viewer.permits(Permission::ExportAnalytics),
        },
    )
}

async fn export_json(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<RangeQuery>,
) -> AppResult<Response> {
    viewer.require(Page::Analytics)?;
    viewer.require_permission(Permission::ExportAnalytics)?;
    let report = analytics::report(&state.data.read(), query.days(), Utc::now());

    Ok(attachment(export::analytics_json(&report)?))
}
