use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, Json};
use serde_json::{json, Value};

use crate::bindings::{descriptors, ControlDescriptor};
use crate::server::error::AppError;
use crate::server::state::AppState;
use crate::store::Summary;

const DASHBOARD_PAGE: &str = include_str!("../../dashboard.html");

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(DASHBOARD_PAGE)
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "status": "ok",
        "rows": state.store.len(),
        "sessions": state.session_count()?,
    })))
}

/// GET /api/summary
///
/// Headline KPIs computed at load.
pub async fn summary(State(state): State<Arc<AppState>>) -> Json<Summary> {
    Json(state.store.summary().clone())
}

/// GET /api/controls
///
/// Widget descriptors with their defaults.
pub async fn controls(State(state): State<Arc<AppState>>) -> Json<Vec<ControlDescriptor>> {
    Json(descriptors(state.store.domains()))
}
