use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use serde_json::Value;

use super::blocking;
use crate::chart_spec::ChartSpec;
use crate::figures::{self, Figure};
use crate::server::error::AppError;
use crate::server::state::AppState;

/// POST /api/figures/:figure
///
/// Stateless render. The body is the filter of that figure, e.g.
/// `{"dimension": "Market", "metric": "Profit"}` for `geography`.
pub async fn render_figure(
    State(state): State<Arc<AppState>>,
    Path(figure): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChartSpec>, AppError> {
    let figure: Figure = figure.parse()?;
    let Json(body) = body?;
    let filter = figures::parse_filter(figure, body)?;

    let spec = blocking(state, move |s| Ok(figures::render(&s.store, &filter)?)).await?;
    Ok(Json(spec))
}
