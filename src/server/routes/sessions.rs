use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{blocking, by_name};
use crate::bindings::{ControlValue, Session};
use crate::chart_spec::ChartSpec;
use crate::error::DashboardError;
use crate::server::error::AppError;
use crate::server::state::AppState;

#[derive(Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub controls: BTreeMap<&'static str, ControlValue>,
    pub figures: BTreeMap<&'static str, ChartSpec>,
}

#[derive(Deserialize)]
pub struct ControlChange {
    pub control: String,
    pub value: ControlValue,
}

#[derive(Serialize)]
pub struct ChangedFigures {
    pub figures: BTreeMap<&'static str, ChartSpec>,
}

fn session_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| DashboardError::SessionNotFound(raw.to_string()).into())
}

fn view(session: &Session, state: &AppState) -> Result<SessionView, AppError> {
    Ok(SessionView {
        session_id: session.id(),
        controls: session.values(),
        figures: by_name(session.render_all(&state.store)?),
    })
}

/// POST /api/sessions
///
/// Open a session with default control values and all figures rendered.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let body = blocking(state, |s| {
        let session = Session::new(s.store.domains());
        let body = view(&session, s)?;
        s.insert_session(session)?;
        Ok(body)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(body)))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let id = session_id(&id)?;
    let body = blocking(state, move |s| view(&s.session(id)?, s)).await?;
    Ok(Json(body))
}

/// POST /api/sessions/:id/controls
///
/// Set one control and return only the figures it invalidates.
pub async fn update_control(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<ControlChange>, JsonRejection>,
) -> Result<Json<ChangedFigures>, AppError> {
    let id = session_id(&id)?;
    let Json(change) = body?;

    let figures = blocking(state, move |s| {
        s.update_session(id, |session| {
            session.apply(&s.store, &s.bindings, &change.control, change.value)
        })
    })
    .await?;

    Ok(Json(ChangedFigures {
        figures: by_name(figures),
    }))
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.remove_session(session_id(&id)?)?;
    Ok(StatusCode::NO_CONTENT)
}
