//! HTTP surface: the dashboard page plus a JSON API over the store and the
//! per-viewer sessions.

pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::meta::index))
        .route("/api/health", get(routes::meta::health))
        .route("/api/summary", get(routes::meta::summary))
        .route("/api/controls", get(routes::meta::controls))
        .route("/api/figures/{figure}", post(routes::figures::render_figure))
        .route("/api/sessions", post(routes::sessions::create_session))
        .route(
            "/api/sessions/{id}",
            get(routes::sessions::get_session).delete(routes::sessions::delete_session),
        )
        .route(
            "/api/sessions/{id}/controls",
            post(routes::sessions::update_control),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
