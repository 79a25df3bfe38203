mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use sales_dashboard::server::{router, AppState};

fn app_with_cap(max_sessions: usize) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Arc::new(common::load_store()), max_sessions));
    (router(state.clone()), state)
}

fn app() -> Router {
    app_with_cap(16).0
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn health_and_summary() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, "GET", "/api/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_revenue"], 880.0);
    assert_eq!(body["total_orders"], 6);
}

#[tokio::test]
async fn index_serves_the_page() {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("Sales Dashboard"));
}

#[tokio::test]
async fn controls_list_every_widget() {
    let (status, body) = send(&app(), "GET", "/api/controls", None).await;
    assert_eq!(status, StatusCode::OK);
    let controls = body.as_array().unwrap();
    assert_eq!(controls.len(), 13);
    let range = controls
        .iter()
        .find(|c| c["id"] == "discount_impact.range")
        .unwrap();
    assert_eq!(range["kind"], "number_pair");
    assert_eq!(range["step"], 0.05);
    assert_eq!(range["default"], json!([0.0, 0.5]));
}

#[tokio::test]
async fn stateless_figure_render() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/figures/geography",
        Some(json!({"dimension": "Region", "metric": "Total_sales"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mark"], "bar");
    assert_eq!(body["data"]["rows"].as_array().unwrap().len(), 4);

    let (status, body) = send(&app, "POST", "/api/figures/fig9", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("fig9"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/figures/geography",
        Some(json!({"dimension": "Planet", "metric": "Profit"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_round_trip() {
    let app = app();
    let (status, created) = send(&app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["session_id"].as_str().unwrap().to_string();
    assert_eq!(created["figures"].as_object().unwrap().len(), 5);
    assert_eq!(created["controls"]["geography.dimension"], "Country");

    let (status, changed) = send(
        &app,
        "POST",
        &format!("/api/sessions/{id}/controls"),
        Some(json!({"control": "geography.dimension", "value": "Market"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let figures = changed["figures"].as_object().unwrap();
    assert_eq!(figures.len(), 1);
    assert_eq!(figures["geography"]["title"], "Total_sales by Market");

    let (status, current) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["controls"]["geography.dimension"], "Market");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/sessions/{id}/controls"),
        Some(json!({"control": "geography.colour", "value": "red"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "DELETE", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/sessions/not-a-session", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/api/sessions/00000000-0000-0000-0000-000000000000/controls",
        Some(json!({"control": "geography.metric", "value": "Profit"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn least_recently_used_session_is_evicted() {
    let (app, state) = app_with_cap(2);
    let (_, first) = send(&app, "POST", "/api/sessions", None).await;
    let first = first["session_id"].as_str().unwrap().to_string();
    let (_, second) = send(&app, "POST", "/api/sessions", None).await;
    let second = second["session_id"].as_str().unwrap().to_string();

    // Touch the first so the second becomes the oldest.
    let (status, _) = send(&app, "GET", &format!("/api/sessions/{first}"), None).await;
    assert_eq!(status, StatusCode::OK);

    send(&app, "POST", "/api/sessions", None).await;
    assert_eq!(state.session_count().unwrap(), 2);

    let (status, _) = send(&app, "GET", &format!("/api/sessions/{second}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", &format!("/api/sessions/{first}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_control_updates_all_persist() {
    let app = app();
    let (_, created) = send(&app, "POST", "/api/sessions", None).await;
    let id = created["session_id"].as_str().unwrap().to_string();

    let changes = [
        json!({"control": "sales_over_time.window", "value": 14}),
        json!({"control": "sales_over_time.measure", "value": "Profit"}),
        json!({"control": "geography.metric", "value": "Profit"}),
        json!({"control": "seasonality.view", "value": "line"}),
    ];
    let tasks: Vec<_> = changes
        .into_iter()
        .map(|change| {
            let app = app.clone();
            let uri = format!("/api/sessions/{id}/controls");
            tokio::spawn(async move { send(&app, "POST", &uri, Some(change)).await.0 })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    let (_, current) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
    let controls = &current["controls"];
    assert_eq!(controls["sales_over_time.window"], 14.0);
    assert_eq!(controls["sales_over_time.measure"], "Profit");
    assert_eq!(controls["geography.metric"], "Profit");
    assert_eq!(controls["seasonality.view"], "line");
}

#[tokio::test]
async fn poisoned_session_lock_is_reported() {
    let (app, state) = app_with_cap(4);
    let poisoner = state.clone();
    let _ = std::thread::spawn(move || {
        let _guard = poisoner.sessions.lock().unwrap();
        panic!("poison the session map");
    })
    .join();

    assert!(state.session_count().is_err());
    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn oversized_window_renders_an_undefined_series() {
    let (status, body) = send(
        &app(),
        "POST",
        "/api/figures/sales_over_time",
        Some(json!({"window": 1u64 << 58, "measure": "Sales"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r["Moving_Avg"].is_null()));
}
