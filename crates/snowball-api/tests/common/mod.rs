//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use snowball_core::ids::RecordKey;
use snowball_core::store::ProgressDocumentStore;
use snowball_progress::application::admin::AdminConsole;
use snowball_story::SectionGraph;
use snowball_test_support::FixedClock;
use tower::ServiceExt;

use snowball_api::app;
use snowball_api::state::AppState;

/// Build the full app router over `store` with a fixed clock. Uses the
/// same route structure as `main.rs`.
pub fn build_test_app(store: Arc<dyn ProgressDocumentStore>) -> Router {
    let clock = Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ));
    let console = AdminConsole::new(
        RecordKey::default(),
        Arc::new(SectionGraph::builtin().unwrap()),
        store,
        clock,
    );
    app(AppState::new(console))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a body-less request with `method` and return the response.
pub async fn request(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    request(app, "GET", uri).await
}
