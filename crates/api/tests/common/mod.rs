#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use lockerdesk_core::types::DbId;
use lockerdesk_occupancy::InMemoryStore;
use tower::ServiceExt;

use lockerdesk_api::config::ServerConfig;
use lockerdesk_api::router::build_app_router;
use lockerdesk_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults and near-instant retries.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        live_channel_capacity: 64,
        assign_max_attempts: 3,
        assign_retry_base_ms: 1,
    }
}

/// Build the full application router on top of `store`, with the same
/// middleware stack production uses.
pub fn build_test_app(store: Arc<InMemoryStore>) -> (Router, AppState) {
    let config = test_config();
    let state = AppState::new(store, config.clone());
    (build_app_router(state.clone(), &config), state)
}

/// A running app over a store holding one client with one four-door locker.
pub struct TestDesk {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub client_id: DbId,
    pub locker_id: DbId,
    pub doors: Vec<DbId>,
}

pub fn seeded_desk() -> TestDesk {
    let store = Arc::new(InMemoryStore::new());
    let client_id = store.add_client("Acme Offices").unwrap();
    let (locker, doors) = store.add_locker(client_id, "Lobby", 4).unwrap();
    let (app, state) = build_test_app(Arc::clone(&store));
    TestDesk {
        app,
        state,
        store,
        client_id,
        locker_id: locker.id,
        doors,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
