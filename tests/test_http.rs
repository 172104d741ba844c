//! Router tests: feed registration, read-only lookups and the published snapshot.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use feed_pulse::metrics::{stream, MetricsCollector};
use feed_pulse::{server, AppState};
use serde_json::Value;
use tower::ServiceExt;

fn app() -> (Arc<AppState>, Router) {
    let metrics = Arc::new(MetricsCollector::new());
    let (latest, _publisher) = stream::spawn_publisher(metrics.clone(), Duration::from_millis(10));
    let state = Arc::new(AppState::new(metrics, latest));
    let router = server::create_router(state.clone(), "static");
    (state, router)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_register_and_lookup_feed() {
    let (_state, app) = app();

    let response = app
        .clone()
        .oneshot(post_json("/api/feeds", serde_json::json!({"id": "btc", "name": "Bitcoin"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().contains_key("X-Response-Time-Us"));
    assert!(response.headers().contains_key("Server-Timing"));
    let body = json_body(response).await;
    assert_eq!(body["feed_id"], "btc");
    assert_eq!(body["name"], "Bitcoin");

    let response = app
        .clone()
        .oneshot(post_json("/api/feeds/btc/messages", serde_json::json!({"payload_size": 512})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::get("/api/feeds/btc").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["messages_received_total"], 1);
    assert_eq!(body["bytes_received_total"], 512);
}

#[tokio::test]
async fn test_generated_id_when_absent() {
    let (state, app) = app();

    let response = app
        .oneshot(post_json("/api/feeds", serde_json::json!({"name": "anon"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let id = body["feed_id"].as_str().unwrap();
    assert_eq!(id.len(), 36);
    assert!(state.metrics.contains(id));
}

#[tokio::test]
async fn test_unknown_feed_is_404() {
    let (_state, app) = app();

    let response = app
        .clone()
        .oneshot(Request::get("/api/feeds/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["status"], 404);

    let response = app
        .oneshot(post_json("/api/feeds/nope/messages", serde_json::json!({"payload_size": 1})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blank_name_is_rejected() {
    let (_state, app) = app();
    let response = app
        .oneshot(post_json("/api/feeds", serde_json::json!({"name": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint_serves_published_snapshot() {
    let (state, app) = app();
    state.metrics.init_feed("b", "bravo");
    state.metrics.init_feed("a", "alpha");

    // Wait for the ticker to publish a snapshot containing both feeds
    let mut latest = state.latest.clone();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if latest.borrow_and_update().len() == 2 {
                break;
            }
            latest.changed().await.unwrap();
        }
    })
    .await
    .expect("publisher never caught up");

    let response = app
        .oneshot(Request::get("/api/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alpha", "bravo"]);
}

#[tokio::test]
async fn test_simulation_rejects_bad_config_and_reports_idle() {
    let (_state, app) = app();

    let response = app
        .clone()
        .oneshot(post_json("/api/simulation/start", serde_json::json!({"feeds": 0})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(Request::get("/api/simulation/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["running"], false);
}
