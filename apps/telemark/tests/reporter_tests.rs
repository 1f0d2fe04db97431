//! Reporter tests against a local collector.
//!
//! Each test binds an axum collector on an ephemeral port and points an
//! `HttpReporter` at it.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use telemark::analytics::{HttpReporter, Report};
use telemark_core::Snapshot;

type Received = Arc<Mutex<Vec<Value>>>;

async fn collect(State(received): State<Received>, Json(body): Json<Value>) -> StatusCode {
    received.lock().unwrap().push(body);
    StatusCode::OK
}

/// Serve `router` on an ephemeral local port.
async fn spawn_collector(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn sample() -> Snapshot {
    Snapshot {
        install_id: "install-1".to_string(),
        version: "0.1.0".to_string(),
        upload_index: 3,
        storage_profiles: 2048,
        spy_pyspy: 7,
        ..Snapshot::zero()
    }
}

#[tokio::test]
async fn test_posts_snapshot_as_json() {
    let received = Received::default();
    let router = Router::new()
        .route("/api/events", post(collect))
        .with_state(Arc::clone(&received));
    let addr = spawn_collector(router).await;

    let reporter =
        HttpReporter::new(format!("http://{addr}/api/events"), Duration::from_secs(5)).unwrap();
    reporter.report(&sample()).await;

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    let body = &received[0];
    assert_eq!(body["install_id"], "install-1");
    assert_eq!(body["upload_index"], 3);
    assert_eq!(body["storage_profiles"], 2048);
    assert_eq!(body["spy_pyspy"], 7);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_rejection_is_swallowed() {
    let router = Router::new().route(
        "/api/events",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let addr = spawn_collector(router).await;

    let reporter =
        HttpReporter::new(format!("http://{addr}/api/events"), Duration::from_secs(5)).unwrap();
    reporter.report(&sample()).await;
}

#[tokio::test]
async fn test_unreachable_collector_is_swallowed() {
    // Bind then drop to get a port nobody listens on.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let reporter =
        HttpReporter::new(format!("http://{addr}/api/events"), Duration::from_secs(5)).unwrap();
    reporter.report(&sample()).await;
}

#[tokio::test]
async fn test_slow_collector_hits_timeout() {
    let router = Router::new().route(
        "/api/events",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            StatusCode::OK
        }),
    );
    let addr = spawn_collector(router).await;

    let reporter =
        HttpReporter::new(format!("http://{addr}/api/events"), Duration::from_millis(200))
            .unwrap();
    let started = std::time::Instant::now();
    reporter.report(&sample()).await;

    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_reporter_keeps_url() {
    let reporter =
        HttpReporter::new("http://127.0.0.1:1/api/events", Duration::from_secs(1)).unwrap();
    assert_eq!(reporter.url(), "http://127.0.0.1:1/api/events");
}
