//! Poller and Prometheus client against a local fake Prometheus

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dockmon::core::config::{Settings, ValueSource};
use dockmon::core::poller;
use dockmon::core::{ContainerStatus, DashError, MetricsPoller, MetricsSource, PrometheusClient, SnapshotStore};
use dockmon::utils::{ALL_QUERIES, CPU_QUERY, IMAGE_QUERY, MEMORY_QUERY, STATUS_QUERY, UPTIME_QUERY};

#[derive(Clone, Default)]
struct FakePrometheus {
    fail_status: Arc<AtomicBool>,
    reject_memory: Arc<AtomicBool>,
    seen: Arc<Mutex<Vec<String>>>,
}

fn vector(results: Value) -> Value {
    json!({
        "status": "success",
        "data": { "resultType": "vector", "result": results }
    })
}

async fn query(State(fake): State<FakePrometheus>, Query(params): Query<HashMap<String, String>>) -> Response {
    let expr = params.get("query").cloned().unwrap_or_default();
    fake.seen.lock().unwrap().push(expr.clone());

    if expr == STATUS_QUERY && fake.fail_status.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response();
    }
    if expr == MEMORY_QUERY && fake.reject_memory.load(Ordering::SeqCst) {
        let body = json!({ "status": "error", "errorType": "bad_data", "error": "parse error" });
        return (StatusCode::OK, Json(body)).into_response();
    }

    let body = match expr.as_str() {
        STATUS_QUERY => vector(json!([
            {
                "metric": { "container_name": "web", "instance": "h1", "container_id": "c1" },
                "value": [1700000000.123, "1"]
            },
            {
                "metric": { "container_name": "db", "instance": "h1", "container_id": "" },
                "value": [1700000000.123, "0"]
            }
        ])),
        IMAGE_QUERY => vector(json!([
            {
                "metric": { "container_name": "web", "instance": "h1", "image": "nginx:latest" },
                "value": [1700000000.123, "1"]
            }
        ])),
        UPTIME_QUERY => vector(json!([
            {
                "metric": { "container_name": "web", "instance": "h1" },
                "value": [1700000000.123, "120.5"]
            }
        ])),
        CPU_QUERY => vector(json!([
            { "metric": { "instance": "h1" }, "value": [1700000000.123, "0.25"] }
        ])),
        MEMORY_QUERY => vector(json!([
            { "metric": { "instance": "h1" }, "value": [1700000000.123, "209715200"] }
        ])),
        // Prometheus answers success with no data for unknown series
        _ => json!({ "status": "success" }),
    };

    (StatusCode::OK, Json(body)).into_response()
}

async fn spawn_fake(fake: FakePrometheus) -> String {
    let app = Router::new()
        .route("/api/v1/query", get(query))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn poll_once_joins_container_series() {
    let base = spawn_fake(FakePrometheus::default()).await;
    let store = SnapshotStore::new();
    let poller = MetricsPoller::new(PrometheusClient::new(&base).unwrap(), store.clone(), 20);

    poller.poll_once().await.unwrap();
    let snapshot = store.current();

    assert_eq!(snapshot.tick, 1);
    assert_eq!(snapshot.containers.len(), 2);

    let web = snapshot.containers.iter().find(|c| c.name == "web").unwrap();
    assert_eq!(web.id, "c1");
    assert_eq!(web.image, "nginx:latest");
    assert_eq!(web.status, ContainerStatus::Running);
    assert_eq!(web.instance, "h1");
    assert_eq!(web.uptime, 120.5);

    let db = snapshot.containers.iter().find(|c| c.name == "db").unwrap();
    assert_eq!(db.id, "db");
    assert_eq!(db.image, "");
    assert_eq!(db.uptime, 0.0);
    assert_eq!(db.status, ContainerStatus::Stopped);

    assert_eq!(snapshot.memory.latest_for("h1").map(|s| s.value), Some(200.0));
    assert_eq!(snapshot.cpu.latest_for("h1").map(|s| s.value), Some(25.0));
}

#[tokio::test]
async fn query_expressions_survive_url_encoding() {
    let fake = FakePrometheus::default();
    let base = spawn_fake(fake.clone()).await;
    let client = PrometheusClient::new(&format!("{}/", base)).unwrap();
    assert_eq!(client.query_url(), format!("{}/api/v1/query", base));

    for expr in ALL_QUERIES {
        client.query(expr).await.unwrap();
    }

    let seen = fake.seen.lock().unwrap().clone();
    assert_eq!(seen, ALL_QUERIES.iter().map(|q| q.to_string()).collect::<Vec<_>>());
}

#[tokio::test]
async fn failed_status_query_keeps_previous_snapshot() {
    let fake = FakePrometheus::default();
    let base = spawn_fake(fake.clone()).await;
    let store = SnapshotStore::new();
    let poller = MetricsPoller::new(PrometheusClient::new(&base).unwrap(), store.clone(), 20);

    poller.poll_once().await.unwrap();
    let before = store.current();

    fake.fail_status.store(true, Ordering::SeqCst);
    match poller.poll_once().await {
        Err(DashError::Status { query, status }) => {
            assert_eq!(query, STATUS_QUERY);
            assert_eq!(status, 503);
        }
        other => panic!("expected status error, got {:?}", other.map(|_| ())),
    }

    let after = store.current();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.tick, 1);
    assert_eq!(after.containers.len(), 2);
}

#[tokio::test]
async fn backend_error_body_fails_the_tick() {
    let fake = FakePrometheus::default();
    fake.reject_memory.store(true, Ordering::SeqCst);
    let base = spawn_fake(fake).await;
    let client = PrometheusClient::new(&base).unwrap();

    match client.query(MEMORY_QUERY).await {
        Err(DashError::Backend { message, .. }) => assert_eq!(message, "bad_data: parse error"),
        other => panic!("expected backend error, got {:?}", other.map(|r| r.len())),
    }

    // Missing data decodes to an empty result list
    assert!(client.query("absent_metric").await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_backend_is_an_http_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = PrometheusClient::new(&format!("http://{}", addr)).unwrap();
    let err = client.query(STATUS_QUERY).await.unwrap_err();
    assert!(matches!(err, DashError::Http { .. }));
    assert_eq!(err.query(), Some(STATUS_QUERY));
}

#[tokio::test]
async fn started_poller_publishes_repeatedly() {
    let base = spawn_fake(FakePrometheus::default()).await;
    let settings = Settings {
        api_base_url: base,
        api_base_url_source: ValueSource::Flag,
        poll_interval: Duration::from_millis(100),
        poll_interval_source: ValueSource::Flag,
        points_per_host: 3,
    };

    let (store, handle) = poller::start(&settings).unwrap();
    let mut rx = store.subscribe();

    let wait = Duration::from_secs(10);
    while rx.borrow_and_update().tick < 5 {
        tokio::time::timeout(wait, rx.changed()).await.unwrap().unwrap();
    }

    // One host, three points per host
    let snapshot = store.current();
    assert_eq!(snapshot.memory.len(), 3);
    assert_eq!(snapshot.cpu.len(), 3);

    tokio::time::timeout(wait, handle.stop()).await.unwrap();
}
