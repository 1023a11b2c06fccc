//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use ledger::InMemoryLedger;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;
use uuid::Uuid;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, InMemoryLedger) {
    let ledger = InMemoryLedger::new();
    let state = api::create_state(ledger.clone());
    let app = api::create_app(state, get_metrics_handle());
    (app, ledger)
}

fn create_order_body(command_id: Uuid, quantity: u32, unit_price_cents: i64) -> String {
    serde_json::to_string(&serde_json::json!({
        "command_id": command_id.to_string(),
        "user_id": Uuid::new_v4().to_string(),
        "items": [{
            "product_id": Uuid::new_v4().to_string(),
            "quantity": quantity,
            "unit_price_cents": unit_price_cents
        }]
    }))
    .unwrap()
}

async fn post_order(app: &axum::Router, body: String) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_order() {
    let (app, ledger) = setup();

    let (status, json) = post_order(&app, create_order_body(Uuid::new_v4(), 2, 10000)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(json["order_id"].as_str().is_some());
    assert_eq!(ledger.order_count().await, 1);
    assert_eq!(ledger.outbox_count().await, 1);
}

#[tokio::test]
async fn test_retried_create_returns_same_order_id() {
    let (app, ledger) = setup();
    let command_id = Uuid::new_v4();

    let (first_status, first) = post_order(&app, create_order_body(command_id, 1, 5000)).await;
    let (second_status, second) = post_order(&app, create_order_body(command_id, 1, 5000)).await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::CREATED);
    assert_eq!(first["order_id"], second["order_id"]);
    assert_eq!(ledger.order_count().await, 1);
    assert_eq!(ledger.outbox_count().await, 1);
}

#[tokio::test]
async fn test_invalid_items_are_rejected() {
    let (app, ledger) = setup();

    let (status, json) = post_order(&app, create_order_body(Uuid::new_v4(), 0, 100)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("quantity"));

    let (status, _) = post_order(&app, create_order_body(Uuid::new_v4(), 1, -1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(ledger.order_count().await, 0);
    assert_eq!(ledger.outbox_count().await, 0);
}

#[tokio::test]
async fn test_malformed_command_id_is_rejected() {
    let (app, _) = setup();

    let body = serde_json::to_string(&serde_json::json!({
        "command_id": "not-a-uuid",
        "user_id": Uuid::new_v4().to_string(),
        "items": [{
            "product_id": Uuid::new_v4().to_string(),
            "quantity": 1,
            "unit_price_cents": 100
        }]
    }))
    .unwrap();

    let (status, json) = post_order(&app, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("command_id"));
}

#[tokio::test]
async fn test_create_and_get_order() {
    let (app, _) = setup();

    let (_, created) = post_order(&app, create_order_body(Uuid::new_v4(), 2, 10000)).await;
    let order_id = created["order_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["id"], order_id);
    assert_eq!(json["status"], "New");
    assert_eq!(json["total_amount_cents"], 20000);
    assert_eq!(json["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_missing_order_returns_not_found() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
