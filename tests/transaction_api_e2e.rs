//! Transaction API End-to-End Tests
//!
//! Drives the HTTP router the way a client would:
//! 1. Submission outcomes and status codes
//! 2. Position and transaction listings
//! 3. Pending queue visibility and standalone drain

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use tradebook::application::handlers::transaction_handler::router;
use tradebook::domain::services::transaction_processor::TransactionProcessor;
use tradebook::persistence::InMemoryTradeStore;

fn app() -> Router {
    let processor = Arc::new(TransactionProcessor::new(Arc::new(InMemoryTradeStore::new())));
    router(processor, 64 * 1024)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn post_transaction(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/transaction")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

fn tx(trade_id: i64, version: i64, action: &str, code: &str, quantity: i64, side: &str) -> Value {
    json!({
        "tradeId": trade_id,
        "version": version,
        "action": action,
        "securityCode": code,
        "quantity": quantity,
        "side": side,
    })
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(&app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn test_full_lifecycle_over_http() {
    let app = app();

    let (status, body) = post_transaction(&app, tx(1, 1, "insert", "AAPL", 100, "buy")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "applied");
    assert_eq!(body["data"]["transactionId"], 1);
    assert_eq!(body["message"], "Transaction processed successfully");

    post_transaction(&app, tx(1, 2, "UPDATE", "AAPL", 50, "BUY")).await;
    let (_, positions) = get(&app, "/api/positions").await;
    assert_eq!(positions[0]["securityCode"], "AAPL");
    assert_eq!(positions[0]["netQuantity"], "+50");

    post_transaction(&app, tx(1, 3, "CANCEL", "AAPL", 50, "BUY")).await;
    let (_, positions) = get(&app, "/api/positions").await;
    assert_eq!(positions[0]["netQuantity"], "0");

    let (status, trades) = get(&app, "/api/trades").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trades[0]["status"], "CANCELLED");
    assert_eq!(trades[0]["currentVersion"], 3);

    let (_, transactions) = get(&app, "/api/alltransactions").await;
    let transactions = transactions.as_array().unwrap();
    assert_eq!(transactions.len(), 3);
    assert_eq!(transactions[0]["transactionId"], 1);
    assert_eq!(transactions[2]["action"], "CANCEL");
    assert_eq!(transactions[2]["isProcessed"], true);
}

#[tokio::test]
async fn test_out_of_order_update_is_queued_then_applied() {
    let app = app();

    let (status, body) = post_transaction(&app, tx(2, 2, "UPDATE", "MSFT", 10, "SELL")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "queued");
    assert_eq!(body["accepted"], true);
    assert_eq!(
        body["message"],
        "Transaction queued for processing. Reason: data does not exist"
    );

    let (_, pending) = get(&app, "/api/pending").await;
    assert_eq!(pending[0]["transactionId"], 1);
    assert_eq!(pending[0]["reason"], "data does not exist");

    post_transaction(&app, tx(2, 1, "INSERT", "MSFT", 10, "SELL")).await;

    let (_, positions) = get(&app, "/api/positions").await;
    assert_eq!(positions[0]["netQuantity"], "-10");
    let (_, pending) = get(&app, "/api/pending").await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_tokens_are_rejected_without_persisting() {
    let app = app();

    let (status, body) = post_transaction(&app, tx(1, 1, "DELETE", "AAPL", 10, "BUY")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["accepted"], false);

    let (status, _) = post_transaction(&app, tx(1, 1, "INSERT", "AAPL", 0, "BUY")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, transactions) = get(&app, "/api/alltransactions").await;
    assert!(transactions.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_client_error() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/transaction")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"tradeId": "one"}"#))
        .unwrap();

    let (status, _) = send(&app, request).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_standalone_drain_endpoint() {
    let app = app();
    post_transaction(&app, tx(3, 1, "INSERT", "IBM", 5, "BUY")).await;
    post_transaction(&app, tx(3, 3, "UPDATE", "IBM", 7, "BUY")).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/pending/drain")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Processed 0 pending transactions");
    assert_eq!(body["report"]["remaining"], 1);
}
