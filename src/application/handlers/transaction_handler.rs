use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::error;

use crate::domain::entities::pending::PendingEntry;
use crate::domain::entities::position::PositionView;
use crate::domain::entities::trade::TradeState;
use crate::domain::entities::transaction::{TransactionInput, TransactionRecord};
use crate::domain::errors::StoreError;
use crate::domain::services::transaction_processor::{
    DrainReport, SubmitOutcome, SubmitStatus, TransactionProcessor,
};

pub type SharedProcessor = Arc<TransactionProcessor>;

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// API response for a standalone drain pass
#[derive(Debug, Serialize, Deserialize)]
pub struct DrainResponse {
    pub message: String,
    pub report: DrainReport,
}

type HandlerResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn internal_error(e: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    error!("Store read failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

/// Routes for the transaction API, mounted under `/api`
pub fn router(processor: SharedProcessor, max_body_bytes: usize) -> Router {
    let api = Router::new()
        .route("/transaction", post(submit_transaction))
        .route("/positions", get(get_positions))
        .route("/alltransactions", get(get_all_transactions))
        .route("/trades", get(get_trades))
        .route("/pending", get(get_pending))
        .route("/pending/drain", post(drain_pending));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(processor)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "running" }))
}

/// Submit a transaction; queued outcomes are successes, failures map to 400
pub async fn submit_transaction(
    State(processor): State<SharedProcessor>,
    Json(input): Json<TransactionInput>,
) -> (StatusCode, Json<SubmitOutcome>) {
    let outcome = processor.submit(input).await;
    let status = match outcome.status {
        SubmitStatus::Applied | SubmitStatus::Queued => StatusCode::OK,
        SubmitStatus::Failed => {
            error!("Transaction processing failed: {}", outcome.message);
            StatusCode::BAD_REQUEST
        }
    };
    (status, Json(outcome))
}

pub async fn get_positions(State(processor): State<SharedProcessor>) -> HandlerResult<Vec<PositionView>> {
    processor.list_positions().map(Json).map_err(internal_error)
}

pub async fn get_all_transactions(
    State(processor): State<SharedProcessor>,
) -> HandlerResult<Vec<TransactionRecord>> {
    processor.list_transactions().map(Json).map_err(internal_error)
}

pub async fn get_trades(State(processor): State<SharedProcessor>) -> HandlerResult<Vec<TradeState>> {
    processor.list_trade_states().map(Json).map_err(internal_error)
}

pub async fn get_pending(State(processor): State<SharedProcessor>) -> HandlerResult<Vec<PendingEntry>> {
    processor.list_pending().map(Json).map_err(internal_error)
}

pub async fn drain_pending(State(processor): State<SharedProcessor>) -> Json<DrainResponse> {
    let report = processor.drain_pending().await;
    Json(DrainResponse {
        message: report.message(),
        report,
    })
}
