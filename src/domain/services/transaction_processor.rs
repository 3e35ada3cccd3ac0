//! TransactionProcessor - validates versioned trade transactions against the
//! current trade state, applies them to trades and positions, and retries
//! transactions that arrived out of order.
//!
//! # Lifecycle
//! `RECEIVED -> APPLIED | PENDING`, then `PENDING -> APPLIED` or dropped once
//! found already processed. A persisted transaction is never marked failed;
//! malformed input is rejected before anything is persisted.
//!
//! # Lock ordering
//! Two gates, always taken in this order:
//! 1. `submission_gate` - held for a whole submission, drain included
//! 2. `drain_gate` - held for one pass over the pending queue
//!
//! Read-only listings take neither gate.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::domain::entities::pending::PendingEntry;
use crate::domain::entities::position::PositionView;
use crate::domain::entities::trade::TradeState;
use crate::domain::entities::transaction::{TransactionAction, TransactionInput, TransactionRecord};
use crate::domain::errors::ProcessingError;
use crate::domain::repositories::trade_store::{StoreResult, TradeStore};
use crate::domain::services::position_ledger::PositionLedger;

/// Why a transaction cannot be applied yet. Always retryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    TradeAlreadyExists,
    InsertVersionNotOne { got: u32 },
    TradeNotFound,
    AlreadyCancelled,
    VersionMismatch { expected: u64, got: u32 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::TradeAlreadyExists => write!(f, "Trade already exists"),
            RejectReason::InsertVersionNotOne { got } => {
                write!(f, "INSERT must have Version=1, got Version={}", got)
            }
            RejectReason::TradeNotFound => write!(f, "data does not exist"),
            RejectReason::AlreadyCancelled => write!(f, "already cancelled"),
            RejectReason::VersionMismatch { expected, got } => {
                write!(f, "Expected Version={}, got Version={}", expected, got)
            }
        }
    }
}

/// Check ordering preconditions of `record` against the trade's current snapshot
pub fn validate(record: &TransactionRecord, current: Option<&TradeState>) -> Result<(), RejectReason> {
    match (record.action, current) {
        (TransactionAction::Insert, Some(_)) => Err(RejectReason::TradeAlreadyExists),
        (TransactionAction::Insert, None) if record.version != 1 => {
            Err(RejectReason::InsertVersionNotOne { got: record.version })
        }
        (TransactionAction::Insert, None) => Ok(()),
        (_, None) => Err(RejectReason::TradeNotFound),
        (_, Some(trade)) if trade.is_cancelled() => Err(RejectReason::AlreadyCancelled),
        (_, Some(trade)) if u64::from(record.version) != trade.next_version() => {
            Err(RejectReason::VersionMismatch {
                expected: trade.next_version(),
                got: record.version,
            })
        }
        (_, Some(_)) => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitStatus {
    Applied,
    Queued,
    Failed,
}

/// Structured result of one submission; every submission yields one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub status: SubmitStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl SubmitOutcome {
    fn applied(transaction_id: u64) -> Self {
        Self {
            accepted: true,
            id: Some(transaction_id),
            status: SubmitStatus::Applied,
            message: "Transaction processed successfully".to_string(),
            data: Some(serde_json::json!({ "transactionId": transaction_id })),
        }
    }

    fn queued(transaction_id: u64, reason: &RejectReason) -> Self {
        Self {
            accepted: true,
            id: Some(transaction_id),
            status: SubmitStatus::Queued,
            message: format!("Transaction queued for processing. Reason: {}", reason),
            data: None,
        }
    }

    fn failed(message: String, transaction_id: Option<u64>) -> Self {
        Self {
            accepted: false,
            id: transaction_id,
            status: SubmitStatus::Failed,
            message,
            data: None,
        }
    }
}

/// Summary of one pass over the pending queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub examined: usize,
    pub applied: usize,
    pub dropped: usize,
    pub remaining: usize,
}

impl DrainReport {
    pub fn message(&self) -> String {
        if self.examined == 0 {
            "No pending transactions".to_string()
        } else {
            format!("Processed {} pending transactions", self.applied)
        }
    }
}

pub struct TransactionProcessor {
    store: Arc<dyn TradeStore>,
    ledger: PositionLedger,
    submission_gate: Mutex<()>,
    drain_gate: Mutex<()>,
}

impl TransactionProcessor {
    pub fn new(store: Arc<dyn TradeStore>) -> Self {
        Self {
            ledger: PositionLedger::new(store.clone()),
            store,
            submission_gate: Mutex::new(()),
            drain_gate: Mutex::new(()),
        }
    }

    /// Submit one transaction: persist, then apply or queue, then drain
    pub async fn submit(&self, input: TransactionInput) -> SubmitOutcome {
        let _submission = self.submission_gate.lock().await;

        info!(
            "Processing transaction: TradeID={}, Version={}, Action={}",
            input.trade_id, input.version, input.action
        );

        let transaction = match input.into_transaction() {
            Ok(transaction) => transaction,
            Err(e) => {
                warn!("Rejected transaction input: {}", e);
                return SubmitOutcome::failed(format!("Invalid transaction data: {}", e), None);
            }
        };

        let record = match self.store.append_transaction(transaction) {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to persist transaction: {}", e);
                return SubmitOutcome::failed(format!("Error: {}", e), None);
            }
        };
        let transaction_id = record.transaction_id;
        info!("Transaction saved with ID: {}", transaction_id);

        match self.try_apply(&record) {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                warn!("Transaction {} queued: {}", transaction_id, reason);
                if let Err(e) = self.store.enqueue_pending(transaction_id, &reason.to_string()) {
                    error!("Failed to queue transaction {}: {}", transaction_id, e);
                    return SubmitOutcome::failed(format!("Error: {}", e), Some(transaction_id));
                }
                return SubmitOutcome::queued(transaction_id, &reason);
            }
            Err(e) => {
                error!("Error processing transaction {}: {}", transaction_id, e);
                return SubmitOutcome::failed(format!("Error: {}", e), Some(transaction_id));
            }
        }

        let report = self.drain_locked().await;
        if report.applied > 0 {
            info!("{}", report.message());
        }

        SubmitOutcome::applied(transaction_id)
    }

    /// Run one drain pass on its own, serialized with submissions
    pub async fn drain_pending(&self) -> DrainReport {
        let _submission = self.submission_gate.lock().await;
        self.drain_locked().await
    }

    /// One best-effort pass in queue order; not repeated until a fixed point
    async fn drain_locked(&self) -> DrainReport {
        let _drain = self.drain_gate.lock().await;

        let pending_ids = match self.store.list_pending_ids() {
            Ok(ids) => ids,
            Err(e) => {
                error!("Failed to list pending transactions: {}", e);
                return DrainReport::default();
            }
        };
        if pending_ids.is_empty() {
            return DrainReport::default();
        }

        info!("Processing {} pending transactions", pending_ids.len());
        let mut report = DrainReport {
            examined: pending_ids.len(),
            ..DrainReport::default()
        };

        for transaction_id in pending_ids {
            match self.retry_pending(transaction_id) {
                Ok(PendingRetry::Applied) => {
                    report.applied += 1;
                    info!("Pending transaction {} processed successfully", transaction_id);
                }
                Ok(PendingRetry::Dropped) => report.dropped += 1,
                Ok(PendingRetry::StillPending) => {}
                Err(e) => {
                    error!("Error retrying pending transaction {}: {}", transaction_id, e);
                }
            }
        }

        report.remaining = match self.store.list_pending_ids() {
            Ok(ids) => ids.len(),
            Err(e) => {
                error!("Failed to count remaining pending transactions: {}", e);
                0
            }
        };
        report
    }

    fn retry_pending(&self, transaction_id: u64) -> Result<PendingRetry, ProcessingError> {
        let record = match self.store.get_transaction(transaction_id)? {
            Some(record) if !record.is_processed => record,
            _ => {
                self.store.remove_pending(transaction_id)?;
                return Ok(PendingRetry::Dropped);
            }
        };

        match self.try_apply(&record)? {
            Ok(()) => {
                self.store.remove_pending(transaction_id)?;
                Ok(PendingRetry::Applied)
            }
            Err(_) => Ok(PendingRetry::StillPending),
        }
    }

    /// Validate against the current snapshot and apply when valid.
    ///
    /// Outer error: unexpected failure. Inner error: ordering precondition unmet.
    fn try_apply(
        &self,
        record: &TransactionRecord,
    ) -> Result<Result<(), RejectReason>, ProcessingError> {
        let current = self.store.get_trade_state(record.trade_id)?;
        if let Err(reason) = validate(record, current.as_ref()) {
            return Ok(Err(reason));
        }

        self.apply(record, current)?;
        self.store.mark_processed(record.transaction_id, Utc::now())?;
        Ok(Ok(()))
    }

    fn apply(
        &self,
        record: &TransactionRecord,
        current: Option<TradeState>,
    ) -> Result<TradeState, ProcessingError> {
        match (record.action, current) {
            (TransactionAction::Insert, _) => self.apply_insert(record),
            (TransactionAction::Update, Some(trade)) => self.apply_update(record, trade),
            (TransactionAction::Cancel, Some(trade)) => self.apply_cancel(record, trade),
            (_, None) => Err(ProcessingError::TradeVanished {
                trade_id: record.trade_id,
            }),
        }
    }

    fn apply_insert(&self, record: &TransactionRecord) -> Result<TradeState, ProcessingError> {
        self.ledger
            .book(&record.security_code, record.side, record.quantity)?;
        match self.store.upsert_trade_state(TradeState::opened_by(record)) {
            Ok(state) => Ok(state),
            Err(e) => {
                self.ledger
                    .reverse(&record.security_code, record.side, record.quantity)?;
                Err(e.into())
            }
        }
    }

    fn apply_update(
        &self,
        record: &TransactionRecord,
        mut trade: TradeState,
    ) -> Result<TradeState, ProcessingError> {
        info!(
            "UPDATE: TradeID={}, Old: {}/{}/{}, New: {}/{}/{}",
            record.trade_id,
            trade.security_code,
            trade.quantity,
            trade.side,
            record.security_code,
            record.quantity,
            record.side
        );

        self.ledger
            .reverse(&trade.security_code, trade.side, trade.quantity)?;
        if let Err(e) = self
            .ledger
            .book(&record.security_code, record.side, record.quantity)
        {
            // Restore the reversed contribution so the position stays consistent
            self.ledger
                .book(&trade.security_code, trade.side, trade.quantity)?;
            return Err(e.into());
        }

        let previous = trade.clone();
        trade.amend(record);
        match self.store.upsert_trade_state(trade) {
            Ok(state) => Ok(state),
            Err(e) => {
                self.ledger
                    .reverse(&record.security_code, record.side, record.quantity)?;
                self.ledger
                    .book(&previous.security_code, previous.side, previous.quantity)?;
                Err(e.into())
            }
        }
    }

    fn apply_cancel(
        &self,
        record: &TransactionRecord,
        mut trade: TradeState,
    ) -> Result<TradeState, ProcessingError> {
        info!(
            "CANCEL: TradeID={}, reversing {}/{}/{}",
            record.trade_id, trade.security_code, trade.quantity, trade.side
        );

        self.ledger
            .reverse(&trade.security_code, trade.side, trade.quantity)?;
        let previous = trade.clone();
        trade.cancel(record);
        match self.store.upsert_trade_state(trade) {
            Ok(state) => Ok(state),
            Err(e) => {
                self.ledger
                    .book(&previous.security_code, previous.side, previous.quantity)?;
                Err(e.into())
            }
        }
    }

    pub fn list_transactions(&self) -> StoreResult<Vec<TransactionRecord>> {
        self.store.list_transactions()
    }

    pub fn list_positions(&self) -> StoreResult<Vec<PositionView>> {
        self.ledger.positions()
    }

    pub fn list_trade_states(&self) -> StoreResult<Vec<TradeState>> {
        self.store.list_trade_states()
    }

    pub fn list_pending(&self) -> StoreResult<Vec<PendingEntry>> {
        self.store.list_pending()
    }
}

enum PendingRetry {
    Applied,
    Dropped,
    StillPending,
}
