//! Trade Store Trait
//!
//! This module defines the `TradeStore` trait, the keyed storage behind the
//! transaction processor. It holds three things:
//! - the append-only transaction log
//! - the current snapshot of every trade
//! - the net position per security
//!
//! plus the queue of transactions waiting for their ordering preconditions.
//!
//! ## Contract
//! - Every method is individually atomic and safe to call concurrently.
//! - No business rules live here; validate-then-apply sequences must be
//!   serialized by the caller.
//! - Snapshots are returned as owned copies.

use chrono::{DateTime, Utc};

use crate::domain::entities::pending::PendingEntry;
use crate::domain::entities::position::PositionEntry;
use crate::domain::entities::trade::TradeState;
use crate::domain::entities::transaction::{NewTransaction, TransactionRecord};
use crate::domain::errors::StoreError;

/// Common result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

pub trait TradeStore: Send + Sync {
    /// Assign the next sequential id (starting at 1), stamp creation time and store
    fn append_transaction(&self, transaction: NewTransaction) -> StoreResult<TransactionRecord>;

    fn get_transaction(&self, transaction_id: u64) -> StoreResult<Option<TransactionRecord>>;

    /// All transactions ordered by ascending id
    fn list_transactions(&self) -> StoreResult<Vec<TransactionRecord>>;

    /// Stamp a transaction as processed, returning the updated record
    fn mark_processed(
        &self,
        transaction_id: u64,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<TransactionRecord>;

    fn get_trade_state(&self, trade_id: u64) -> StoreResult<Option<TradeState>>;

    /// Insert or replace a trade snapshot, stamping its last-modified time
    fn upsert_trade_state(&self, state: TradeState) -> StoreResult<TradeState>;

    /// All trade snapshots ordered by trade id
    fn list_trade_states(&self) -> StoreResult<Vec<TradeState>>;

    /// Create-with-delta or add-to-existing in a single step
    fn apply_position_delta(&self, security_code: &str, delta: i64) -> StoreResult<PositionEntry>;

    /// All positions ordered by security code
    fn list_positions(&self) -> StoreResult<Vec<PositionEntry>>;

    fn enqueue_pending(&self, transaction_id: u64, reason: &str) -> StoreResult<()>;

    /// Pending entries in queue order
    fn list_pending(&self) -> StoreResult<Vec<PendingEntry>>;

    fn list_pending_ids(&self) -> StoreResult<Vec<u64>> {
        Ok(self
            .list_pending()?
            .into_iter()
            .map(|entry| entry.transaction_id)
            .collect())
    }

    /// Returns whether the id was queued
    fn remove_pending(&self, transaction_id: u64) -> StoreResult<bool>;
}
