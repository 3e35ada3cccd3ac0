//! In-Memory Trade Store
//!
//! Process-lifetime implementation of `TradeStore`. Each collection sits
//! behind its own lock so reads of one never wait on writes to another.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};
use tracing::{debug, error};

use super::pending_queue::PendingQueue;
use crate::domain::entities::pending::PendingEntry;
use crate::domain::entities::position::PositionEntry;
use crate::domain::entities::trade::TradeState;
use crate::domain::entities::transaction::{NewTransaction, TransactionRecord};
use crate::domain::errors::StoreError;
use crate::domain::repositories::trade_store::{StoreResult, TradeStore};

/// Transaction log; the id counter lives under the same lock as the entries
/// so assignment and insertion are one step.
#[derive(Debug)]
struct TransactionLog {
    last_id: u64,
    entries: BTreeMap<u64, TransactionRecord>,
}

#[derive(Debug)]
pub struct InMemoryTradeStore {
    transactions: RwLock<TransactionLog>,
    trades: RwLock<HashMap<u64, TradeState>>,
    positions: Mutex<BTreeMap<String, PositionEntry>>,
    pending: Mutex<PendingQueue>,
}

impl Default for InMemoryTradeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTradeStore {
    pub fn new() -> Self {
        Self::starting_after(0)
    }

    /// Store whose first assigned id is `last_id + 1`
    pub fn starting_after(last_id: u64) -> Self {
        Self {
            transactions: RwLock::new(TransactionLog {
                last_id,
                entries: BTreeMap::new(),
            }),
            trades: RwLock::new(HashMap::new()),
            positions: Mutex::new(BTreeMap::new()),
            pending: Mutex::new(PendingQueue::new()),
        }
    }
}

fn poisoned(name: &'static str) -> StoreError {
    error!("Lock poisoned: {}", name);
    StoreError::LockPoisoned(name)
}

impl TradeStore for InMemoryTradeStore {
    fn append_transaction(&self, transaction: NewTransaction) -> StoreResult<TransactionRecord> {
        let mut log = self
            .transactions
            .write()
            .map_err(|_| poisoned("transactions"))?;

        let id = log
            .last_id
            .checked_add(1)
            .ok_or(StoreError::IdentifierSpaceExhausted)?;
        let record = TransactionRecord::from_new(id, transaction, Utc::now());
        log.last_id = id;
        log.entries.insert(id, record.clone());

        debug!("Appended transaction {} for trade {}", id, record.trade_id);
        Ok(record)
    }

    fn get_transaction(&self, transaction_id: u64) -> StoreResult<Option<TransactionRecord>> {
        let log = self
            .transactions
            .read()
            .map_err(|_| poisoned("transactions"))?;
        Ok(log.entries.get(&transaction_id).cloned())
    }

    fn list_transactions(&self) -> StoreResult<Vec<TransactionRecord>> {
        let log = self
            .transactions
            .read()
            .map_err(|_| poisoned("transactions"))?;
        Ok(log.entries.values().cloned().collect())
    }

    fn mark_processed(
        &self,
        transaction_id: u64,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<TransactionRecord> {
        let mut log = self
            .transactions
            .write()
            .map_err(|_| poisoned("transactions"))?;
        let record = log
            .entries
            .get_mut(&transaction_id)
            .ok_or(StoreError::TransactionNotFound(transaction_id))?;

        record.is_processed = true;
        record.processed_at = Some(processed_at);
        Ok(record.clone())
    }

    fn get_trade_state(&self, trade_id: u64) -> StoreResult<Option<TradeState>> {
        let trades = self.trades.read().map_err(|_| poisoned("trades"))?;
        Ok(trades.get(&trade_id).cloned())
    }

    fn upsert_trade_state(&self, mut state: TradeState) -> StoreResult<TradeState> {
        state.last_modified = Utc::now();
        let mut trades = self.trades.write().map_err(|_| poisoned("trades"))?;
        trades.insert(state.trade_id, state.clone());

        debug!(
            "Trade {} now at version {} ({:?})",
            state.trade_id, state.current_version, state.status
        );
        Ok(state)
    }

    fn list_trade_states(&self) -> StoreResult<Vec<TradeState>> {
        let trades = self.trades.read().map_err(|_| poisoned("trades"))?;
        let mut states: Vec<TradeState> = trades.values().cloned().collect();
        states.sort_by_key(|s| s.trade_id);
        Ok(states)
    }

    fn apply_position_delta(&self, security_code: &str, delta: i64) -> StoreResult<PositionEntry> {
        let mut positions = self.positions.lock().map_err(|_| poisoned("positions"))?;
        let now = Utc::now();

        let entry = match positions.get_mut(security_code) {
            Some(existing) => {
                let current = existing.net_quantity;
                existing.net_quantity =
                    current
                        .checked_add(delta)
                        .ok_or_else(|| StoreError::PositionOverflow {
                            security_code: security_code.to_string(),
                            current,
                            delta,
                        })?;
                existing.last_updated = now;
                existing.clone()
            }
            None => {
                let created = PositionEntry {
                    security_code: security_code.to_string(),
                    net_quantity: delta,
                    last_updated: now,
                };
                positions.insert(security_code.to_string(), created.clone());
                created
            }
        };

        Ok(entry)
    }

    fn list_positions(&self) -> StoreResult<Vec<PositionEntry>> {
        let positions = self.positions.lock().map_err(|_| poisoned("positions"))?;
        Ok(positions.values().cloned().collect())
    }

    fn enqueue_pending(&self, transaction_id: u64, reason: &str) -> StoreResult<()> {
        let mut pending = self.pending.lock().map_err(|_| poisoned("pending"))?;
        if !pending.enqueue(transaction_id, reason) {
            debug!("Transaction {} was already pending", transaction_id);
        }
        Ok(())
    }

    fn list_pending(&self) -> StoreResult<Vec<PendingEntry>> {
        let pending = self.pending.lock().map_err(|_| poisoned("pending"))?;
        Ok(pending.entries())
    }

    fn list_pending_ids(&self) -> StoreResult<Vec<u64>> {
        let pending = self.pending.lock().map_err(|_| poisoned("pending"))?;
        Ok(pending.ids())
    }

    fn remove_pending(&self, transaction_id: u64) -> StoreResult<bool> {
        let mut pending = self.pending.lock().map_err(|_| poisoned("pending"))?;
        Ok(pending.remove(transaction_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::trade::TradeStatus;
    use crate::domain::entities::transaction::{TradeSide, TransactionAction};
    use std::sync::Arc;

    fn new_tx(trade_id: u64, version: u32) -> NewTransaction {
        NewTransaction {
            trade_id,
            version,
            security_code: "AAPL".to_string(),
            quantity: 100,
            action: TransactionAction::Insert,
            side: TradeSide::Buy,
        }
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let store = InMemoryTradeStore::new();
        let first = store.append_transaction(new_tx(1, 1)).unwrap();
        let second = store.append_transaction(new_tx(2, 1)).unwrap();

        assert_eq!(first.transaction_id, 1);
        assert_eq!(second.transaction_id, 2);
        assert!(!first.is_processed);
        assert!(first.processed_at.is_none());
    }

    #[test]
    fn test_id_space_exhaustion() {
        let store = InMemoryTradeStore::starting_after(u64::MAX - 1);
        assert_eq!(store.append_transaction(new_tx(1, 1)).unwrap().transaction_id, u64::MAX);
        assert_eq!(
            store.append_transaction(new_tx(1, 1)),
            Err(StoreError::IdentifierSpaceExhausted)
        );
        assert_eq!(store.list_transactions().unwrap().len(), 1);
    }

    #[test]
    fn test_list_transactions_ordered() {
        let store = InMemoryTradeStore::new();
        for trade_id in [5, 3, 9] {
            store.append_transaction(new_tx(trade_id, 1)).unwrap();
        }
        let ids: Vec<u64> = store
            .list_transactions()
            .unwrap()
            .iter()
            .map(|t| t.transaction_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_mark_processed() {
        let store = InMemoryTradeStore::new();
        let record = store.append_transaction(new_tx(1, 1)).unwrap();
        let at = Utc::now();

        let updated = store.mark_processed(record.transaction_id, at).unwrap();
        assert!(updated.is_processed);
        assert_eq!(updated.processed_at, Some(at));
        assert_eq!(store.get_transaction(1).unwrap(), Some(updated));

        assert_eq!(
            store.mark_processed(99, at),
            Err(StoreError::TransactionNotFound(99))
        );
    }

    #[test]
    fn test_trade_state_is_copy_on_read() {
        let store = InMemoryTradeStore::new();
        let record = store.append_transaction(new_tx(1, 1)).unwrap();
        store.upsert_trade_state(TradeState::opened_by(&record)).unwrap();

        let mut copy = store.get_trade_state(1).unwrap().unwrap();
        copy.quantity = 5;
        copy.status = TradeStatus::Cancelled;

        let stored = store.get_trade_state(1).unwrap().unwrap();
        assert_eq!(stored.quantity, 100);
        assert_eq!(stored.status, TradeStatus::Active);
        assert!(store.get_trade_state(2).unwrap().is_none());
    }

    #[test]
    fn test_position_delta_accumulates_and_keeps_zero() {
        let store = InMemoryTradeStore::new();
        assert_eq!(store.apply_position_delta("AAPL", 100).unwrap().net_quantity, 100);
        assert_eq!(store.apply_position_delta("AAPL", -100).unwrap().net_quantity, 0);
        store.apply_position_delta("AAPL", 0).unwrap();
        store.apply_position_delta("MSFT", -10).unwrap();

        let positions = store.list_positions().unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].security_code, "AAPL");
        assert_eq!(positions[0].net_quantity, 0);
        assert_eq!(positions[1].security_code, "MSFT");
    }

    #[test]
    fn test_position_overflow_leaves_entry_untouched() {
        let store = InMemoryTradeStore::new();
        store.apply_position_delta("AAPL", i64::MAX).unwrap();

        let err = store.apply_position_delta("AAPL", 1).unwrap_err();
        assert!(matches!(err, StoreError::PositionOverflow { .. }));
        assert_eq!(store.list_positions().unwrap()[0].net_quantity, i64::MAX);
    }

    #[test]
    fn test_pending_roundtrip() {
        let store = InMemoryTradeStore::new();
        store.enqueue_pending(4, "data does not exist").unwrap();
        store.enqueue_pending(2, "already cancelled").unwrap();
        store.enqueue_pending(4, "data does not exist").unwrap();

        assert_eq!(store.list_pending_ids().unwrap(), vec![2, 4]);
        assert!(store.remove_pending(2).unwrap());
        assert!(!store.remove_pending(2).unwrap());
        assert_eq!(
            store.list_pending().unwrap(),
            vec![PendingEntry {
                transaction_id: 4,
                reason: "data does not exist".to_string()
            }]
        );
    }

    #[test]
    fn test_concurrent_appends_are_gap_free() {
        let store = Arc::new(InMemoryTradeStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.append_transaction(new_tx(t * 100 + i, 1)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let ids: Vec<u64> = store
            .list_transactions()
            .unwrap()
            .iter()
            .map(|t| t.transaction_id)
            .collect();
        assert_eq!(ids, (1..=400).collect::<Vec<u64>>());
    }
}
