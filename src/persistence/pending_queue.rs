//! Pending Queue
//!
//! Ordered, uniquely keyed holding area for transactions that were persisted
//! but could not be applied yet. Keys are transaction ids, so queue order is
//! id order, which is also arrival order because ids are assigned
//! monotonically under the submission gate.

use std::collections::BTreeMap;

use crate::domain::entities::pending::PendingEntry;

#[derive(Debug, Default, Clone)]
pub struct PendingQueue {
    entries: BTreeMap<u64, String>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transaction. An id already queued keeps its position and
    /// takes the newer reason; returns whether the id was newly added.
    pub fn enqueue(&mut self, transaction_id: u64, reason: &str) -> bool {
        self.entries
            .insert(transaction_id, reason.to_string())
            .is_none()
    }

    pub fn remove(&mut self, transaction_id: u64) -> bool {
        self.entries.remove(&transaction_id).is_some()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.entries.keys().copied().collect()
    }

    pub fn entries(&self) -> Vec<PendingEntry> {
        self.entries
            .iter()
            .map(|(id, reason)| PendingEntry {
                transaction_id: *id,
                reason: reason.clone(),
            })
            .collect()
    }
}
