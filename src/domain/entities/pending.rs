use serde::{Deserialize, Serialize};

/// A persisted transaction waiting for its ordering preconditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEntry {
    pub transaction_id: u64,
    pub reason: String,
}
