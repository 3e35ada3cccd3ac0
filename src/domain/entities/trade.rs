use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transaction::{TradeSide, TransactionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Active,
    Cancelled,
}

/// Current snapshot of a trade, one per trade id.
///
/// Stores hand out owned clones, so a caller mutating a snapshot never
/// affects the stored state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeState {
    pub trade_id: u64,
    pub current_version: u32,
    pub security_code: String,
    pub quantity: u32,
    pub side: TradeSide,
    pub status: TradeStatus,
    pub last_modified: DateTime<Utc>,
}

impl TradeState {
    /// Snapshot opened by an INSERT
    pub fn opened_by(record: &TransactionRecord) -> Self {
        Self {
            trade_id: record.trade_id,
            current_version: record.version,
            security_code: record.security_code.clone(),
            quantity: record.quantity,
            side: record.side,
            status: TradeStatus::Active,
            last_modified: Utc::now(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == TradeStatus::Cancelled
    }

    /// Version the next UPDATE or CANCEL must carry. Past `u32::MAX` for a
    /// trade at the ceiling, so no record can match it.
    pub fn next_version(&self) -> u64 {
        u64::from(self.current_version) + 1
    }

    /// Overwrite economics with an UPDATE; status is left untouched
    pub fn amend(&mut self, record: &TransactionRecord) {
        self.current_version = record.version;
        self.security_code = record.security_code.clone();
        self.quantity = record.quantity;
        self.side = record.side;
    }

    /// Mark cancelled at the cancel record's version, keeping economics for audit
    pub fn cancel(&mut self, record: &TransactionRecord) {
        self.status = TradeStatus::Cancelled;
        self.current_version = record.version;
    }
}
