//! PositionLedger - signed per-security netting on top of the trade store

use std::sync::Arc;
use tracing::info;

use crate::domain::entities::position::{PositionEntry, PositionView};
use crate::domain::entities::transaction::TradeSide;
use crate::domain::repositories::trade_store::{StoreResult, TradeStore};

/// Signed contribution of a trade leg: `+quantity` for BUY, `-quantity` for SELL
pub fn position_delta(side: TradeSide, quantity: u32) -> i64 {
    side.sign() * i64::from(quantity)
}

/// Applies deltas to net positions. Holds no state of its own.
#[derive(Clone)]
pub struct PositionLedger {
    store: Arc<dyn TradeStore>,
}

impl PositionLedger {
    pub fn new(store: Arc<dyn TradeStore>) -> Self {
        Self { store }
    }

    /// Book the contribution of `quantity` on `side`
    pub fn book(
        &self,
        security_code: &str,
        side: TradeSide,
        quantity: u32,
    ) -> StoreResult<PositionEntry> {
        self.apply(security_code, position_delta(side, quantity))
    }

    /// Exact inverse of `book` with the same arguments
    pub fn reverse(
        &self,
        security_code: &str,
        side: TradeSide,
        quantity: u32,
    ) -> StoreResult<PositionEntry> {
        self.apply(security_code, -position_delta(side, quantity))
    }

    fn apply(&self, security_code: &str, delta: i64) -> StoreResult<PositionEntry> {
        let entry = self.store.apply_position_delta(security_code, delta)?;
        info!(
            "Position updated: {} by {} (net {})",
            security_code, delta, entry.net_quantity
        );
        Ok(entry)
    }

    /// Positions ordered by security code, rendered for callers
    pub fn positions(&self) -> StoreResult<Vec<PositionView>> {
        let mut entries = self.store.list_positions()?;
        entries.sort_by(|a, b| a.security_code.cmp(&b.security_code));
        Ok(entries.iter().map(PositionView::from).collect())
    }
}
