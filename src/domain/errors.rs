use thiserror::Error;

/// Input errors raised while translating a submission into a transaction record.
///
/// These are detected before anything is persisted, so no transaction id is
/// ever allocated for a submission that fails here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid action: {0} (expected INSERT, UPDATE or CANCEL)")]
    InvalidAction(String),

    #[error("Invalid side: {0} (expected BUY or SELL)")]
    InvalidSide(String),

    #[error("Invalid trade id: {0} (must be positive)")]
    InvalidTradeId(i64),

    #[error("Invalid version: {0} (must be positive)")]
    InvalidVersion(i64),

    #[error("Invalid quantity: {0} (must be positive)")]
    InvalidQuantity(i64),

    #[error("Security code must not be empty")]
    EmptySecurityCode,
}

/// Failures raised by the trade store itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Transaction identifier space exhausted")]
    IdentifierSpaceExhausted,

    #[error("Transaction not found: {0}")]
    TransactionNotFound(u64),

    #[error("Position overflow for {security_code}: {current} + {delta}")]
    PositionOverflow {
        security_code: String,
        current: i64,
        delta: i64,
    },

    #[error("Failed to acquire lock on {0}")]
    LockPoisoned(&'static str),
}

/// Unexpected failures while applying a transaction that already passed validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Trade {trade_id} disappeared between validation and apply")]
    TradeVanished { trade_id: u64 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Request body limit must be non-zero")]
    ZeroBodyLimit,
}
