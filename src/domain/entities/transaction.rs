use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::errors::ValidationError;

/// Kind of mutation a transaction applies to a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionAction {
    Insert,
    Update,
    Cancel,
}

impl FromStr for TransactionAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Ok(TransactionAction::Insert),
            "UPDATE" => Ok(TransactionAction::Update),
            "CANCEL" => Ok(TransactionAction::Cancel),
            _ => Err(ValidationError::InvalidAction(s.to_string())),
        }
    }
}

impl std::fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionAction::Insert => write!(f, "INSERT"),
            TransactionAction::Update => write!(f, "UPDATE"),
            TransactionAction::Cancel => write!(f, "CANCEL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn sign(&self) -> i64 {
        match self {
            TradeSide::Buy => 1,
            TradeSide::Sell => -1,
        }
    }
}

impl FromStr for TradeSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(TradeSide::Buy),
            "SELL" => Ok(TradeSide::Sell),
            _ => Err(ValidationError::InvalidSide(s.to_string())),
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Raw submission as received from a caller.
///
/// Numeric fields are signed so that out-of-range values can be reported
/// back verbatim instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub trade_id: i64,
    pub version: i64,
    pub action: String,
    pub security_code: String,
    pub quantity: i64,
    pub side: String,
}

impl TransactionInput {
    pub fn new(
        trade_id: i64,
        version: i64,
        action: &str,
        security_code: &str,
        quantity: i64,
        side: &str,
    ) -> Self {
        Self {
            trade_id,
            version,
            action: action.to_string(),
            security_code: security_code.to_string(),
            quantity,
            side: side.to_string(),
        }
    }

    /// Translate into a transaction ready to be appended to the log
    pub fn into_transaction(self) -> Result<NewTransaction, ValidationError> {
        let action = self.action.parse::<TransactionAction>()?;
        let side = self.side.parse::<TradeSide>()?;

        let trade_id = u64::try_from(self.trade_id)
            .ok()
            .filter(|id| *id > 0)
            .ok_or(ValidationError::InvalidTradeId(self.trade_id))?;
        let version = u32::try_from(self.version)
            .ok()
            .filter(|v| *v > 0)
            .ok_or(ValidationError::InvalidVersion(self.version))?;
        let quantity = u32::try_from(self.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(ValidationError::InvalidQuantity(self.quantity))?;

        let security_code = self.security_code.trim();
        if security_code.is_empty() {
            return Err(ValidationError::EmptySecurityCode);
        }

        Ok(NewTransaction {
            trade_id,
            version,
            security_code: security_code.to_string(),
            quantity,
            action,
            side,
        })
    }
}

/// A validated transaction that has not been assigned an identifier yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub trade_id: u64,
    pub version: u32,
    pub security_code: String,
    pub quantity: u32,
    pub action: TransactionAction,
    pub side: TradeSide,
}

/// Log entry for one attempted mutation of a trade.
///
/// Immutable once appended, except for the processed stamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub transaction_id: u64,
    pub trade_id: u64,
    pub version: u32,
    pub security_code: String,
    pub quantity: u32,
    pub action: TransactionAction,
    pub side: TradeSide,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub is_processed: bool,
}

impl TransactionRecord {
    pub fn from_new(transaction_id: u64, new: NewTransaction, created_at: DateTime<Utc>) -> Self {
        Self {
            transaction_id,
            trade_id: new.trade_id,
            version: new.version,
            security_code: new.security_code,
            quantity: new.quantity,
            action: new.action,
            side: new.side,
            created_at,
            processed_at: None,
            is_processed: false,
        }
    }
}
