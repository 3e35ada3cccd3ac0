use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Net position for one security.
///
/// Created on the first delta and never removed, even when it nets to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionEntry {
    pub security_code: String,
    pub net_quantity: i64,
    pub last_updated: DateTime<Utc>,
}

/// Position as reported to callers, with the quantity rendered as a signed string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub security_code: String,
    pub net_quantity: String,
    pub last_updated: DateTime<Utc>,
}

pub fn format_signed_quantity(quantity: i64) -> String {
    if quantity > 0 {
        format!("+{}", quantity)
    } else {
        quantity.to_string()
    }
}

impl From<&PositionEntry> for PositionView {
    fn from(entry: &PositionEntry) -> Self {
        Self {
            security_code: entry.security_code.clone(),
            net_quantity: format_signed_quantity(entry.net_quantity),
            last_updated: entry.last_updated,
        }
    }
}
