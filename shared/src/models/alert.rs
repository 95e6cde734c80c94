//! Stock alert events

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Condition that raised an alert
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    ExpiringSoon,
    Expired,
    OverReserved,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::LowStock => "low_stock",
            AlertKind::ExpiringSoon => "expiring_soon",
            AlertKind::Expired => "expired",
            AlertKind::OverReserved => "over_reserved",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// An alert emitted after an inventory item was persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub tenant_id: Uuid,
    pub entity_id: Uuid,
    pub sku: String,
    pub payload: serde_json::Value,
}
