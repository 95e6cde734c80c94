//! Sales order models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer sales order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesOrder {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub order_number: String,
    pub status: SalesOrderStatus,
    /// Soft-delete marker
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SalesOrder {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether this order's items currently hold reservations
    pub fn holds_reservations(&self) -> bool {
        !self.is_deleted() && self.status.holds_reservations()
    }
}

/// Status of a sales order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SalesOrderStatus {
    Draft,
    Confirmed,
    Processing,
    Completed,
    Cancelled,
}

impl SalesOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderStatus::Draft => "draft",
            SalesOrderStatus::Confirmed => "confirmed",
            SalesOrderStatus::Processing => "processing",
            SalesOrderStatus::Completed => "completed",
            SalesOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(SalesOrderStatus::Draft),
            "confirmed" => Some(SalesOrderStatus::Confirmed),
            "processing" => Some(SalesOrderStatus::Processing),
            "completed" => Some(SalesOrderStatus::Completed),
            "cancelled" => Some(SalesOrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Confirmed and processing orders hold stock reservations
    pub fn holds_reservations(&self) -> bool {
        matches!(self, SalesOrderStatus::Confirmed | SalesOrderStatus::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SalesOrderStatus::Completed | SalesOrderStatus::Cancelled)
    }
}

impl std::fmt::Display for SalesOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a sales order, linked to a single inventory item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesOrderItem {
    pub id: Uuid,
    pub sales_order_id: Uuid,
    pub inventory_item_id: Uuid,
    pub quantity: Decimal,
}
