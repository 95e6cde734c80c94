//! Inventory item and location models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::BusinessCategory;

/// A sellable or stockable item held at an inventory location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sku: String,
    pub name: String,
    pub category: BusinessCategory,
    /// Actual on-hand quantity
    pub current_stock: Decimal,
    /// Quantity committed to open sales orders
    pub reserved_quantity: Decimal,
    /// Reorder threshold
    pub minimum_stock: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub status: ItemStatus,
    pub location_id: Option<Uuid>,
    pub unit_cost: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Stock free to commit to new orders
    pub fn available_stock(&self) -> Decimal {
        self.current_stock - self.reserved_quantity
    }

    /// Reservations exceed what is on hand (stock was adjusted down after reserving)
    pub fn is_over_reserved(&self) -> bool {
        self.reserved_quantity > self.current_stock
    }

    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_stock
    }

    /// Days from `today` to the expiry date, negative once expired
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|d| (d - today).num_days())
    }

    pub fn can_delete(&self) -> bool {
        self.reserved_quantity <= Decimal::ZERO
    }
}

/// Lifecycle status of an inventory item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Active,
    Expired,
    Damaged,
    Discontinued,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Expired => "expired",
            ItemStatus::Damaged => "damaged",
            ItemStatus::Discontinued => "discontinued",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ItemStatus::Active),
            "expired" => Some(ItemStatus::Expired),
            "damaged" => Some(ItemStatus::Damaged),
            "discontinued" => Some(ItemStatus::Discontinued),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place items are stored (shelf, cold room, warehouse)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryLocation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// `None` means unlimited
    pub capacity: Option<Decimal>,
    /// Units currently stored
    pub current_usage: Decimal,
}

impl InventoryLocation {
    /// Spare room, `None` when unlimited
    pub fn spare_capacity(&self) -> Option<Decimal> {
        self.capacity
            .map(|cap| (cap - self.current_usage).max(Decimal::ZERO))
    }

    pub fn can_accept(&self, quantity: Decimal) -> bool {
        match self.spare_capacity() {
            Some(spare) => quantity <= spare,
            None => true,
        }
    }
}
