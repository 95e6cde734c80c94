//! Raw material models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw material kept in stock (fabric, flour, beeswax, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Material {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Unique per tenant
    pub code: String,
    pub name: String,
    /// Unit of measure (m, kg, pcs, ...)
    pub unit: String,
    pub current_stock: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Material {
    /// Stock figure as presented in reconciliation reports
    pub fn stock_quantity(&self) -> Decimal {
        self.current_stock
    }
}

/// A posted receipt of material into stock. Receipts are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialReceipt {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub material_id: Uuid,
    pub quantity: Decimal,
    pub received_at: DateTime<Utc>,
}

/// Sum of receipt quantities for one material
pub fn total_received(material_id: Uuid, receipts: &[MaterialReceipt]) -> Decimal {
    receipts
        .iter()
        .filter(|r| r.material_id == material_id)
        .map(|r| r.quantity)
        .sum()
}
