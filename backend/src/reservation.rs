//! Reservation manager
//!
//! Keeps `reserved_quantity` consistent with `current_stock` on an inventory
//! item. A shortfall is reported as [`ReservationError::Shortfall`] with the
//! item untouched; callers decide whether it is fatal. Calls are not
//! deduplicated: the order lifecycle must call each operation once per event.

use rust_decimal::Decimal;
use shared::InventoryItem;
use thiserror::Error;

use crate::error::AppError;
use crate::ledger::{self, LedgerEntry, ShortfallPolicy, StockField};

/// Requested quantity exceeds what the item can give
#[derive(Debug, Clone, PartialEq)]
pub struct Shortfall {
    pub sku: String,
    pub field: StockField,
    pub requested: Decimal,
    pub available: Decimal,
}

impl Shortfall {
    /// Treat the shortfall as fatal, reporting it under `sku`
    pub fn into_error(self, sku: impl Into<String>) -> AppError {
        AppError::InsufficientStock {
            sku: sku.into(),
            requested: self.requested,
            available: self.available,
        }
    }
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} short on {}: requested {}, available {}",
            self.sku,
            self.field.as_str(),
            self.requested,
            self.available
        )
    }
}

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("{0}")]
    Shortfall(Shortfall),

    #[error(transparent)]
    Rejected(#[from] AppError),
}

impl ReservationError {
    pub fn is_shortfall(&self) -> bool {
        matches!(self, ReservationError::Shortfall(_))
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Shortfall(s) => {
                let sku = s.sku.clone();
                s.into_error(sku)
            }
            ReservationError::Rejected(e) => e,
        }
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;

fn shortfall(item: &InventoryItem, field: StockField, requested: Decimal, available: Decimal) -> ReservationError {
    ReservationError::Shortfall(Shortfall {
        sku: item.sku.clone(),
        field,
        requested,
        available: available.max(Decimal::ZERO),
    })
}

/// Commit `qty` of the item's available stock to an order
pub fn reserve(item: &mut InventoryItem, qty: Decimal) -> ReservationResult<LedgerEntry> {
    let available = item.available_stock();
    if qty > available {
        return Err(shortfall(item, StockField::ReservedQuantity, qty, available));
    }
    Ok(ledger::increase(item, StockField::ReservedQuantity, qty)?)
}

/// Return `qty` of reserved stock to the available pool
pub fn release(item: &mut InventoryItem, qty: Decimal) -> ReservationResult<LedgerEntry> {
    let reserved = item.reserved_quantity;
    if qty > reserved {
        return Err(shortfall(item, StockField::ReservedQuantity, qty, reserved));
    }
    Ok(ledger::decrease(
        item,
        StockField::ReservedQuantity,
        qty,
        ShortfallPolicy::ClampToZero,
    )?)
}

/// Stock and reservation entries produced by [`consume`]
#[derive(Debug, Clone, PartialEq)]
pub struct Consumption {
    pub stock: LedgerEntry,
    pub reservation: LedgerEntry,
}

impl Consumption {
    /// Reservation retired by the shipment
    pub fn released(&self) -> Decimal {
        -self.reservation.delta()
    }
}

/// Ship `qty` of the item.
///
/// Retires `min(qty, reserved_quantity)` of the reservation, so shipping more
/// than was reserved never drives the reservation negative.
pub fn consume(item: &mut InventoryItem, qty: Decimal) -> ReservationResult<Consumption> {
    let on_hand = item.current_stock;
    if qty > on_hand {
        return Err(shortfall(item, StockField::CurrentStock, qty, on_hand));
    }
    let retire = qty.min(item.reserved_quantity).max(Decimal::ZERO);
    let stock = ledger::decrease(item, StockField::CurrentStock, qty, ShortfallPolicy::Reject)?;
    let reservation = ledger::decrease(
        item,
        StockField::ReservedQuantity,
        retire,
        ShortfallPolicy::ClampToZero,
    )?;
    Ok(Consumption { stock, reservation })
}

/// Completion path: remove `qty` from stock and from the reservation it was
/// held under.
///
/// Insufficient stock on hand is fatal. A reservation smaller than `qty`
/// means earlier drift; it is clamped at zero and logged by the ledger.
pub fn deduct_reserved(item: &mut InventoryItem, qty: Decimal) -> ReservationResult<[LedgerEntry; 2]> {
    let on_hand = item.current_stock;
    if qty > on_hand {
        return Err(shortfall(item, StockField::CurrentStock, qty, on_hand));
    }
    let stock = ledger::decrease(item, StockField::CurrentStock, qty, ShortfallPolicy::Reject)?;
    let reservation = ledger::decrease(
        item,
        StockField::ReservedQuantity,
        qty,
        ShortfallPolicy::ClampToZero,
    )?;
    Ok([stock, reservation])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::{BusinessCategory, ItemStatus};
    use uuid::Uuid;

    fn item(stock: i64, reserved: i64) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            sku: "TEE-M".to_string(),
            name: "T-shirt M".to_string(),
            category: BusinessCategory::Garment,
            current_stock: Decimal::from(stock),
            reserved_quantity: Decimal::from(reserved),
            minimum_stock: Decimal::from(5),
            expiry_date: None,
            status: ItemStatus::Active,
            location_id: None,
            unit_cost: Decimal::from(4),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_release_more_than_reserved_is_shortfall() {
        let mut i = item(10, 2);
        let err = release(&mut i, Decimal::from(3)).unwrap_err();
        assert!(err.is_shortfall());
        assert_eq!(i.reserved_quantity, Decimal::from(2));
    }

    #[test]
    fn test_negative_reserve_is_rejected_not_shortfall() {
        let mut i = item(10, 0);
        let err = reserve(&mut i, Decimal::from(-2)).unwrap_err();
        assert!(!err.is_shortfall());
        assert_eq!(i.reserved_quantity, Decimal::ZERO);
    }

    #[test]
    fn test_consume_more_than_reserved() {
        let mut i = item(10, 2);
        let c = consume(&mut i, Decimal::from(5)).unwrap();
        assert_eq!(i.current_stock, Decimal::from(5));
        assert_eq!(i.reserved_quantity, Decimal::ZERO);
        assert_eq!(c.released(), Decimal::from(2));
    }

    #[test]
    fn test_deduct_reserved_clamps_drifted_reservation() {
        let mut i = item(10, 1);
        let [stock, reservation] = deduct_reserved(&mut i, Decimal::from(3)).unwrap();
        assert_eq!(stock.after, Decimal::from(7));
        assert_eq!(reservation.after, Decimal::ZERO);
        assert!(reservation.was_clamped());
    }

    #[test]
    fn test_shortfall_converts_to_insufficient_stock() {
        let mut i = item(1, 0);
        let err: AppError = reserve(&mut i, Decimal::from(2)).unwrap_err().into();
        assert!(matches!(err, AppError::InsufficientStock { .. }));
    }
}
