//! Inventory item rules outside the order lifecycle: manual adjustment,
//! moves between locations and deletion

use rust_decimal::Decimal;
use shared::{validate_move_capacity, InventoryItem, InventoryLocation};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::ledger::{self, LedgerEntry, ShortfallPolicy, StockField};

/// Manual stock adjustment by a signed delta.
///
/// Reservations are left alone, so an adjustment below the reserved quantity
/// is accepted and later reported as over-reserved.
pub fn adjust(item: &mut InventoryItem, delta: Decimal) -> AppResult<LedgerEntry> {
    if delta.is_zero() {
        return Err(AppError::validation("delta", "Adjustment must not be zero"));
    }
    if delta > Decimal::ZERO {
        ledger::increase(item, StockField::CurrentStock, delta)
    } else {
        ledger::decrease(item, StockField::CurrentStock, -delta, ShortfallPolicy::Reject)
    }
}

/// Move an item's whole stock to `to`, updating both locations' usage.
///
/// `from` is the item's current location, `None` when it has none.
pub fn move_item(
    item: &mut InventoryItem,
    from: Option<&mut InventoryLocation>,
    to: &mut InventoryLocation,
) -> AppResult<()> {
    if item.location_id == Some(to.id) {
        return Ok(());
    }
    if let Some(source) = &from {
        if item.location_id != Some(source.id) {
            return Err(AppError::Conflict(format!(
                "Item {} is not stored at {}",
                item.sku, source.name
            )));
        }
    }

    let qty = item.current_stock;
    validate_move_capacity(to, qty).map_err(|_| AppError::CapacityExceeded {
        location: to.name.clone(),
        requested: qty,
        available: to.spare_capacity().unwrap_or(qty),
    })?;

    if let Some(source) = from {
        source.current_usage = (source.current_usage - qty).max(Decimal::ZERO);
    }
    to.current_usage += qty;
    item.location_id = Some(to.id);

    tracing::info!(sku = %item.sku, to = %to.name, quantity = %qty, "Inventory item moved");
    Ok(())
}

/// On-hand stock per item, taken before an event changes it
pub fn stock_snapshot<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> HashMap<Uuid, Decimal> {
    items.into_iter().map(|i| (i.id, i.current_stock)).collect()
}

/// Net change of on-hand stock per location since `before`, in location id order.
///
/// Items without a location, or absent from `before`, contribute nothing.
pub fn location_deltas<'a>(
    before: &HashMap<Uuid, Decimal>,
    after: impl IntoIterator<Item = &'a InventoryItem>,
) -> BTreeMap<Uuid, Decimal> {
    let mut deltas = BTreeMap::new();
    for item in after {
        let (Some(location_id), Some(previous)) = (item.location_id, before.get(&item.id)) else {
            continue;
        };
        let delta = item.current_stock - *previous;
        if !delta.is_zero() {
            *deltas.entry(location_id).or_insert(Decimal::ZERO) += delta;
        }
    }
    deltas.retain(|_, d| !d.is_zero());
    deltas
}

/// Carry a change of on-hand stock over to the location holding it
pub fn apply_location_delta(location: &mut InventoryLocation, delta: Decimal) {
    location.current_usage = (location.current_usage + delta).max(Decimal::ZERO);
}

/// Items with outstanding reservations cannot be deleted
pub fn ensure_deletable(item: &InventoryItem) -> AppResult<()> {
    if !item.can_delete() {
        return Err(AppError::Conflict(format!(
            "Item {} has {} reserved for open orders",
            item.sku, item.reserved_quantity
        )));
    }
    Ok(())
}
