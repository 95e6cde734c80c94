//! Sales order lifecycle state machine
//!
//! Status changes, soft/hard deletion and line-item edits each map to one
//! stock effect applied to every affected line. Effects run against a
//! [`StockBook`] (the locked working set of inventory items) and are kept only
//! if every line succeeds; the order itself is updated after the book.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{validate_order_items, validate_positive_quantity, InventoryItem, SalesOrder, SalesOrderItem, SalesOrderStatus};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::ledger::LedgerEntry;
use crate::reservation::{self, ReservationError};

/// Inventory items locked for one order event
#[derive(Debug, Clone, Default)]
pub struct StockBook {
    items: HashMap<Uuid, InventoryItem>,
    touched: BTreeSet<Uuid>,
}

impl StockBook {
    pub fn new(items: impl IntoIterator<Item = InventoryItem>) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.id, i)).collect(),
            touched: BTreeSet::new(),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&InventoryItem> {
        self.items.get(&id)
    }

    fn get_mut(&mut self, id: Uuid) -> AppResult<&mut InventoryItem> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Inventory item {}", id)))?;
        self.touched.insert(id);
        Ok(item)
    }

    /// Items changed by successful effects, in id order
    pub fn touched(&self) -> impl Iterator<Item = &InventoryItem> {
        self.touched.iter().filter_map(|id| self.items.get(id))
    }

    pub fn into_items(self) -> Vec<InventoryItem> {
        self.items.into_values().collect()
    }

    /// Run `f` on a copy of the book and keep the copy only if it succeeds
    pub fn atomically<T>(
        &mut self,
        f: impl FnOnce(&mut StockBook) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut draft = self.clone();
        let out = f(&mut draft)?;
        *self = draft;
        Ok(out)
    }
}

/// Stock side effect of an order event, applied per line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockEffect {
    None,
    Reserve,
    Release,
    /// Remove from stock and from the reservation held for it
    Deduct,
    /// Draft orders completed directly: reserve then deduct in one step
    ReserveAndDeduct,
}

/// Outcome of one order event
#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub order_id: Uuid,
    pub effect: StockEffect,
    pub entries: Vec<LedgerEntry>,
}

/// Map a status change to its stock effect, rejecting unmodelled moves
pub fn status_effect(from: SalesOrderStatus, to: SalesOrderStatus) -> AppResult<StockEffect> {
    use SalesOrderStatus::*;

    if from == to {
        return Ok(StockEffect::None);
    }

    let effect = match (from, to) {
        (Draft, Confirmed | Processing) => StockEffect::Reserve,
        (Draft, Cancelled) => StockEffect::None,
        (Draft, Completed) => StockEffect::ReserveAndDeduct,
        (Confirmed, Processing) | (Processing, Confirmed) => StockEffect::None,
        (Confirmed | Processing, Completed) => StockEffect::Deduct,
        (Confirmed | Processing, Cancelled) => StockEffect::Release,
        _ => return Err(AppError::invalid_transition("sales order", from, to)),
    };
    Ok(effect)
}

fn release_line(item: &mut InventoryItem, qty: Decimal) -> AppResult<LedgerEntry> {
    reservation::release(item, qty).map_err(|err| match err {
        ReservationError::Shortfall(s) => AppError::Conflict(format!(
            "Reserved quantity for {} is {}, cannot release {}",
            s.sku, s.available, s.requested
        )),
        ReservationError::Rejected(e) => e,
    })
}

fn apply_line(
    book: &mut StockBook,
    effect: StockEffect,
    item_id: Uuid,
    qty: Decimal,
    entries: &mut Vec<LedgerEntry>,
) -> AppResult<()> {
    if effect == StockEffect::None {
        return Ok(());
    }
    let item = book.get_mut(item_id)?;
    match effect {
        StockEffect::None => {}
        StockEffect::Reserve => entries.push(reservation::reserve(item, qty)?),
        StockEffect::Release => entries.push(release_line(item, qty)?),
        StockEffect::Deduct => entries.extend(reservation::deduct_reserved(item, qty)?),
        StockEffect::ReserveAndDeduct => {
            entries.push(reservation::reserve(item, qty)?);
            entries.extend(reservation::deduct_reserved(item, qty)?);
        }
    }
    Ok(())
}

/// Apply `effect` to every line, all-or-nothing
pub fn apply_effect(
    book: &mut StockBook,
    effect: StockEffect,
    lines: &[SalesOrderItem],
) -> AppResult<Vec<LedgerEntry>> {
    if effect != StockEffect::None {
        validate_order_items(lines).map_err(|msg| AppError::validation("quantity", msg))?;
    }
    book.atomically(|b| {
        let mut entries = Vec::with_capacity(lines.len() * 2);
        for line in lines {
            apply_line(b, effect, line.inventory_item_id, line.quantity, &mut entries)?;
        }
        Ok(entries)
    })
}

fn ensure_not_deleted(order: &SalesOrder, action: &str) -> AppResult<()> {
    if order.is_deleted() {
        return Err(AppError::invalid_transition("sales order", "deleted", action));
    }
    Ok(())
}

/// Move an order to `to`, applying the status table's stock effect
pub fn change_status(
    order: &mut SalesOrder,
    to: SalesOrderStatus,
    lines: &[SalesOrderItem],
    book: &mut StockBook,
    now: DateTime<Utc>,
) -> AppResult<Transition> {
    ensure_not_deleted(order, to.as_str())?;
    let from = order.status;
    let effect = status_effect(from, to)?;
    let entries = apply_effect(book, effect, lines)?;

    if from != to {
        order.status = to;
        order.updated_at = now;
        tracing::info!(
            order_id = %order.id,
            %from,
            %to,
            ?effect,
            lines = lines.len(),
            "Sales order status changed"
        );
    }

    Ok(Transition {
        order_id: order.id,
        effect,
        entries,
    })
}

/// Soft-delete: release reservations held by a confirmed/processing order
pub fn soft_delete(
    order: &mut SalesOrder,
    lines: &[SalesOrderItem],
    book: &mut StockBook,
    now: DateTime<Utc>,
) -> AppResult<Transition> {
    ensure_not_deleted(order, "deleted")?;
    let effect = if order.status.holds_reservations() {
        StockEffect::Release
    } else {
        StockEffect::None
    };
    let entries = apply_effect(book, effect, lines)?;
    order.deleted_at = Some(now);
    order.updated_at = now;
    tracing::info!(order_id = %order.id, status = %order.status, ?effect, "Sales order soft-deleted");

    Ok(Transition {
        order_id: order.id,
        effect,
        entries,
    })
}

/// Restore a soft-deleted order, re-reserving if its status holds reservations
pub fn restore(
    order: &mut SalesOrder,
    lines: &[SalesOrderItem],
    book: &mut StockBook,
    now: DateTime<Utc>,
) -> AppResult<Transition> {
    if !order.is_deleted() {
        return Err(AppError::invalid_transition("sales order", order.status, "restored"));
    }
    let effect = if order.status.holds_reservations() {
        StockEffect::Reserve
    } else {
        StockEffect::None
    };
    let entries = apply_effect(book, effect, lines)?;
    order.deleted_at = None;
    order.updated_at = now;
    tracing::info!(order_id = %order.id, status = %order.status, ?effect, "Sales order restored");

    Ok(Transition {
        order_id: order.id,
        effect,
        entries,
    })
}

/// Permanently delete an order. Soft-deleted orders released already.
pub fn hard_delete(
    order: &SalesOrder,
    lines: &[SalesOrderItem],
    book: &mut StockBook,
) -> AppResult<Transition> {
    let effect = if order.holds_reservations() {
        StockEffect::Release
    } else {
        StockEffect::None
    };
    let entries = apply_effect(book, effect, lines)?;
    tracing::info!(order_id = %order.id, status = %order.status, ?effect, "Sales order deleted");

    Ok(Transition {
        order_id: order.id,
        effect,
        entries,
    })
}

fn ensure_items_editable(order: &SalesOrder) -> AppResult<()> {
    ensure_not_deleted(order, "item edit")?;
    if order.status.is_terminal() {
        return Err(AppError::invalid_transition(
            "sales order item",
            order.status,
            "edited",
        ));
    }
    Ok(())
}

fn check_quantity(qty: Decimal) -> AppResult<()> {
    validate_positive_quantity(qty).map_err(|msg| AppError::validation("quantity", msg))
}

/// A line was added to the order
pub fn add_item(
    order: &SalesOrder,
    line: &SalesOrderItem,
    book: &mut StockBook,
) -> AppResult<Transition> {
    ensure_items_editable(order)?;
    check_quantity(line.quantity)?;
    let effect = if order.holds_reservations() {
        StockEffect::Reserve
    } else {
        StockEffect::None
    };
    let entries = apply_effect(book, effect, std::slice::from_ref(line))?;

    Ok(Transition {
        order_id: order.id,
        effect,
        entries,
    })
}

/// A line's quantity changed: reserve or release the difference
pub fn change_item_quantity(
    order: &SalesOrder,
    line: &mut SalesOrderItem,
    new_quantity: Decimal,
    book: &mut StockBook,
) -> AppResult<Transition> {
    ensure_items_editable(order)?;
    check_quantity(new_quantity)?;

    let delta = new_quantity - line.quantity;
    let effect = if !order.holds_reservations() || delta.is_zero() {
        StockEffect::None
    } else if delta > Decimal::ZERO {
        StockEffect::Reserve
    } else {
        StockEffect::Release
    };

    let item_id = line.inventory_item_id;
    let entries = book.atomically(|b| {
        let mut entries = Vec::new();
        apply_line(b, effect, item_id, delta.abs(), &mut entries)?;
        Ok(entries)
    })?;
    line.quantity = new_quantity;

    Ok(Transition {
        order_id: order.id,
        effect,
        entries,
    })
}

/// A line was removed from the order
pub fn remove_item(
    order: &SalesOrder,
    line: &SalesOrderItem,
    book: &mut StockBook,
) -> AppResult<Transition> {
    ensure_items_editable(order)?;
    let effect = if order.holds_reservations() {
        StockEffect::Release
    } else {
        StockEffect::None
    };
    let entries = apply_effect(book, effect, std::slice::from_ref(line))?;

    Ok(Transition {
        order_id: order.id,
        effect,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use SalesOrderStatus::*;

    #[test]
    fn test_status_table() {
        assert_eq!(status_effect(Draft, Confirmed).unwrap(), StockEffect::Reserve);
        assert_eq!(status_effect(Draft, Processing).unwrap(), StockEffect::Reserve);
        assert_eq!(status_effect(Confirmed, Completed).unwrap(), StockEffect::Deduct);
        assert_eq!(status_effect(Processing, Cancelled).unwrap(), StockEffect::Release);
        assert_eq!(status_effect(Draft, Cancelled).unwrap(), StockEffect::None);
        assert_eq!(status_effect(Confirmed, Processing).unwrap(), StockEffect::None);
        assert_eq!(status_effect(Draft, Completed).unwrap(), StockEffect::ReserveAndDeduct);
        assert_eq!(status_effect(Completed, Completed).unwrap(), StockEffect::None);
    }

    #[test]
    fn test_terminal_and_backward_moves_rejected() {
        for (from, to) in [
            (Completed, Cancelled),
            (Cancelled, Confirmed),
            (Cancelled, Draft),
            (Completed, Draft),
            (Confirmed, Draft),
        ] {
            assert!(matches!(
                status_effect(from, to),
                Err(AppError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn test_atomically_discards_failed_changes() {
        let mut book = StockBook::default();
        let res: AppResult<()> = book.atomically(|b| {
            b.touched.insert(Uuid::new_v4());
            Err(AppError::Conflict("boom".to_string()))
        });
        assert!(res.is_err());
        assert_eq!(book.touched().count(), 0);
        assert!(book.touched.is_empty());
    }
}
