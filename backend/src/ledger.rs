//! Stock ledger primitives
//!
//! Every change to a stock counter goes through [`increase`], [`decrease`] or
//! [`set_absolute`] and yields a [`LedgerEntry`] for the audit trail. Callers
//! are expected to hold the row lock for the entity (see `store`).

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{validate_ledger_amount, InventoryItem, Material};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Counter of a stock-carrying entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockField {
    CurrentStock,
    ReservedQuantity,
}

impl StockField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockField::CurrentStock => "current_stock",
            StockField::ReservedQuantity => "reserved_quantity",
        }
    }
}

/// What a ledger entry did to the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Increment,
    Decrement,
    /// Authoritative snapshot correction, not a delta
    Overwrite,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Increment => "increment",
            MutationKind::Decrement => "decrement",
            MutationKind::Overwrite => "overwrite",
        }
    }
}

/// How [`decrease`] behaves when the amount exceeds the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortfallPolicy {
    /// Manual operator actions: fail with `InsufficientStock`
    Reject,
    /// Automated pipeline deductions: floor at zero and log a warning
    ClampToZero,
}

/// Entities whose stock counters the ledger can mutate
pub trait StockCounters {
    /// Entity type recorded in the audit trail
    const KIND: &'static str;

    fn entity_id(&self) -> Uuid;

    fn tenant_id(&self) -> Uuid;

    /// Human-facing identifier (SKU, material code)
    fn label(&self) -> &str;

    /// Mutable access to a counter, `None` if the entity does not track it
    fn counter_mut(&mut self, field: StockField) -> Option<&mut Decimal>;
}

impl StockCounters for Material {
    const KIND: &'static str = "material";

    fn entity_id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    fn label(&self) -> &str {
        &self.code
    }

    fn counter_mut(&mut self, field: StockField) -> Option<&mut Decimal> {
        match field {
            StockField::CurrentStock => Some(&mut self.current_stock),
            StockField::ReservedQuantity => None,
        }
    }
}

impl StockCounters for InventoryItem {
    const KIND: &'static str = "inventory_item";

    fn entity_id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    fn label(&self) -> &str {
        &self.sku
    }

    fn counter_mut(&mut self, field: StockField) -> Option<&mut Decimal> {
        match field {
            StockField::CurrentStock => Some(&mut self.current_stock),
            StockField::ReservedQuantity => Some(&mut self.reserved_quantity),
        }
    }
}

/// One recorded counter mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub entity_kind: &'static str,
    pub entity_id: Uuid,
    pub tenant_id: Uuid,
    pub label: String,
    pub field: StockField,
    pub kind: MutationKind,
    /// Amount requested by the caller (target value for overwrites)
    pub amount: Decimal,
    pub before: Decimal,
    pub after: Decimal,
    /// Part of a decrease that could not be applied because of clamping
    pub shortfall: Decimal,
}

impl LedgerEntry {
    pub fn delta(&self) -> Decimal {
        self.after - self.before
    }

    pub fn was_clamped(&self) -> bool {
        self.shortfall > Decimal::ZERO
    }

    pub fn is_overwrite(&self) -> bool {
        self.kind == MutationKind::Overwrite
    }
}

fn counter<E: StockCounters>(entity: &mut E, field: StockField) -> AppResult<&mut Decimal> {
    let kind = E::KIND;
    entity
        .counter_mut(field)
        .ok_or_else(|| AppError::validation(field.as_str(), format!("{} does not track {}", kind, field.as_str())))
}

fn check_amount(field: StockField, amount: Decimal) -> AppResult<()> {
    validate_ledger_amount(amount).map_err(|msg| AppError::validation(field.as_str(), msg))
}

fn entry<E: StockCounters>(
    entity: &E,
    field: StockField,
    kind: MutationKind,
    amount: Decimal,
    before: Decimal,
    after: Decimal,
    shortfall: Decimal,
) -> LedgerEntry {
    LedgerEntry {
        entity_kind: E::KIND,
        entity_id: entity.entity_id(),
        tenant_id: entity.tenant_id(),
        label: entity.label().to_string(),
        field,
        kind,
        amount,
        before,
        after,
        shortfall,
    }
}

/// Add `amount` to a counter
pub fn increase<E: StockCounters>(
    entity: &mut E,
    field: StockField,
    amount: Decimal,
) -> AppResult<LedgerEntry> {
    check_amount(field, amount)?;
    let value = counter(entity, field)?;
    let before = *value;
    *value += amount;
    let after = *value;
    Ok(entry(entity, field, MutationKind::Increment, amount, before, after, Decimal::ZERO))
}

/// Subtract `amount` from a counter, rejecting or clamping on shortfall
pub fn decrease<E: StockCounters>(
    entity: &mut E,
    field: StockField,
    amount: Decimal,
    policy: ShortfallPolicy,
) -> AppResult<LedgerEntry> {
    check_amount(field, amount)?;
    let before = *counter(entity, field)?;

    let (after, shortfall) = if amount <= before {
        (before - amount, Decimal::ZERO)
    } else {
        match policy {
            ShortfallPolicy::Reject => {
                return Err(AppError::InsufficientStock {
                    sku: entity.label().to_string(),
                    requested: amount,
                    available: before.max(Decimal::ZERO),
                });
            }
            ShortfallPolicy::ClampToZero => (Decimal::ZERO, amount - before.max(Decimal::ZERO)),
        }
    };
    *counter(entity, field)? = after;

    if shortfall > Decimal::ZERO {
        tracing::warn!(
            entity = E::KIND,
            label = entity.label(),
            field = field.as_str(),
            %before,
            %amount,
            %shortfall,
            "Stock deduction clamped to zero"
        );
    }

    Ok(entry(entity, field, MutationKind::Decrement, amount, before, after, shortfall))
}

/// Overwrite a counter with an authoritative value
pub fn set_absolute<E: StockCounters>(
    entity: &mut E,
    field: StockField,
    value: Decimal,
) -> AppResult<LedgerEntry> {
    check_amount(field, value)?;
    let slot = counter(entity, field)?;
    let before = *slot;
    *slot = value;
    tracing::info!(
        entity = E::KIND,
        label = entity.label(),
        field = field.as_str(),
        %before,
        after = %value,
        "Stock counter overwritten"
    );
    Ok(entry(entity, field, MutationKind::Overwrite, value, before, value, Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn material(stock: i64) -> Material {
        Material {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            code: "FAB-001".to_string(),
            name: "Cotton twill".to_string(),
            unit: "m".to_string(),
            current_stock: Decimal::from(stock),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_increase_records_entry() {
        let mut m = material(10);
        let e = increase(&mut m, StockField::CurrentStock, Decimal::from(5)).unwrap();
        assert_eq!(m.current_stock, Decimal::from(15));
        assert_eq!(e.kind, MutationKind::Increment);
        assert_eq!(e.delta(), Decimal::from(5));
        assert_eq!(e.entity_kind, "material");
    }

    #[test]
    fn test_decrease_reject_leaves_state() {
        let mut m = material(3);
        let err = decrease(&mut m, StockField::CurrentStock, Decimal::from(4), ShortfallPolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { .. }));
        assert_eq!(m.current_stock, Decimal::from(3));
    }

    #[test]
    fn test_decrease_clamp_floors_at_zero() {
        let mut m = material(3);
        let e = decrease(&mut m, StockField::CurrentStock, Decimal::from(4), ShortfallPolicy::ClampToZero)
            .unwrap();
        assert_eq!(m.current_stock, Decimal::ZERO);
        assert_eq!(e.shortfall, Decimal::from(1));
        assert!(e.was_clamped());
    }

    #[test]
    fn test_material_has_no_reserved_counter() {
        let mut m = material(3);
        let err = increase(&mut m, StockField::ReservedQuantity, Decimal::ONE).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let mut m = material(3);
        assert!(increase(&mut m, StockField::CurrentStock, Decimal::from(-1)).is_err());
        assert!(set_absolute(&mut m, StockField::CurrentStock, Decimal::from(-1)).is_err());
        assert_eq!(m.current_stock, Decimal::from(3));
    }

    #[test]
    fn test_set_absolute_is_overwrite() {
        let mut m = material(100);
        let e = set_absolute(&mut m, StockField::CurrentStock, Decimal::from(20)).unwrap();
        assert!(e.is_overwrite());
        assert_eq!(e.before, Decimal::from(100));
        assert_eq!(m.current_stock, Decimal::from(20));
    }
}
