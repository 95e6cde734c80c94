//! Validation utilities for stock records
//!
//! Returns static messages the services wrap into field-level validation errors.

use rust_decimal::Decimal;

use crate::models::{InventoryLocation, SalesOrderItem};

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate a quantity moved by an order line, receipt or adjustment
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a stock amount handed to a ledger primitive (zero is allowed)
pub fn validate_ledger_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Stock amount cannot be negative");
    }
    Ok(())
}

/// Validate that a move of `quantity` fits into `destination`
pub fn validate_move_capacity(
    destination: &InventoryLocation,
    quantity: Decimal,
) -> Result<(), &'static str> {
    if !destination.can_accept(quantity) {
        return Err("Destination location does not have enough capacity");
    }
    Ok(())
}

/// Validate every line of a sales order
pub fn validate_order_items(items: &[SalesOrderItem]) -> Result<(), &'static str> {
    if items.iter().any(|i| i.quantity <= Decimal::ZERO) {
        return Err("Order item quantities must be positive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ========================================================================
    // Quantity Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_positive_quantity() {
        assert!(validate_positive_quantity(dec("0.5")).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(dec("-1")).is_err());
    }

    #[test]
    fn test_validate_ledger_amount_allows_zero() {
        assert!(validate_ledger_amount(Decimal::ZERO).is_ok());
        assert!(validate_ledger_amount(dec("12.25")).is_ok());
        assert!(validate_ledger_amount(dec("-0.01")).is_err());
    }

    #[test]
    fn test_validate_move_capacity() {
        let location = InventoryLocation {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Cold room".to_string(),
            capacity: Some(dec("50")),
            current_usage: dec("45"),
        };
        assert!(validate_move_capacity(&location, dec("5")).is_ok());
        assert!(validate_move_capacity(&location, dec("6")).is_err());

        let unlimited = InventoryLocation {
            capacity: None,
            ..location
        };
        assert!(validate_move_capacity(&unlimited, dec("1000000")).is_ok());
    }

    #[test]
    fn test_validate_order_items() {
        let line = |q: &str| SalesOrderItem {
            id: Uuid::new_v4(),
            sales_order_id: Uuid::new_v4(),
            inventory_item_id: Uuid::new_v4(),
            quantity: dec(q),
        };
        assert!(validate_order_items(&[line("1"), line("2.5")]).is_ok());
        assert!(validate_order_items(&[line("1"), line("0")]).is_err());
        assert!(validate_order_items(&[]).is_ok());
    }
}
