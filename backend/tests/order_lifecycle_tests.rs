//! Sales order lifecycle tests
//!
//! Covers:
//! - Status table stock effects
//! - Confirm then cancel restores reserved quantities
//! - Completion deducts exactly the ordered quantities
//! - Line edits while reservation-holding
//! - All-or-nothing application across lines

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{BusinessCategory, InventoryItem, ItemStatus, SalesOrder, SalesOrderItem, SalesOrderStatus};
use std::str::FromStr;
use uuid::Uuid;
use workshop_erp::lifecycle::{self, StockBook, StockEffect};
use workshop_erp::AppError;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn item(sku: &str, stock: &str) -> InventoryItem {
    InventoryItem {
        id: Uuid::new_v4(),
        tenant_id: Uuid::nil(),
        sku: sku.to_string(),
        name: sku.to_string(),
        category: BusinessCategory::Craft,
        current_stock: dec(stock),
        reserved_quantity: Decimal::ZERO,
        minimum_stock: Decimal::ZERO,
        expiry_date: None,
        status: ItemStatus::Active,
        location_id: None,
        unit_cost: dec("120.00"),
        updated_at: Utc::now(),
    }
}

fn order(status: SalesOrderStatus) -> SalesOrder {
    SalesOrder {
        id: Uuid::new_v4(),
        tenant_id: Uuid::nil(),
        order_number: "SO-0001".to_string(),
        status,
        deleted_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn line(order: &SalesOrder, item: &InventoryItem, qty: &str) -> SalesOrderItem {
    SalesOrderItem {
        id: Uuid::new_v4(),
        sales_order_id: order.id,
        inventory_item_id: item.id,
        quantity: dec(qty),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;
    use SalesOrderStatus::*;

    /// Confirmed order with one line of 4: raise to 6, then cancel
    #[test]
    fn test_edit_then_cancel_releases_everything() {
        let basket = item("BASKET-S", "20");
        let id = basket.id;
        let mut so = order(Draft);
        let mut lines = vec![line(&so, &basket, "4")];
        let mut book = StockBook::new([basket]);

        lifecycle::change_status(&mut so, Confirmed, &lines, &mut book, Utc::now()).unwrap();
        assert_eq!(book.get(id).unwrap().reserved_quantity, dec("4"));

        let t = lifecycle::change_item_quantity(&so, &mut lines[0], dec("6"), &mut book).unwrap();
        assert_eq!(t.effect, StockEffect::Reserve);
        assert_eq!(book.get(id).unwrap().reserved_quantity, dec("6"));

        lifecycle::change_status(&mut so, Cancelled, &lines, &mut book, Utc::now()).unwrap();
        assert_eq!(book.get(id).unwrap().reserved_quantity, Decimal::ZERO);
        assert_eq!(book.get(id).unwrap().current_stock, dec("20"));
        assert_eq!(so.status, Cancelled);
    }

    #[test]
    fn test_completion_from_processing_deducts_stock_and_reservation() {
        let mug = item("MUG-BLUE", "10");
        let id = mug.id;
        let mut so = order(Draft);
        let lines = vec![line(&so, &mug, "3")];
        let mut book = StockBook::new([mug]);

        lifecycle::change_status(&mut so, Processing, &lines, &mut book, Utc::now()).unwrap();
        let t = lifecycle::change_status(&mut so, Completed, &lines, &mut book, Utc::now()).unwrap();

        assert_eq!(t.effect, StockEffect::Deduct);
        let it = book.get(id).unwrap();
        assert_eq!(it.current_stock, dec("7"));
        assert_eq!(it.reserved_quantity, Decimal::ZERO);
    }

    #[test]
    fn test_draft_to_completed_reserves_and_deducts() {
        let mug = item("MUG-RED", "5");
        let id = mug.id;
        let mut so = order(Draft);
        let lines = vec![line(&so, &mug, "2")];
        let mut book = StockBook::new([mug]);

        let t = lifecycle::change_status(&mut so, Completed, &lines, &mut book, Utc::now()).unwrap();

        assert_eq!(t.effect, StockEffect::ReserveAndDeduct);
        assert_eq!(book.get(id).unwrap().current_stock, dec("3"));
        assert_eq!(book.get(id).unwrap().reserved_quantity, Decimal::ZERO);
    }

    #[test]
    fn test_failed_line_rolls_back_earlier_lines() {
        let plenty = item("BAG-L", "50");
        let scarce = item("BAG-S", "1");
        let (plenty_id, scarce_id) = (plenty.id, scarce.id);
        let mut so = order(Draft);
        let lines = vec![line(&so, &plenty, "5"), line(&so, &scarce, "2")];
        let mut book = StockBook::new([plenty, scarce]);

        let err = lifecycle::change_status(&mut so, Confirmed, &lines, &mut book, Utc::now()).unwrap_err();

        assert!(matches!(err, AppError::InsufficientStock { ref sku, .. } if sku == "BAG-S"));
        assert_eq!(book.get(plenty_id).unwrap().reserved_quantity, Decimal::ZERO);
        assert_eq!(book.get(scarce_id).unwrap().reserved_quantity, Decimal::ZERO);
        assert_eq!(book.touched().count(), 0);
        assert_eq!(so.status, Draft);
    }

    #[test]
    fn test_terminal_orders_reject_moves_and_edits() {
        let bowl = item("BOWL", "5");
        let mut so = order(Cancelled);
        let mut l = line(&so, &bowl, "1");
        let mut book = StockBook::new([bowl]);

        let err = lifecycle::change_status(&mut so, Confirmed, &[l.clone()], &mut book, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert!(lifecycle::change_item_quantity(&so, &mut l, dec("2"), &mut book).is_err());
        assert!(lifecycle::remove_item(&so, &l, &mut book).is_err());
    }

    #[test]
    fn test_same_status_is_a_no_op() {
        let bowl = item("BOWL", "5");
        let id = bowl.id;
        let mut so = order(Confirmed);
        let lines = vec![line(&so, &bowl, "1")];
        let mut book = StockBook::new([bowl]);

        let t = lifecycle::change_status(&mut so, Confirmed, &lines, &mut book, Utc::now()).unwrap();
        assert_eq!(t.effect, StockEffect::None);
        assert!(t.entries.is_empty());
        assert_eq!(book.get(id).unwrap().reserved_quantity, Decimal::ZERO);
    }

    #[test]
    fn test_soft_delete_restore_and_hard_delete() {
        let scarf = item("SCARF", "10");
        let id = scarf.id;
        let mut so = order(Draft);
        let lines = vec![line(&so, &scarf, "4")];
        let mut book = StockBook::new([scarf]);

        lifecycle::change_status(&mut so, Confirmed, &lines, &mut book, Utc::now()).unwrap();

        lifecycle::soft_delete(&mut so, &lines, &mut book, Utc::now()).unwrap();
        assert!(so.is_deleted());
        assert_eq!(book.get(id).unwrap().reserved_quantity, Decimal::ZERO);

        // Deleted orders cannot change status
        let err = lifecycle::change_status(&mut so, Completed, &lines, &mut book, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        lifecycle::restore(&mut so, &lines, &mut book, Utc::now()).unwrap();
        assert!(!so.is_deleted());
        assert_eq!(book.get(id).unwrap().reserved_quantity, dec("4"));

        let t = lifecycle::hard_delete(&so, &lines, &mut book).unwrap();
        assert_eq!(t.effect, StockEffect::Release);
        assert_eq!(book.get(id).unwrap().reserved_quantity, Decimal::ZERO);
    }

    #[test]
    fn test_hard_delete_of_soft_deleted_order_releases_nothing() {
        let scarf = item("SCARF", "10");
        let mut so = order(Draft);
        let lines = vec![line(&so, &scarf, "4")];
        let mut book = StockBook::new([scarf]);

        lifecycle::change_status(&mut so, Confirmed, &lines, &mut book, Utc::now()).unwrap();
        lifecycle::soft_delete(&mut so, &lines, &mut book, Utc::now()).unwrap();
        let t = lifecycle::hard_delete(&so, &lines, &mut book).unwrap();

        assert_eq!(t.effect, StockEffect::None);
    }

    #[test]
    fn test_line_edits_on_draft_have_no_stock_effect() {
        let scarf = item("SCARF", "10");
        let id = scarf.id;
        let so = order(Draft);
        let mut l = line(&so, &scarf, "4");
        let mut book = StockBook::new([scarf]);

        assert_eq!(lifecycle::add_item(&so, &l, &mut book).unwrap().effect, StockEffect::None);
        lifecycle::change_item_quantity(&so, &mut l, dec("9"), &mut book).unwrap();
        assert_eq!(l.quantity, dec("9"));
        assert_eq!(book.get(id).unwrap().reserved_quantity, Decimal::ZERO);
    }

    #[test]
    fn test_adding_and_removing_lines_on_confirmed_order() {
        let scarf = item("SCARF", "10");
        let id = scarf.id;
        let so = order(Confirmed);
        let l = line(&so, &scarf, "3");
        let mut book = StockBook::new([scarf]);

        lifecycle::add_item(&so, &l, &mut book).unwrap();
        assert_eq!(book.get(id).unwrap().reserved_quantity, dec("3"));

        lifecycle::remove_item(&so, &l, &mut book).unwrap();
        assert_eq!(book.get(id).unwrap().reserved_quantity, Decimal::ZERO);
    }

    /// Processing order line lowered from 6 to 2 releases 4
    #[test]
    fn test_lowering_line_quantity_releases_difference() {
        let vase = item("VASE", "10");
        let id = vase.id;
        let mut so = order(Draft);
        let mut lines = vec![line(&so, &vase, "6")];
        let mut book = StockBook::new([vase]);

        lifecycle::change_status(&mut so, Processing, &lines, &mut book, Utc::now()).unwrap();
        assert_eq!(book.get(id).unwrap().reserved_quantity, dec("6"));

        let t = lifecycle::change_item_quantity(&so, &mut lines[0], dec("2"), &mut book).unwrap();

        assert_eq!(t.effect, StockEffect::Release);
        assert_eq!(t.entries.len(), 1);
        assert_eq!(t.entries[0].amount, dec("4"));
        assert_eq!(lines[0].quantity, dec("2"));
        let it = book.get(id).unwrap();
        assert_eq!(it.reserved_quantity, dec("2"));
        assert_eq!(it.current_stock, dec("10"));
        assert_eq!(it.available_stock(), dec("8"));
    }

    /// Restore fails whole when stock was committed elsewhere meanwhile
    #[test]
    fn test_restore_without_stock_leaves_order_deleted() {
        let plenty = item("TRAY-L", "20");
        let scarce = item("TRAY-S", "5");
        let (plenty_id, scarce_id) = (plenty.id, scarce.id);
        let mut so = order(Draft);
        let lines = vec![line(&so, &plenty, "3"), line(&so, &scarce, "4")];
        let mut book = StockBook::new([plenty, scarce]);

        lifecycle::change_status(&mut so, Confirmed, &lines, &mut book, Utc::now()).unwrap();
        lifecycle::soft_delete(&mut so, &lines, &mut book, Utc::now()).unwrap();

        // Another order takes most of the scarce item
        let mut other = order(Draft);
        other.order_number = "SO-0002".to_string();
        let other_lines = vec![SalesOrderItem {
            id: Uuid::new_v4(),
            sales_order_id: other.id,
            inventory_item_id: scarce_id,
            quantity: dec("3"),
        }];
        lifecycle::change_status(&mut other, Confirmed, &other_lines, &mut book, Utc::now()).unwrap();

        let deleted_at = so.deleted_at;
        let snapshot = book.clone().into_items();
        let err = lifecycle::restore(&mut so, &lines, &mut book, Utc::now()).unwrap_err();

        assert!(matches!(err, AppError::InsufficientStock { ref sku, .. } if sku == "TRAY-S"));
        assert!(so.is_deleted());
        assert_eq!(so.deleted_at, deleted_at);
        for it in snapshot {
            assert_eq!(book.get(it.id).unwrap(), &it);
        }
        assert_eq!(book.get(plenty_id).unwrap().reserved_quantity, Decimal::ZERO);
        assert_eq!(book.get(scarce_id).unwrap().reserved_quantity, dec("3"));
    }

    #[test]
    fn test_zero_quantity_line_is_rejected() {
        let scarf = item("SCARF", "10");
        let so = order(Confirmed);
        let l = line(&so, &scarf, "0");
        let mut book = StockBook::new([scarf]);

        let err = lifecycle::add_item(&so, &l, &mut book).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating valid quantities (positive decimals)
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=1000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 100.0
    }

    fn holding_status() -> impl Strategy<Value = SalesOrderStatus> {
        prop_oneof![Just(SalesOrderStatus::Confirmed), Just(SalesOrderStatus::Processing)]
    }

    /// One inventory item per line, with stock at or above the line quantity
    fn setup(quantities: &[Decimal], headroom: Decimal) -> (SalesOrder, Vec<SalesOrderItem>, StockBook) {
        let so = order(SalesOrderStatus::Draft);
        let mut items = Vec::new();
        let mut lines = Vec::new();
        for (idx, qty) in quantities.iter().enumerate() {
            let mut it = item(&format!("SKU-{idx}"), "0");
            it.current_stock = *qty + headroom;
            lines.push(SalesOrderItem {
                id: Uuid::new_v4(),
                sales_order_id: so.id,
                inventory_item_id: it.id,
                quantity: *qty,
            });
            items.push(it);
        }
        (so, lines, StockBook::new(items))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// draft -> confirmed/processing -> cancelled leaves every item as it was
        #[test]
        fn prop_confirm_cancel_round_trip(
            quantities in prop::collection::vec(quantity_strategy(), 1..8),
            headroom in quantity_strategy(),
            status in holding_status()
        ) {
            let (mut so, lines, mut book) = setup(&quantities, headroom);
            let original = book.clone().into_items();

            lifecycle::change_status(&mut so, status, &lines, &mut book, Utc::now()).unwrap();
            lifecycle::change_status(&mut so, SalesOrderStatus::Cancelled, &lines, &mut book, Utc::now()).unwrap();

            for it in original {
                let now = book.get(it.id).unwrap();
                prop_assert_eq!(now.current_stock, it.current_stock);
                prop_assert_eq!(now.reserved_quantity, it.reserved_quantity);
            }
        }

        /// Completing reduces stock by exactly each line's quantity and
        /// reserved by exactly what confirmation added
        #[test]
        fn prop_completion_deducts_exact_sums(
            quantities in prop::collection::vec(quantity_strategy(), 1..8),
            headroom in quantity_strategy(),
            status in holding_status()
        ) {
            let (mut so, lines, mut book) = setup(&quantities, headroom);
            let original = book.clone().into_items();

            lifecycle::change_status(&mut so, status, &lines, &mut book, Utc::now()).unwrap();
            lifecycle::change_status(&mut so, SalesOrderStatus::Completed, &lines, &mut book, Utc::now()).unwrap();

            for it in original {
                let ordered: Decimal = lines
                    .iter()
                    .filter(|l| l.inventory_item_id == it.id)
                    .map(|l| l.quantity)
                    .sum();
                let now = book.get(it.id).unwrap();
                prop_assert_eq!(now.current_stock, it.current_stock - ordered);
                prop_assert_eq!(now.reserved_quantity, Decimal::ZERO);
            }
        }
    }
}
