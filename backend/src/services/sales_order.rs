//! Sales order service: runs lifecycle events inside one locked transaction

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{InventoryItem, SalesOrder, SalesOrderItem, SalesOrderStatus, TenantScope};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::inventory;
use crate::lifecycle::{self, StockBook, Transition};
use crate::services::alert::AlertService;
use crate::services::inventory::sync_location_usage;
use crate::store;

/// Sales order service for status changes and line edits
#[derive(Clone)]
pub struct SalesOrderService {
    db: PgPool,
    alerts: AlertService,
}

/// Input for adding a line to an order
#[derive(Debug, Deserialize)]
pub struct AddOrderItemInput {
    pub inventory_item_id: Uuid,
    pub quantity: Decimal,
}

/// Row-level change to the order's lines that accompanies an event
enum LineChange {
    None,
    Insert(SalesOrderItem),
    Update(SalesOrderItem),
    Delete(Uuid),
    DeleteOrder,
}

/// Result of a committed order event
#[derive(Debug, Clone)]
pub struct OrderEventOutcome {
    pub order: SalesOrder,
    pub items: Vec<SalesOrderItem>,
    pub transition: Transition,
    /// Inventory items as committed
    pub stock: Vec<InventoryItem>,
}

impl SalesOrderService {
    /// Create a new SalesOrderService instance
    pub fn new(db: PgPool, alerts: AlertService) -> Self {
        Self { db, alerts }
    }

    /// Lock the order, its lines and the inventory they reference, run
    /// `event`, persist everything it touched and commit.
    async fn run_event<F>(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        extra_item: Option<Uuid>,
        reason: &'static str,
        event: F,
    ) -> AppResult<OrderEventOutcome>
    where
        F: FnOnce(&mut SalesOrder, &mut Vec<SalesOrderItem>, &mut StockBook) -> AppResult<(Transition, LineChange)>,
    {
        let scope = TenantScope::Tenant(tenant_id);
        let mut tx = self.db.begin().await?;

        let mut order = store::lock_sales_order(&mut tx, scope, order_id).await?;
        let mut items = store::load_order_items(&mut tx, order.id).await?;

        let mut ids: Vec<Uuid> = items.iter().map(|i| i.inventory_item_id).collect();
        ids.extend(extra_item);
        let locked = store::lock_inventory_items(&mut tx, scope, &ids).await?;
        let before = inventory::stock_snapshot(&locked);
        let mut book = StockBook::new(locked);

        let (transition, change) = event(&mut order, &mut items, &mut book)?;

        let stock: Vec<InventoryItem> = book.touched().cloned().collect();
        for item in &stock {
            store::save_inventory_item(&mut tx, item).await?;
        }
        sync_location_usage(&mut tx, scope, &before, &stock).await?;
        store::record_ledger_entries(&mut tx, &transition.entries, reason).await?;
        persist_line_change(&mut tx, &order, change).await?;

        tx.commit().await?;

        self.alerts.after_persist(stock.clone()).await;

        Ok(OrderEventOutcome {
            order,
            items,
            transition,
            stock,
        })
    }

    /// Change an order's status
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        to: SalesOrderStatus,
    ) -> AppResult<OrderEventOutcome> {
        self.run_event(tenant_id, order_id, None, "sales_order_status", |order, items, book| {
            let t = lifecycle::change_status(order, to, items, book, Utc::now())?;
            Ok((t, LineChange::None))
        })
        .await
    }

    /// Soft-delete an order, releasing its reservations
    pub async fn soft_delete(&self, tenant_id: Uuid, order_id: Uuid) -> AppResult<OrderEventOutcome> {
        self.run_event(tenant_id, order_id, None, "sales_order_soft_delete", |order, items, book| {
            let t = lifecycle::soft_delete(order, items, book, Utc::now())?;
            Ok((t, LineChange::None))
        })
        .await
    }

    /// Restore a soft-deleted order, re-reserving its lines
    pub async fn restore(&self, tenant_id: Uuid, order_id: Uuid) -> AppResult<OrderEventOutcome> {
        self.run_event(tenant_id, order_id, None, "sales_order_restore", |order, items, book| {
            let t = lifecycle::restore(order, items, book, Utc::now())?;
            Ok((t, LineChange::None))
        })
        .await
    }

    /// Permanently delete an order and its lines
    pub async fn hard_delete(&self, tenant_id: Uuid, order_id: Uuid) -> AppResult<OrderEventOutcome> {
        self.run_event(tenant_id, order_id, None, "sales_order_delete", |order, items, book| {
            let t = lifecycle::hard_delete(order, items, book)?;
            Ok((t, LineChange::DeleteOrder))
        })
        .await
    }

    /// Add a line to an order
    pub async fn add_item(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        input: AddOrderItemInput,
    ) -> AppResult<OrderEventOutcome> {
        let line = SalesOrderItem {
            id: Uuid::new_v4(),
            sales_order_id: order_id,
            inventory_item_id: input.inventory_item_id,
            quantity: input.quantity,
        };
        let item_id = line.inventory_item_id;

        self.run_event(tenant_id, order_id, Some(item_id), "sales_order_item_added", move |order, items, book| {
            let t = lifecycle::add_item(order, &line, book)?;
            items.push(line.clone());
            Ok((t, LineChange::Insert(line)))
        })
        .await
    }

    /// Change the quantity of a line
    pub async fn update_item_quantity(
        &self,
        tenant_id: Uuid,
        line_id: Uuid,
        quantity: Decimal,
    ) -> AppResult<OrderEventOutcome> {
        let order_id = self.order_of_line(tenant_id, line_id).await?;

        self.run_event(tenant_id, order_id, None, "sales_order_item_changed", |order, items, book| {
            let line = find_line(items, line_id)?;
            let t = lifecycle::change_item_quantity(order, line, quantity, book)?;
            Ok((t, LineChange::Update(line.clone())))
        })
        .await
    }

    /// Remove a line from an order
    pub async fn remove_item(&self, tenant_id: Uuid, line_id: Uuid) -> AppResult<OrderEventOutcome> {
        let order_id = self.order_of_line(tenant_id, line_id).await?;

        self.run_event(tenant_id, order_id, None, "sales_order_item_removed", |order, items, book| {
            let line = find_line(items, line_id)?.clone();
            let t = lifecycle::remove_item(order, &line, book)?;
            items.retain(|i| i.id != line_id);
            Ok((t, LineChange::Delete(line_id)))
        })
        .await
    }

    async fn order_of_line(&self, tenant_id: Uuid, line_id: Uuid) -> AppResult<Uuid> {
        let mut conn = self.db.acquire().await?;
        store::find_order_of_item(&mut conn, TenantScope::Tenant(tenant_id), line_id).await
    }
}

fn find_line(items: &mut [SalesOrderItem], line_id: Uuid) -> AppResult<&mut SalesOrderItem> {
    items
        .iter_mut()
        .find(|i| i.id == line_id)
        .ok_or_else(|| crate::error::AppError::NotFound("Sales order item".to_string()))
}

async fn persist_line_change(conn: &mut PgConnection, order: &SalesOrder, change: LineChange) -> AppResult<()> {
    match change {
        LineChange::DeleteOrder => return store::delete_sales_order(conn, order.id).await,
        LineChange::None => {}
        LineChange::Insert(line) => store::insert_order_item(conn, &line).await?,
        LineChange::Update(line) => store::update_order_item_quantity(conn, &line).await?,
        LineChange::Delete(id) => store::delete_order_item(conn, id).await?,
    }
    store::save_sales_order(conn, order).await
}
