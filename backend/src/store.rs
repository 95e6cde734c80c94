//! PostgreSQL persistence for the stock core
//!
//! Loaders named `lock_*` take `FOR UPDATE` row locks and must run inside the
//! caller's transaction. Multi-row locks are always taken in id order so two
//! workflows touching the same items cannot deadlock each other.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    BusinessCategory, InventoryItem, InventoryLocation, ItemStatus, Material, MaterialReceipt,
    PreparationOrder, PreparationStatus, ProductionMode, ProductionOrder, ProductionStatus,
    SalesOrder, SalesOrderItem, SalesOrderStatus, TenantScope,
};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::ledger::LedgerEntry;

fn unknown(kind: &str, value: &str) -> AppError {
    AppError::Internal(format!("Unknown {} '{}' in database", kind, value))
}

fn sorted_unique(ids: &[Uuid]) -> Vec<Uuid> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids.dedup();
    ids
}

// ============================================================================
// Inventory items
// ============================================================================

/// Database row for an inventory item
#[derive(Debug, FromRow)]
struct InventoryItemRow {
    id: Uuid,
    tenant_id: Uuid,
    sku: String,
    name: String,
    category: String,
    current_stock: Decimal,
    reserved_quantity: Decimal,
    minimum_stock: Decimal,
    expiry_date: Option<NaiveDate>,
    status: String,
    location_id: Option<Uuid>,
    unit_cost: Decimal,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InventoryItemRow> for InventoryItem {
    type Error = AppError;

    fn try_from(row: InventoryItemRow) -> AppResult<Self> {
        let status = ItemStatus::parse(&row.status).ok_or_else(|| unknown("item status", &row.status))?;
        Ok(InventoryItem {
            id: row.id,
            tenant_id: row.tenant_id,
            sku: row.sku,
            name: row.name,
            category: BusinessCategory::parse(&row.category),
            current_stock: row.current_stock,
            reserved_quantity: row.reserved_quantity,
            minimum_stock: row.minimum_stock,
            expiry_date: row.expiry_date,
            status,
            location_id: row.location_id,
            unit_cost: row.unit_cost,
            updated_at: row.updated_at,
        })
    }
}

const ITEM_COLUMNS: &str = "id, tenant_id, sku, name, category, current_stock, reserved_quantity, \
     minimum_stock, expiry_date, status, location_id, unit_cost, updated_at";

/// Lock the given inventory items; every id must exist within the scope
pub async fn lock_inventory_items(
    conn: &mut PgConnection,
    scope: TenantScope,
    ids: &[Uuid],
) -> AppResult<Vec<InventoryItem>> {
    let ids = sorted_unique(ids);
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, InventoryItemRow>(&format!(
        "SELECT {} FROM inventory_items \
         WHERE id = ANY($1) AND ($2::uuid IS NULL OR tenant_id = $2) \
         ORDER BY id FOR UPDATE",
        ITEM_COLUMNS
    ))
    .bind(&ids)
    .bind(scope.tenant_id())
    .fetch_all(&mut *conn)
    .await?;

    if rows.len() != ids.len() {
        let missing = ids
            .iter()
            .find(|id| !rows.iter().any(|r| r.id == **id))
            .copied()
            .unwrap_or_default();
        return Err(AppError::NotFound(format!("Inventory item {}", missing)));
    }

    rows.into_iter().map(InventoryItem::try_from).collect()
}

pub async fn lock_inventory_item(
    conn: &mut PgConnection,
    scope: TenantScope,
    id: Uuid,
) -> AppResult<InventoryItem> {
    lock_inventory_items(conn, scope, &[id])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
}

/// Items with an expiry date, for the expiry sweep
pub async fn lock_items_with_expiry(
    conn: &mut PgConnection,
    scope: TenantScope,
) -> AppResult<Vec<InventoryItem>> {
    let rows = sqlx::query_as::<_, InventoryItemRow>(&format!(
        "SELECT {} FROM inventory_items \
         WHERE expiry_date IS NOT NULL AND ($1::uuid IS NULL OR tenant_id = $1) \
         ORDER BY id FOR UPDATE",
        ITEM_COLUMNS
    ))
    .bind(scope.tenant_id())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(InventoryItem::try_from).collect()
}

/// Write back the mutable state of an item
pub async fn save_inventory_item(conn: &mut PgConnection, item: &InventoryItem) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE inventory_items
        SET current_stock = $1, reserved_quantity = $2, status = $3, location_id = $4, updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(item.current_stock)
    .bind(item.reserved_quantity)
    .bind(item.status.as_str())
    .bind(item.location_id)
    .bind(item.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Mark an item expired unless it already is. Returns whether a row changed.
pub async fn mark_item_expired(conn: &mut PgConnection, id: Uuid) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE inventory_items SET status = 'expired', updated_at = NOW() WHERE id = $1 AND status <> 'expired'",
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_inventory_item(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM inventory_items WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// ============================================================================
// Inventory locations
// ============================================================================

#[derive(Debug, FromRow)]
struct LocationRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    capacity: Option<Decimal>,
    current_usage: Decimal,
}

impl From<LocationRow> for InventoryLocation {
    fn from(row: LocationRow) -> Self {
        InventoryLocation {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            capacity: row.capacity,
            current_usage: row.current_usage,
        }
    }
}

/// Lock locations in id order
pub async fn lock_locations(
    conn: &mut PgConnection,
    scope: TenantScope,
    ids: &[Uuid],
) -> AppResult<Vec<InventoryLocation>> {
    let ids = sorted_unique(ids);
    let rows = sqlx::query_as::<_, LocationRow>(
        r#"
        SELECT id, tenant_id, name, capacity, current_usage
        FROM inventory_locations
        WHERE id = ANY($1) AND ($2::uuid IS NULL OR tenant_id = $2)
        ORDER BY id FOR UPDATE
        "#,
    )
    .bind(&ids)
    .bind(scope.tenant_id())
    .fetch_all(&mut *conn)
    .await?;

    if rows.len() != ids.len() {
        return Err(AppError::NotFound("Inventory location".to_string()));
    }
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn save_location_usage(conn: &mut PgConnection, location: &InventoryLocation) -> AppResult<()> {
    sqlx::query("UPDATE inventory_locations SET current_usage = $1 WHERE id = $2")
        .bind(location.current_usage)
        .bind(location.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// ============================================================================
// Materials and receipts
// ============================================================================

#[derive(Debug, FromRow)]
struct MaterialRow {
    id: Uuid,
    tenant_id: Uuid,
    code: String,
    name: String,
    unit: String,
    current_stock: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MaterialRow> for Material {
    fn from(row: MaterialRow) -> Self {
        Material {
            id: row.id,
            tenant_id: row.tenant_id,
            code: row.code,
            name: row.name,
            unit: row.unit,
            current_stock: row.current_stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Lock materials by id, or every material in scope when `ids` is `None`
pub async fn lock_materials(
    conn: &mut PgConnection,
    scope: TenantScope,
    ids: Option<&[Uuid]>,
) -> AppResult<Vec<Material>> {
    let wanted = ids.map(sorted_unique);
    let rows = sqlx::query_as::<_, MaterialRow>(
        r#"
        SELECT id, tenant_id, code, name, unit, current_stock, created_at, updated_at
        FROM materials
        WHERE ($1::uuid[] IS NULL OR id = ANY($1))
          AND ($2::uuid IS NULL OR tenant_id = $2)
        ORDER BY id FOR UPDATE
        "#,
    )
    .bind(wanted.as_deref())
    .bind(scope.tenant_id())
    .fetch_all(&mut *conn)
    .await?;

    if let Some(wanted) = &wanted {
        if rows.len() != wanted.len() {
            return Err(AppError::NotFound("Material".to_string()));
        }
    }
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn lock_material(conn: &mut PgConnection, scope: TenantScope, id: Uuid) -> AppResult<Material> {
    lock_materials(conn, scope, Some(std::slice::from_ref(&id)))
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Material".to_string()))
}

pub async fn save_material_stock(conn: &mut PgConnection, material: &Material) -> AppResult<()> {
    sqlx::query("UPDATE materials SET current_stock = $1, updated_at = NOW() WHERE id = $2")
        .bind(material.current_stock)
        .bind(material.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[derive(Debug, FromRow)]
struct ReceiptRow {
    id: Uuid,
    tenant_id: Uuid,
    material_id: Uuid,
    quantity: Decimal,
    received_at: DateTime<Utc>,
}

impl From<ReceiptRow> for MaterialReceipt {
    fn from(row: ReceiptRow) -> Self {
        MaterialReceipt {
            id: row.id,
            tenant_id: row.tenant_id,
            material_id: row.material_id,
            quantity: row.quantity,
            received_at: row.received_at,
        }
    }
}

pub async fn insert_receipt(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    material_id: Uuid,
    quantity: Decimal,
    received_at: DateTime<Utc>,
) -> AppResult<MaterialReceipt> {
    let row = sqlx::query_as::<_, ReceiptRow>(
        r#"
        INSERT INTO material_receipts (tenant_id, material_id, quantity, received_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, tenant_id, material_id, quantity, received_at
        "#,
    )
    .bind(tenant_id)
    .bind(material_id)
    .bind(quantity)
    .bind(received_at)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.into())
}

/// Every receipt in scope, oldest first
pub async fn load_receipts(conn: &mut PgConnection, scope: TenantScope) -> AppResult<Vec<MaterialReceipt>> {
    let rows = sqlx::query_as::<_, ReceiptRow>(
        r#"
        SELECT id, tenant_id, material_id, quantity, received_at
        FROM material_receipts
        WHERE ($1::uuid IS NULL OR tenant_id = $1)
        ORDER BY received_at, id
        "#,
    )
    .bind(scope.tenant_id())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

// ============================================================================
// Preparation orders
// ============================================================================

#[derive(Debug, FromRow)]
struct PreparationRow {
    id: Uuid,
    tenant_id: Uuid,
    pattern_id: Uuid,
    status: String,
    materials_used: serde_json::Value,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PreparationRow> for PreparationOrder {
    type Error = AppError;

    fn try_from(row: PreparationRow) -> AppResult<Self> {
        let status = PreparationStatus::parse(&row.status)
            .ok_or_else(|| unknown("preparation status", &row.status))?;
        // A non-array payload is treated as an empty usage list
        let materials_used = match row.materials_used {
            serde_json::Value::Array(entries) => entries,
            serde_json::Value::Null => Vec::new(),
            other => {
                tracing::warn!(order_id = %row.id, payload = %other, "materials_used is not a list");
                Vec::new()
            }
        };
        Ok(PreparationOrder {
            id: row.id,
            tenant_id: row.tenant_id,
            pattern_id: row.pattern_id,
            status,
            materials_used,
            completed_at: row.completed_at,
            created_at: row.created_at,
        })
    }
}

const PREPARATION_COLUMNS: &str =
    "id, tenant_id, pattern_id, status, materials_used, completed_at, created_at";

pub async fn lock_preparation_order(
    conn: &mut PgConnection,
    scope: TenantScope,
    id: Uuid,
) -> AppResult<PreparationOrder> {
    sqlx::query_as::<_, PreparationRow>(&format!(
        "SELECT {} FROM preparation_orders \
         WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2) FOR UPDATE",
        PREPARATION_COLUMNS
    ))
    .bind(id)
    .bind(scope.tenant_id())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Preparation order".to_string()))?
    .try_into()
}

/// Completed orders in scope, the only ones whose usage counts
pub async fn load_completed_preparation_orders(
    conn: &mut PgConnection,
    scope: TenantScope,
) -> AppResult<Vec<PreparationOrder>> {
    let rows = sqlx::query_as::<_, PreparationRow>(&format!(
        "SELECT {} FROM preparation_orders \
         WHERE status = 'completed' AND ($1::uuid IS NULL OR tenant_id = $1) \
         ORDER BY completed_at NULLS LAST, id",
        PREPARATION_COLUMNS
    ))
    .bind(scope.tenant_id())
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(PreparationOrder::try_from).collect()
}

pub async fn save_preparation_order(conn: &mut PgConnection, order: &PreparationOrder) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE preparation_orders
        SET status = $1, materials_used = $2, completed_at = $3
        WHERE id = $4
        "#,
    )
    .bind(order.status.as_str())
    .bind(serde_json::Value::Array(order.materials_used.clone()))
    .bind(order.completed_at)
    .bind(order.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ============================================================================
// Production orders
// ============================================================================

#[derive(Debug, FromRow)]
struct ProductionRow {
    id: Uuid,
    tenant_id: Uuid,
    pattern_id: Uuid,
    mode: String,
    contractor: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductionRow> for ProductionOrder {
    type Error = AppError;

    fn try_from(row: ProductionRow) -> AppResult<Self> {
        let status = ProductionStatus::parse(&row.status)
            .ok_or_else(|| unknown("production status", &row.status))?;
        let mode = match (row.mode.as_str(), row.contractor) {
            ("in_house", _) => ProductionMode::InHouse,
            ("contracted", Some(contractor)) => ProductionMode::Contracted { contractor },
            ("contracted", None) => ProductionMode::Contracted {
                contractor: String::new(),
            },
            (other, _) => return Err(unknown("production mode", other)),
        };
        Ok(ProductionOrder {
            id: row.id,
            tenant_id: row.tenant_id,
            pattern_id: row.pattern_id,
            mode,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub async fn lock_production_order(
    conn: &mut PgConnection,
    scope: TenantScope,
    id: Uuid,
) -> AppResult<ProductionOrder> {
    sqlx::query_as::<_, ProductionRow>(
        r#"
        SELECT id, tenant_id, pattern_id, mode, contractor, status, created_at, updated_at
        FROM production_orders
        WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)
        FOR UPDATE
        "#,
    )
    .bind(id)
    .bind(scope.tenant_id())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Production order".to_string()))?
    .try_into()
}

pub async fn save_production_status(conn: &mut PgConnection, order: &ProductionOrder) -> AppResult<()> {
    sqlx::query("UPDATE production_orders SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(order.status.as_str())
        .bind(order.updated_at)
        .bind(order.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// ============================================================================
// Sales orders
// ============================================================================

#[derive(Debug, FromRow)]
struct SalesOrderRow {
    id: Uuid,
    tenant_id: Uuid,
    order_number: String,
    status: String,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SalesOrderRow> for SalesOrder {
    type Error = AppError;

    fn try_from(row: SalesOrderRow) -> AppResult<Self> {
        let status = SalesOrderStatus::parse(&row.status)
            .ok_or_else(|| unknown("sales order status", &row.status))?;
        Ok(SalesOrder {
            id: row.id,
            tenant_id: row.tenant_id,
            order_number: row.order_number,
            status,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Lock a sales order, soft-deleted ones included
pub async fn lock_sales_order(conn: &mut PgConnection, scope: TenantScope, id: Uuid) -> AppResult<SalesOrder> {
    sqlx::query_as::<_, SalesOrderRow>(
        r#"
        SELECT id, tenant_id, order_number, status, deleted_at, created_at, updated_at
        FROM sales_orders
        WHERE id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)
        FOR UPDATE
        "#,
    )
    .bind(id)
    .bind(scope.tenant_id())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Sales order".to_string()))?
    .try_into()
}

/// Find the order owning a line item
pub async fn find_order_of_item(conn: &mut PgConnection, scope: TenantScope, item_id: Uuid) -> AppResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT so.id
        FROM sales_order_items soi
        JOIN sales_orders so ON so.id = soi.sales_order_id
        WHERE soi.id = $1 AND ($2::uuid IS NULL OR so.tenant_id = $2)
        "#,
    )
    .bind(item_id)
    .bind(scope.tenant_id())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Sales order item".to_string()))
}

#[derive(Debug, FromRow)]
struct SalesOrderItemRow {
    id: Uuid,
    sales_order_id: Uuid,
    inventory_item_id: Uuid,
    quantity: Decimal,
}

impl From<SalesOrderItemRow> for SalesOrderItem {
    fn from(row: SalesOrderItemRow) -> Self {
        SalesOrderItem {
            id: row.id,
            sales_order_id: row.sales_order_id,
            inventory_item_id: row.inventory_item_id,
            quantity: row.quantity,
        }
    }
}

/// Lines of an order; the order row lock serialises edits to them
pub async fn load_order_items(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Vec<SalesOrderItem>> {
    let rows = sqlx::query_as::<_, SalesOrderItemRow>(
        r#"
        SELECT id, sales_order_id, inventory_item_id, quantity
        FROM sales_order_items
        WHERE sales_order_id = $1
        ORDER BY id
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn save_sales_order(conn: &mut PgConnection, order: &SalesOrder) -> AppResult<()> {
    sqlx::query("UPDATE sales_orders SET status = $1, deleted_at = $2, updated_at = $3 WHERE id = $4")
        .bind(order.status.as_str())
        .bind(order.deleted_at)
        .bind(order.updated_at)
        .bind(order.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete_sales_order(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM sales_orders WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_order_item(conn: &mut PgConnection, line: &SalesOrderItem) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO sales_order_items (id, sales_order_id, inventory_item_id, quantity) VALUES ($1, $2, $3, $4)",
    )
    .bind(line.id)
    .bind(line.sales_order_id)
    .bind(line.inventory_item_id)
    .bind(line.quantity)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn update_order_item_quantity(conn: &mut PgConnection, line: &SalesOrderItem) -> AppResult<()> {
    sqlx::query("UPDATE sales_order_items SET quantity = $1 WHERE id = $2")
        .bind(line.quantity)
        .bind(line.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete_order_item(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM sales_order_items WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// ============================================================================
// Ledger
// ============================================================================

/// Append ledger entries to the audit trail
pub async fn record_ledger_entries(
    conn: &mut PgConnection,
    entries: &[LedgerEntry],
    reason: &str,
) -> AppResult<()> {
    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO stock_ledger_entries
                (tenant_id, entity_kind, entity_id, field, kind, amount, before_value, after_value, shortfall, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.tenant_id)
        .bind(entry.entity_kind)
        .bind(entry.entity_id)
        .bind(entry.field.as_str())
        .bind(entry.kind.as_str())
        .bind(entry.amount)
        .bind(entry.before)
        .bind(entry.after)
        .bind(entry.shortfall)
        .bind(reason)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
