//! Inventory service for manual adjustments, moves and deletion

use rust_decimal::Decimal;
use shared::{InventoryItem, InventoryLocation, TenantScope};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppResult;
use crate::inventory;
use crate::services::alert::AlertService;
use crate::store;

/// Inventory service for item-level stock operations
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
    alerts: AlertService,
}

/// Item and locations after a move
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub item: InventoryItem,
    pub locations: Vec<InventoryLocation>,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool, alerts: AlertService) -> Self {
        Self { db, alerts }
    }

    /// Adjust on-hand stock by a signed delta, then evaluate alerts
    pub async fn adjust_stock(&self, tenant_id: Uuid, item_id: Uuid, delta: Decimal) -> AppResult<InventoryItem> {
        let mut tx = self.db.begin().await?;
        let mut item = store::lock_inventory_item(&mut tx, TenantScope::Tenant(tenant_id), item_id).await?;

        let before = inventory::stock_snapshot([&item]);
        let entry = inventory::adjust(&mut item, delta)?;

        store::save_inventory_item(&mut tx, &item).await?;
        sync_location_usage(&mut tx, TenantScope::Tenant(tenant_id), &before, [&item]).await?;
        store::record_ledger_entries(&mut tx, std::slice::from_ref(&entry), "manual_adjustment").await?;
        tx.commit().await?;

        tracing::info!(sku = %item.sku, %delta, stock = %item.current_stock, "Inventory stock adjusted");
        self.alerts.after_persist(vec![item.clone()]).await;
        Ok(item)
    }

    /// Move an item to another location, checking the destination's capacity
    pub async fn move_item(&self, tenant_id: Uuid, item_id: Uuid, destination: Uuid) -> AppResult<MoveOutcome> {
        let scope = TenantScope::Tenant(tenant_id);
        let mut tx = self.db.begin().await?;

        let mut item = store::lock_inventory_item(&mut tx, scope, item_id).await?;
        let mut ids = vec![destination];
        ids.extend(item.location_id);
        let mut locations = store::lock_locations(&mut tx, scope, &ids).await?;

        let (mut source, mut target) = (None, None);
        for location in locations.iter_mut() {
            if location.id == destination {
                target = Some(location);
            } else {
                source = Some(location);
            }
        }
        let target = target.ok_or_else(|| crate::error::AppError::NotFound("Inventory location".to_string()))?;

        inventory::move_item(&mut item, source, target)?;

        for location in &locations {
            store::save_location_usage(&mut tx, location).await?;
        }
        store::save_inventory_item(&mut tx, &item).await?;
        tx.commit().await?;

        self.alerts.after_persist(vec![item.clone()]).await;
        Ok(MoveOutcome { item, locations })
    }

    /// Delete an item that holds no reservations
    pub async fn delete_item(&self, tenant_id: Uuid, item_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let item = store::lock_inventory_item(&mut tx, TenantScope::Tenant(tenant_id), item_id).await?;

        inventory::ensure_deletable(&item)?;

        if let Some(location_id) = item.location_id {
            let mut locations = store::lock_locations(&mut tx, TenantScope::Tenant(tenant_id), &[location_id]).await?;
            for location in locations.iter_mut() {
                location.current_usage = (location.current_usage - item.current_stock).max(Decimal::ZERO);
                store::save_location_usage(&mut tx, location).await?;
            }
        }
        store::delete_inventory_item(&mut tx, item.id).await?;
        tx.commit().await?;

        tracing::info!(sku = %item.sku, "Inventory item deleted");
        Ok(())
    }
}

/// Apply the on-hand change of `items` since `before` to their locations.
///
/// Called after the items are locked, so locations are always locked second
/// and in id order.
pub async fn sync_location_usage<'a>(
    conn: &mut PgConnection,
    scope: TenantScope,
    before: &HashMap<Uuid, Decimal>,
    items: impl IntoIterator<Item = &'a InventoryItem>,
) -> AppResult<()> {
    let deltas = inventory::location_deltas(before, items);
    if deltas.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = deltas.keys().copied().collect();
    for mut location in store::lock_locations(conn, scope, &ids).await? {
        if let Some(delta) = deltas.get(&location.id) {
            inventory::apply_location_delta(&mut location, *delta);
            store::save_location_usage(conn, &location).await?;
        }
    }
    Ok(())
}
