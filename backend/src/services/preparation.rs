//! Preparation order service

use chrono::Utc;
use shared::{PreparationOrder, TenantScope};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppResult;
use crate::preparation::{self, Completion};
use crate::store;

/// Preparation service for starting, completing and cancelling orders
#[derive(Clone)]
pub struct PreparationService {
    db: PgPool,
}

impl PreparationService {
    /// Create a new PreparationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn start_order(&self, tenant_id: Uuid, order_id: Uuid) -> AppResult<PreparationOrder> {
        let mut tx = self.db.begin().await?;
        let mut order = store::lock_preparation_order(&mut tx, TenantScope::Tenant(tenant_id), order_id).await?;
        preparation::start(&mut order)?;
        store::save_preparation_order(&mut tx, &order).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Complete an order, deducting its recorded material usage once
    pub async fn complete_order(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<(PreparationOrder, Completion)> {
        let scope = TenantScope::Tenant(tenant_id);
        let mut tx = self.db.begin().await?;

        let mut order = store::lock_preparation_order(&mut tx, scope, order_id).await?;
        let ids = preparation::referenced_materials(&order);
        let mut materials: HashMap<_, _> = if ids.is_empty() {
            HashMap::new()
        } else {
            store::lock_materials(&mut tx, scope, Some(ids.as_slice()))
                .await?
                .into_iter()
                .map(|m| (m.id, m))
                .collect()
        };

        let completion = preparation::complete(&mut order, &mut materials, Utc::now())?;

        for entry in &completion.entries {
            if let Some(material) = materials.get(&entry.entity_id) {
                store::save_material_stock(&mut tx, material).await?;
            }
        }
        store::record_ledger_entries(&mut tx, &completion.entries, "preparation_completed").await?;
        store::save_preparation_order(&mut tx, &order).await?;
        tx.commit().await?;

        Ok((order, completion))
    }

    pub async fn cancel_order(&self, tenant_id: Uuid, order_id: Uuid) -> AppResult<PreparationOrder> {
        let mut tx = self.db.begin().await?;
        let mut order = store::lock_preparation_order(&mut tx, TenantScope::Tenant(tenant_id), order_id).await?;
        preparation::cancel(&mut order)?;
        store::save_preparation_order(&mut tx, &order).await?;
        tx.commit().await?;
        Ok(order)
    }
}
