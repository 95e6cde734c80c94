//! Production order service

use chrono::Utc;
use shared::{ProductionOrder, ProductionStatus, TenantScope};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store;

/// Production service for status transitions
#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
}

/// Apply a status change if the order's mode allows it
pub fn apply_transition(order: &mut ProductionOrder, to: ProductionStatus) -> AppResult<()> {
    if !order.can_transition_to(to) {
        return Err(AppError::invalid_transition("production order", order.status, to));
    }
    tracing::info!(order_id = %order.id, from = %order.status, %to, "Production order status changed");
    order.status = to;
    order.updated_at = Utc::now();
    Ok(())
}

impl ProductionService {
    /// Create a new ProductionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn transition(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        to: ProductionStatus,
    ) -> AppResult<ProductionOrder> {
        let mut tx = self.db.begin().await?;
        let mut order = store::lock_production_order(&mut tx, TenantScope::Tenant(tenant_id), order_id).await?;
        apply_transition(&mut order, to)?;
        store::save_production_status(&mut tx, &order).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Hand a contracted order to its contractor
    pub async fn send_to_contractor(&self, tenant_id: Uuid, order_id: Uuid) -> AppResult<ProductionOrder> {
        self.transition(tenant_id, order_id, ProductionStatus::Sent).await
    }
}
