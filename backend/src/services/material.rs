//! Material stock service: receipts and manual adjustments

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{validate_positive_quantity, Material, MaterialReceipt, TenantScope};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::ledger::{self, LedgerEntry, ShortfallPolicy, StockField};
use crate::store;

/// Material service for receipts and adjustments
#[derive(Clone)]
pub struct MaterialService {
    db: PgPool,
}

/// Input for posting a material receipt
#[derive(Debug, Deserialize)]
pub struct PostReceiptInput {
    pub material_id: Uuid,
    pub quantity: Decimal,
    pub received_at: Option<DateTime<Utc>>,
}

/// Result of a posted receipt
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptPosted {
    pub receipt: MaterialReceipt,
    pub material: Material,
    pub entry: LedgerEntry,
}

impl MaterialService {
    /// Create a new MaterialService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a receipt and add it to the material's stock
    pub async fn post_receipt(&self, tenant_id: Uuid, input: PostReceiptInput) -> AppResult<ReceiptPosted> {
        validate_positive_quantity(input.quantity).map_err(|msg| AppError::validation("quantity", msg))?;

        let mut tx = self.db.begin().await?;
        let mut material = store::lock_material(&mut tx, TenantScope::Tenant(tenant_id), input.material_id).await?;

        let receipt = store::insert_receipt(
            &mut tx,
            tenant_id,
            material.id,
            input.quantity,
            input.received_at.unwrap_or_else(Utc::now),
        )
        .await?;
        let entry = ledger::increase(&mut material, StockField::CurrentStock, input.quantity)?;

        store::save_material_stock(&mut tx, &material).await?;
        store::record_ledger_entries(&mut tx, std::slice::from_ref(&entry), "material_receipt").await?;
        tx.commit().await?;

        tracing::info!(
            material = %material.code,
            quantity = %input.quantity,
            stock = %material.current_stock,
            "Material receipt posted"
        );

        Ok(ReceiptPosted {
            receipt,
            material,
            entry,
        })
    }

    /// Manual adjustment by a signed delta. Taking out more than is on hand
    /// is rejected.
    pub async fn adjust_stock(&self, tenant_id: Uuid, material_id: Uuid, delta: Decimal) -> AppResult<Material> {
        if delta.is_zero() {
            return Err(AppError::validation("delta", "Adjustment must not be zero"));
        }

        let mut tx = self.db.begin().await?;
        let mut material = store::lock_material(&mut tx, TenantScope::Tenant(tenant_id), material_id).await?;

        let entry = if delta > Decimal::ZERO {
            ledger::increase(&mut material, StockField::CurrentStock, delta)?
        } else {
            ledger::decrease(&mut material, StockField::CurrentStock, -delta, ShortfallPolicy::Reject)?
        };

        store::save_material_stock(&mut tx, &material).await?;
        store::record_ledger_entries(&mut tx, std::slice::from_ref(&entry), "manual_adjustment").await?;
        tx.commit().await?;

        Ok(material)
    }
}
