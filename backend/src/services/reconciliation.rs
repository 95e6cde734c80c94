//! Material reconciliation service

use shared::TenantScope;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::StockConfig;
use crate::error::AppResult;
use crate::reconciliation::{self, MaterialUsageReport, ReconcileMode, UsageTotals};
use crate::store;

/// Reconciliation service run from the maintenance CLI
#[derive(Clone)]
pub struct ReconciliationService {
    db: PgPool,
    rules: StockConfig,
}

/// Report for one run
#[derive(Debug, Clone, Default)]
pub struct ReconcileRun {
    pub rows: Vec<MaterialUsageReport>,
    pub skipped_entries: usize,
}

impl ReconcileRun {
    pub fn mismatches(&self) -> usize {
        self.rows.iter().filter(|r| r.mismatch).count()
    }
}

impl ReconciliationService {
    /// Create a new ReconciliationService instance
    pub fn new(db: PgPool, rules: StockConfig) -> Self {
        Self { db, rules }
    }

    /// Reconcile every material in scope. Dry runs roll back.
    pub async fn run(&self, scope: TenantScope, mode: ReconcileMode) -> AppResult<ReconcileRun> {
        self.reconcile(scope, None, mode).await
    }

    /// Recompute a single material without writing
    pub async fn recompute(&self, tenant_id: Uuid, material_id: Uuid) -> AppResult<MaterialUsageReport> {
        let run = self
            .reconcile(TenantScope::Tenant(tenant_id), Some(material_id), ReconcileMode::DryRun)
            .await?;
        run.rows
            .into_iter()
            .next()
            .ok_or_else(|| crate::error::AppError::NotFound("Material".to_string()))
    }

    async fn reconcile(
        &self,
        scope: TenantScope,
        material_id: Option<Uuid>,
        mode: ReconcileMode,
    ) -> AppResult<ReconcileRun> {
        let mut tx = self.db.begin().await?;

        let ids = material_id.map(|id| vec![id]);
        let materials = store::lock_materials(&mut tx, scope, ids.as_deref()).await?;
        let receipts = store::load_receipts(&mut tx, scope).await?;
        let orders = store::load_completed_preparation_orders(&mut tx, scope).await?;
        let usage = UsageTotals::from_orders(&orders);

        let mut run = ReconcileRun {
            rows: Vec::with_capacity(materials.len()),
            skipped_entries: usage.skipped,
        };
        for mut material in materials {
            let (report, entry) = reconciliation::reconcile(
                &mut material,
                &receipts,
                &usage,
                self.rules.reconciliation_tolerance,
                mode,
            )?;
            if let Some(entry) = entry {
                store::save_material_stock(&mut tx, &material).await?;
                store::record_ledger_entries(&mut tx, std::slice::from_ref(&entry), "reconciliation").await?;
            }
            run.rows.push(report);
        }

        match mode {
            ReconcileMode::Apply => tx.commit().await?,
            ReconcileMode::DryRun => tx.rollback().await?,
        }

        tracing::info!(
            %scope,
            ?mode,
            materials = run.rows.len(),
            mismatches = run.mismatches(),
            skipped_entries = run.skipped_entries,
            "Material reconciliation finished"
        );
        Ok(run)
    }
}
