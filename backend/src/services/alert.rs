//! Post-commit alert evaluation for inventory items

use chrono::{NaiveDate, Utc};
use shared::{InventoryItem, StockAlert, TenantScope};
use sqlx::PgPool;
use std::sync::Arc;

use crate::alerts::{self, AlertSink};
use crate::config::StockConfig;
use crate::error::AppResult;
use crate::store;

/// Runs the alert evaluator after inventory items were persisted
#[derive(Clone)]
pub struct AlertService {
    db: PgPool,
    sink: Arc<dyn AlertSink>,
    rules: StockConfig,
}

/// Outcome of an expiry sweep
#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
    pub evaluated: usize,
    pub expired: usize,
    pub alerts: Vec<StockAlert>,
}

impl AlertService {
    /// Create a new AlertService instance
    pub fn new(db: PgPool, sink: Arc<dyn AlertSink>, rules: StockConfig) -> Self {
        Self { db, sink, rules }
    }

    pub fn rules(&self) -> &StockConfig {
        &self.rules
    }

    /// Evaluate freshly committed items and emit their alerts.
    ///
    /// The stock change is already committed, so a failure to persist the
    /// expired status is logged rather than returned.
    pub async fn after_persist(&self, items: Vec<InventoryItem>) -> Vec<StockAlert> {
        let today = Utc::now().date_naive();
        let mut emitted = Vec::new();

        for mut item in items {
            let evaluation = alerts::evaluate(&mut item, today, &self.rules);
            if evaluation.status_changed {
                let result = match self.db.acquire().await {
                    Ok(mut conn) => store::mark_item_expired(&mut conn, item.id).await,
                    Err(e) => Err(e.into()),
                };
                if let Err(e) = result {
                    tracing::error!(item_id = %item.id, error = %e, "Failed to persist expired status");
                }
            }
            evaluation.dispatch(self.sink.as_ref());
            emitted.extend(evaluation.alerts);
        }

        emitted
    }

    /// Evaluate every item that carries an expiry date as of `today`
    pub async fn sweep_expiry(&self, scope: TenantScope, today: NaiveDate) -> AppResult<SweepSummary> {
        let mut tx = self.db.begin().await?;
        let items = store::lock_items_with_expiry(&mut tx, scope).await?;

        let mut summary = SweepSummary::default();
        for mut item in items {
            summary.evaluated += 1;
            let evaluation = alerts::evaluate(&mut item, today, &self.rules);
            if evaluation.status_changed && store::mark_item_expired(&mut tx, item.id).await? {
                summary.expired += 1;
            }
            summary.alerts.extend(evaluation.alerts);
        }

        tx.commit().await?;

        for alert in &summary.alerts {
            self.sink.emit(alert);
        }

        tracing::info!(
            %scope,
            evaluated = summary.evaluated,
            expired = summary.expired,
            alerts = summary.alerts.len(),
            "Expiry sweep finished"
        );
        Ok(summary)
    }
}
