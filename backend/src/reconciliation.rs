//! Material usage reconciliation
//!
//! Recomputes a material's expected stock from its receipt history and the
//! usage recorded on completed preparation orders, and optionally overwrites
//! the stored figure when the two drift apart.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{total_received, Material, MaterialReceipt, PreparationOrder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppResult;
use crate::ledger::{self, LedgerEntry, StockField};

/// Report-only or repair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    DryRun,
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileStatus {
    Ok,
    Mismatch,
    /// Mismatch found and overwritten in apply mode
    Fixed,
}

impl ReconcileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileStatus::Ok => "OK",
            ReconcileStatus::Mismatch => "MISMATCH",
            ReconcileStatus::Fixed => "FIXED",
        }
    }
}

/// Usage per material summed over completed preparation orders
#[derive(Debug, Clone, Default)]
pub struct UsageTotals {
    per_material: HashMap<Uuid, Decimal>,
    /// Completed orders that contributed
    pub orders: usize,
    /// Malformed entries that were skipped
    pub skipped: usize,
}

impl UsageTotals {
    /// Sum usage of every completed order; other statuses are ignored
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a PreparationOrder>) -> Self {
        let mut totals = UsageTotals::default();
        for order in orders.into_iter().filter(|o| o.is_authoritative()) {
            totals.orders += 1;
            let parsed = order.parsed_usage();
            for (index, reason) in &parsed.skipped {
                tracing::warn!(
                    order_id = %order.id,
                    index,
                    %reason,
                    "Skipping malformed material usage entry"
                );
            }
            totals.skipped += parsed.skipped.len();
            for usage in parsed.entries {
                *totals.per_material.entry(usage.material_id).or_default() += usage.quantity;
            }
        }
        totals
    }

    pub fn used(&self, material_id: Uuid) -> Decimal {
        self.per_material
            .get(&material_id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

/// One row of the reconciliation report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialUsageReport {
    pub material_id: Uuid,
    pub code: String,
    pub name: String,
    pub current: Decimal,
    pub total_received: Decimal,
    pub total_used: Decimal,
    pub expected: Decimal,
    pub mismatch: bool,
    pub status: ReconcileStatus,
}

impl MaterialUsageReport {
    pub fn difference(&self) -> Decimal {
        self.current - self.expected
    }
}

/// Compare a material's stored stock with what its history implies
pub fn recompute(
    material: &Material,
    receipts: &[MaterialReceipt],
    usage: &UsageTotals,
    tolerance: Decimal,
) -> MaterialUsageReport {
    let received = total_received(material.id, receipts);
    let used = usage.used(material.id);
    let expected = (received - used).max(Decimal::ZERO);
    let current = material.stock_quantity();
    let mismatch = (current - expected).abs() >= tolerance;

    MaterialUsageReport {
        material_id: material.id,
        code: material.code.clone(),
        name: material.name.clone(),
        current,
        total_received: received,
        total_used: used,
        expected,
        mismatch,
        status: if mismatch {
            ReconcileStatus::Mismatch
        } else {
            ReconcileStatus::Ok
        },
    }
}

/// Recompute and, in apply mode, overwrite a mismatching stock figure.
///
/// The overwrite is returned as an `Overwrite` ledger entry so the audit
/// trail can tell it apart from incremental movements.
pub fn reconcile(
    material: &mut Material,
    receipts: &[MaterialReceipt],
    usage: &UsageTotals,
    tolerance: Decimal,
    mode: ReconcileMode,
) -> AppResult<(MaterialUsageReport, Option<LedgerEntry>)> {
    let mut report = recompute(material, receipts, usage, tolerance);
    if !report.mismatch || mode == ReconcileMode::DryRun {
        return Ok((report, None));
    }

    let entry = ledger::set_absolute(material, StockField::CurrentStock, report.expected)?;
    report.status = ReconcileStatus::Fixed;
    tracing::info!(
        code = %report.code,
        before = %report.current,
        after = %report.expected,
        "Material stock reconciled"
    );
    Ok((report, Some(entry)))
}
