//! Preparation order workflow
//!
//! Material stock is deducted exactly once, when the order completes. The
//! deduction is automated, so a material that runs short is clamped at zero
//! and the shortfall is kept on the ledger entry instead of failing the order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{Material, PreparationOrder, PreparationStatus};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::ledger::{self, LedgerEntry, ShortfallPolicy, StockField};

/// Stock deducted by one completion
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub entries: Vec<LedgerEntry>,
    /// Malformed usage entries that were ignored
    pub skipped: usize,
}

impl Completion {
    pub fn clamped(&self) -> usize {
        self.entries.iter().filter(|e| e.was_clamped()).count()
    }
}

/// Materials the order's usage list refers to, for locking
pub fn referenced_materials(order: &PreparationOrder) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = order
        .parsed_usage()
        .entries
        .iter()
        .map(|u| u.material_id)
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

pub fn start(order: &mut PreparationOrder) -> AppResult<()> {
    if order.status != PreparationStatus::Draft {
        return Err(AppError::invalid_transition(
            "preparation order",
            order.status,
            PreparationStatus::InProgress,
        ));
    }
    order.status = PreparationStatus::InProgress;
    Ok(())
}

/// Cancel before completion. Nothing was deducted yet, so there is no stock effect.
pub fn cancel(order: &mut PreparationOrder) -> AppResult<()> {
    if !order.status.can_complete() {
        return Err(AppError::invalid_transition(
            "preparation order",
            order.status,
            PreparationStatus::Cancelled,
        ));
    }
    order.status = PreparationStatus::Cancelled;
    Ok(())
}

/// Complete the order and deduct its recorded usage from `materials`.
///
/// `materials` must hold every material in [`referenced_materials`]. Usage of
/// the same material across several entries is summed into one deduction.
pub fn complete(
    order: &mut PreparationOrder,
    materials: &mut HashMap<Uuid, Material>,
    now: DateTime<Utc>,
) -> AppResult<Completion> {
    if !order.status.can_complete() {
        return Err(AppError::invalid_transition(
            "preparation order",
            order.status,
            PreparationStatus::Completed,
        ));
    }

    let parsed = order.parsed_usage();
    for (index, reason) in &parsed.skipped {
        tracing::warn!(
            order_id = %order.id,
            index,
            %reason,
            "Skipping malformed material usage entry"
        );
    }

    let mut totals: Vec<(Uuid, Decimal)> = Vec::new();
    for usage in &parsed.entries {
        match totals.iter_mut().find(|(id, _)| *id == usage.material_id) {
            Some((_, qty)) => *qty += usage.quantity,
            None => totals.push((usage.material_id, usage.quantity)),
        }
    }

    // Validate every reference before touching any counter
    if let Some((missing, _)) = totals.iter().find(|(id, _)| !materials.contains_key(id)) {
        return Err(AppError::NotFound(format!("Material {}", missing)));
    }

    let mut completion = Completion {
        entries: Vec::with_capacity(totals.len()),
        skipped: parsed.skipped.len(),
    };
    for (material_id, qty) in totals {
        if qty.is_zero() {
            continue;
        }
        let material = materials
            .get_mut(&material_id)
            .ok_or_else(|| AppError::NotFound(format!("Material {}", material_id)))?;
        completion.entries.push(ledger::decrease(
            material,
            StockField::CurrentStock,
            qty,
            ShortfallPolicy::ClampToZero,
        )?);
    }

    order.status = PreparationStatus::Completed;
    order.completed_at = Some(now);
    tracing::info!(
        order_id = %order.id,
        materials = completion.entries.len(),
        skipped = completion.skipped,
        clamped = completion.clamped(),
        "Preparation order completed"
    );

    Ok(completion)
}
