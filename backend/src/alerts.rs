//! Alert evaluation for inventory items
//!
//! [`evaluate`] is run once after an item is persisted. The only mutation it
//! makes is flipping an out-of-date item to `expired`; persisting that change
//! does not trigger another evaluation.

use chrono::NaiveDate;
use serde_json::json;
use shared::{AlertKind, AlertSeverity, InventoryItem, ItemStatus, StockAlert};

use crate::config::StockConfig;

/// Receives alert events. Delivery (mail, chat, push) lives elsewhere.
pub trait AlertSink: Send + Sync {
    fn emit(&self, alert: &StockAlert);
}

/// Writes each alert as a structured log event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn emit(&self, alert: &StockAlert) {
        let kind = alert.kind.as_str();
        match alert.severity {
            AlertSeverity::Critical => tracing::error!(
                target: "workshop_erp::alerts",
                kind,
                tenant_id = %alert.tenant_id,
                entity_id = %alert.entity_id,
                sku = %alert.sku,
                payload = %alert.payload,
                "Stock alert"
            ),
            AlertSeverity::Warning => tracing::warn!(
                target: "workshop_erp::alerts",
                kind,
                tenant_id = %alert.tenant_id,
                entity_id = %alert.entity_id,
                sku = %alert.sku,
                payload = %alert.payload,
                "Stock alert"
            ),
            AlertSeverity::Info => tracing::info!(
                target: "workshop_erp::alerts",
                kind,
                tenant_id = %alert.tenant_id,
                entity_id = %alert.entity_id,
                sku = %alert.sku,
                payload = %alert.payload,
                "Stock alert"
            ),
        }
    }
}

/// Result of evaluating one item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub alerts: Vec<StockAlert>,
    /// The item was moved to `expired` and must be persisted again
    pub status_changed: bool,
}

impl Evaluation {
    pub fn has(&self, kind: AlertKind) -> bool {
        self.alerts.iter().any(|a| a.kind == kind)
    }

    pub fn dispatch(&self, sink: &dyn AlertSink) {
        for alert in &self.alerts {
            sink.emit(alert);
        }
    }
}

fn alert(
    item: &InventoryItem,
    kind: AlertKind,
    severity: AlertSeverity,
    payload: serde_json::Value,
) -> StockAlert {
    StockAlert {
        kind,
        severity,
        tenant_id: item.tenant_id,
        entity_id: item.id,
        sku: item.sku.clone(),
        payload,
    }
}

/// Derive alerts from the item's current state as of `today`
pub fn evaluate(item: &mut InventoryItem, today: NaiveDate, rules: &StockConfig) -> Evaluation {
    let mut eval = Evaluation::default();

    if item.is_low_stock() {
        eval.alerts.push(alert(
            item,
            AlertKind::LowStock,
            AlertSeverity::Warning,
            json!({
                "current_stock": item.current_stock,
                "minimum_stock": item.minimum_stock,
                "available_stock": item.available_stock(),
            }),
        ));
    }

    if rules.alert_on_over_reservation && item.is_over_reserved() {
        eval.alerts.push(alert(
            item,
            AlertKind::OverReserved,
            AlertSeverity::Warning,
            json!({
                "current_stock": item.current_stock,
                "reserved_quantity": item.reserved_quantity,
            }),
        ));
    }

    if let (Some(expiry), Some(days)) = (item.expiry_date, item.days_until_expiry(today)) {
        if days < 0 {
            if item.status != ItemStatus::Expired {
                let previous = item.status;
                item.status = ItemStatus::Expired;
                eval.status_changed = true;
                eval.alerts.push(alert(
                    item,
                    AlertKind::Expired,
                    AlertSeverity::Critical,
                    json!({
                        "expiry_date": expiry,
                        "previous_status": previous.as_str(),
                        "current_stock": item.current_stock,
                    }),
                ));
            }
        } else if days <= rules.expiry_warning_days && rules.is_perishable(item.category) {
            eval.alerts.push(alert(
                item,
                AlertKind::ExpiringSoon,
                AlertSeverity::Warning,
                json!({
                    "expiry_date": expiry,
                    "days_until_expiry": days,
                }),
            ));
        }
    }

    eval
}
