//! Preparation (cutting) order models and material usage records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// A preparation order cuts or portions materials for a pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparationOrder {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub pattern_id: Uuid,
    pub status: PreparationStatus,
    /// Raw usage entries as recorded by the category-specific forms
    pub materials_used: Vec<serde_json::Value>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Status of a preparation order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PreparationStatus {
    Draft,
    InProgress,
    Completed,
    Cancelled,
}

impl PreparationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreparationStatus::Draft => "draft",
            PreparationStatus::InProgress => "in_progress",
            PreparationStatus::Completed => "completed",
            PreparationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PreparationStatus::Draft),
            "in_progress" => Some(PreparationStatus::InProgress),
            "completed" => Some(PreparationStatus::Completed),
            "cancelled" => Some(PreparationStatus::Cancelled),
            _ => None,
        }
    }

    /// Completion is allowed once, from a non-terminal status
    pub fn can_complete(&self) -> bool {
        matches!(self, PreparationStatus::Draft | PreparationStatus::InProgress)
    }
}

impl std::fmt::Display for PreparationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated usage entry: how much of one material an order consumed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialUsage {
    pub material_id: Uuid,
    pub quantity: Decimal,
    pub unit: Option<String>,
}

/// Why a raw usage entry was skipped
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsageEntryError {
    #[error("usage entry is not an object")]
    NotAnObject,
    #[error("usage entry has no material reference")]
    MissingMaterial,
    #[error("usage entry has an unreadable material reference: {0}")]
    InvalidMaterial(String),
    #[error("usage entry has no quantity")]
    MissingQuantity,
    #[error("usage entry has an unreadable quantity: {0}")]
    InvalidQuantity(String),
    #[error("usage entry has a negative quantity: {0}")]
    NegativeQuantity(String),
}

impl MaterialUsage {
    /// Parse one free-form usage entry.
    ///
    /// Garment forms write `material_id`, food forms historically wrote
    /// `ingredient_id`; quantities arrive as numbers or strings, and may be
    /// named `quantity` or `qty`.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, UsageEntryError> {
        let obj = value.as_object().ok_or(UsageEntryError::NotAnObject)?;

        let material = ["material_id", "ingredient_id"]
            .iter()
            .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
            .ok_or(UsageEntryError::MissingMaterial)?;
        let material_id = material
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| UsageEntryError::InvalidMaterial(material.to_string()))?;

        let quantity = ["quantity", "qty"]
            .iter()
            .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
            .ok_or(UsageEntryError::MissingQuantity)?;
        let quantity = match quantity {
            serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
            serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .ok(),
            _ => None,
        }
        .ok_or_else(|| UsageEntryError::InvalidQuantity(quantity.to_string()))?;

        if quantity.is_sign_negative() {
            return Err(UsageEntryError::NegativeQuantity(quantity.to_string()));
        }

        let unit = obj.get("unit").and_then(|v| v.as_str()).map(str::to_string);

        Ok(MaterialUsage {
            material_id,
            quantity,
            unit,
        })
    }
}

/// Result of parsing an order's usage list: the good entries plus the skipped ones
#[derive(Debug, Clone, Default)]
pub struct ParsedUsage {
    pub entries: Vec<MaterialUsage>,
    pub skipped: Vec<(usize, UsageEntryError)>,
}

impl PreparationOrder {
    /// Parse every recorded usage entry, keeping position of the malformed ones
    pub fn parsed_usage(&self) -> ParsedUsage {
        let mut parsed = ParsedUsage::default();
        for (idx, raw) in self.materials_used.iter().enumerate() {
            match MaterialUsage::from_value(raw) {
                Ok(entry) => parsed.entries.push(entry),
                Err(e) => parsed.skipped.push((idx, e)),
            }
        }
        parsed
    }

    /// Usage only counts once the order is completed
    pub fn is_authoritative(&self) -> bool {
        self.status == PreparationStatus::Completed
    }
}
