//! Production order models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A production run, made in-house or contracted out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub pattern_id: Uuid,
    pub mode: ProductionMode,
    pub status: ProductionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who produces the goods
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ProductionMode {
    InHouse,
    Contracted { contractor: String },
}

impl ProductionMode {
    pub fn is_contracted(&self) -> bool {
        matches!(self, ProductionMode::Contracted { .. })
    }
}

/// Status of a production order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatus {
    Draft,
    /// Handed to the contractor
    Sent,
    InProgress,
    Completed,
    Cancelled,
}

impl ProductionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStatus::Draft => "draft",
            ProductionStatus::Sent => "sent",
            ProductionStatus::InProgress => "in_progress",
            ProductionStatus::Completed => "completed",
            ProductionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ProductionStatus::Draft),
            "sent" => Some(ProductionStatus::Sent),
            "in_progress" => Some(ProductionStatus::InProgress),
            "completed" => Some(ProductionStatus::Completed),
            "cancelled" => Some(ProductionStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProductionOrder {
    /// Check whether the order may move to `to` given its mode
    pub fn can_transition_to(&self, to: ProductionStatus) -> bool {
        use ProductionStatus::*;
        match (self.status, to) {
            (Draft, Sent) => self.mode.is_contracted(),
            (Draft, InProgress) => !self.mode.is_contracted(),
            (Sent, InProgress) => true,
            (Sent | InProgress, Completed) => true,
            (Draft | Sent | InProgress, Cancelled) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(mode: ProductionMode, status: ProductionStatus) -> ProductionOrder {
        ProductionOrder {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            pattern_id: Uuid::new_v4(),
            mode,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_draft_contracted_orders_can_be_sent() {
        let contracted = ProductionMode::Contracted {
            contractor: "Sewing Co-op".to_string(),
        };
        assert!(order(contracted.clone(), ProductionStatus::Draft).can_transition_to(ProductionStatus::Sent));
        assert!(!order(contracted, ProductionStatus::InProgress).can_transition_to(ProductionStatus::Sent));
        assert!(!order(ProductionMode::InHouse, ProductionStatus::Draft).can_transition_to(ProductionStatus::Sent));
    }

    #[test]
    fn test_terminal_statuses_are_final() {
        for status in [ProductionStatus::Completed, ProductionStatus::Cancelled] {
            let o = order(ProductionMode::InHouse, status);
            for to in [
                ProductionStatus::Draft,
                ProductionStatus::Sent,
                ProductionStatus::InProgress,
                ProductionStatus::Completed,
                ProductionStatus::Cancelled,
            ] {
                assert!(!o.can_transition_to(to));
            }
        }
    }
}
