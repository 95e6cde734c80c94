//! Common types used across the platform

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant filter threaded through every persistence call.
///
/// Request-driven workflows always run with [`TenantScope::Tenant`]. Only
/// maintenance tooling is allowed to pass [`TenantScope::Unscoped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantScope {
    Tenant(Uuid),
    Unscoped,
}

impl TenantScope {
    /// Tenant id to bind into a query, `None` when unscoped
    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            TenantScope::Tenant(id) => Some(*id),
            TenantScope::Unscoped => None,
        }
    }

    pub fn is_unscoped(&self) -> bool {
        matches!(self, TenantScope::Unscoped)
    }
}

impl From<Uuid> for TenantScope {
    fn from(id: Uuid) -> Self {
        TenantScope::Tenant(id)
    }
}

impl std::fmt::Display for TenantScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenantScope::Tenant(id) => write!(f, "tenant:{}", id),
            TenantScope::Unscoped => write!(f, "unscoped"),
        }
    }
}

/// Business category of a tenant or an inventory item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BusinessCategory {
    Garment,
    Food,
    Craft,
    Cosmetic,
    #[default]
    Other,
}

impl BusinessCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessCategory::Garment => "garment",
            BusinessCategory::Food => "food",
            BusinessCategory::Craft => "craft",
            BusinessCategory::Cosmetic => "cosmetic",
            BusinessCategory::Other => "other",
        }
    }

    /// Unknown values fall back to [`BusinessCategory::Other`]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "garment" => BusinessCategory::Garment,
            "food" => BusinessCategory::Food,
            "craft" => BusinessCategory::Craft,
            "cosmetic" => BusinessCategory::Cosmetic,
            _ => BusinessCategory::Other,
        }
    }

    /// Categories whose items carry a shelf life by default
    pub fn default_perishable() -> Vec<BusinessCategory> {
        vec![BusinessCategory::Food, BusinessCategory::Cosmetic]
    }
}

impl std::fmt::Display for BusinessCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
