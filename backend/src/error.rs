//! Error handling for the Workshop ERP stock core
//!
//! Validation-class errors are returned to the request boundary as rejected
//! operations. Data-integrity problems (clamped deductions, malformed usage
//! records) never reach this type: they are logged and absorbed where they occur.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Stock errors
    #[error("Insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Invalid transition for {entity}: {from} -> {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("Capacity exceeded at {location}: requested {requested}, available {available}")]
    CapacityExceeded {
        location: String,
        requested: Decimal,
        available: Decimal,
    },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_transition(
        entity: impl Into<String>,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        AppError::InvalidTransition {
            entity: entity.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::MigrationError(_) => "MIGRATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Errors the caller caused and can correct
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::InsufficientStock { .. }
                | AppError::InvalidTransition { .. }
                | AppError::CapacityExceeded { .. }
                | AppError::Validation { .. }
                | AppError::Conflict(_)
                | AppError::NotFound(_)
        )
    }

    /// Serializable detail for the request boundary.
    ///
    /// Infrastructure errors are reported generically; their cause is logged.
    pub fn detail(&self) -> ErrorDetail {
        let field = match self {
            AppError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };

        let message = if self.is_validation() {
            self.to_string()
        } else {
            tracing::error!(error = ?self, "Internal failure");
            match self {
                AppError::DatabaseError(_) | AppError::MigrationError(_) => {
                    "A database error occurred".to_string()
                }
                _ => "An internal error occurred".to_string(),
            }
        };

        ErrorDetail {
            code: self.code().to_string(),
            message,
            field,
        }
    }
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        ErrorResponse {
            error: err.detail(),
        }
    }
}

/// Result type alias for services
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_carry_field() {
        let err = AppError::validation("quantity", "Quantity must be positive");
        let detail = err.detail();
        assert_eq!(detail.code, "VALIDATION_ERROR");
        assert_eq!(detail.field.as_deref(), Some("quantity"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = AppError::InsufficientStock {
            sku: "JAM-250".to_string(),
            requested: Decimal::from(5),
            available: Decimal::from(3),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for JAM-250: requested 5, available 3"
        );
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let err = AppError::Internal("connection string has password".to_string());
        assert!(!err.is_validation());
        let detail = err.detail();
        assert_eq!(detail.message, "An internal error occurred");
    }

    #[test]
    fn test_error_response_serializes_without_empty_field() {
        let resp = ErrorResponse::from(AppError::NotFound("Sales order".to_string()));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert!(json["error"].get("field").is_none());
    }
}
