//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Logical kind the presentation layer maps       │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → presentation            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is detected before a transaction writes anything, so a
//! returned error always means "nothing changed".

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced product, sale, purchase or expense does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A sale (or a sale quantity increase) asks for more units than are on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale update: quantity 3 → 8 (delta 5)
    ///      │
    ///      ▼
    /// Lock product, read stock: 2
    ///      │
    ///      ▼
    /// InsufficientStock { available: 2, requested: 5 }
    ///      │
    ///      ▼
    /// Transaction rolled back, sale keeps quantity 3
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// A purchase update, reassignment or deletion would leave a product
    /// with negative stock (the units were already sold).
    #[error("Stock for product {product_id} would become negative: stock {stock}, change {change}")]
    NegativeStock {
        product_id: String,
        stock: i64,
        change: i64,
    },

    /// The resulting stock would exceed [`crate::MAX_STOCK`].
    #[error("Stock limit exceeded for product {product_id}: resulting stock {resulting} exceeds {limit}")]
    StockLimitExceeded {
        product_id: String,
        resulting: i64,
        limit: i64,
    },

    /// Aggregation granularity is not daily/weekly/monthly/yearly.
    #[error("Invalid granularity '{0}'. Choose from daily, weekly, monthly, yearly")]
    InvalidGranularity(String),

    /// Report period type is not recognised.
    #[error("Invalid period type '{0}'. Choose from daily, weekly, monthly, yearly")]
    InvalidPeriodType(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the logical kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::NegativeStock { .. } => ErrorKind::NegativeStock,
            CoreError::StockLimitExceeded { .. } => ErrorKind::StockLimitExceeded,
            CoreError::InvalidGranularity(_) => ErrorKind::InvalidGranularity,
            CoreError::InvalidPeriodType(_) => ErrorKind::InvalidPeriodType,
            CoreError::Validation(_) => ErrorKind::InvalidInput,
        }
    }
}

// =============================================================================
// Error Kind
// =============================================================================

/// Logical error kinds, independent of transport.
///
/// ## Usage in a presentation layer
/// ```text
/// InvalidInput        → 400
/// InvalidGranularity  → 400
/// InvalidPeriodType   → 400
/// NotFound            → 404
/// InsufficientStock   → 409
/// NegativeStock       → 409
/// StockLimitExceeded  → 409
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidInput,
    InsufficientStock,
    NegativeStock,
    StockLimitExceeded,
    InvalidGranularity,
    InvalidPeriodType,
    NotFound,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any lock is taken.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Selling price is lower than buying price.
    #[error("selling_price ({selling_cents}) must not be less than buying_price ({buying_cents})")]
    SellingBelowBuying {
        selling_cents: i64,
        buying_cents: i64,
    },

    /// A field cannot be changed by this operation.
    #[error("{field} cannot be changed: {reason}")]
    Immutable { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-1: available 3, requested 5"
        );

        let err = CoreError::not_found("Product", "abc");
        assert_eq!(err.to_string(), "Product not found: abc");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_invalid_input() {
        let validation_err = ValidationError::Required {
            field: "title".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_error_kinds() {
        let err = CoreError::StockLimitExceeded {
            product_id: "p".into(),
            resulting: 1_000_006,
            limit: 1_000_000,
        };
        assert_eq!(err.kind(), ErrorKind::StockLimitExceeded);
        assert_eq!(
            CoreError::InvalidGranularity("hourly".into()).kind(),
            ErrorKind::InvalidGranularity
        );
        assert_eq!(
            CoreError::InvalidPeriodType("decade".into()).kind(),
            ErrorKind::InvalidPeriodType
        );
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
