//! # Validation Module
//!
//! Input validation for ledger mutations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (presentation layer)                                  │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE, before any transaction starts                   │
//! │  ├── Text length, required fields                                      │
//! │  └── Price ordering, positive quantities and amounts                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Stock rules (crate::stock), under the product lock           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign keys (ON DELETE CASCADE)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_prices, validate_quantity};
//!
//! validate_prices(500, 1000).unwrap();
//! validate_quantity(5).unwrap();
//! assert!(validate_prices(1000, 500).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{ExpenseInput, NewProduct, ProductUpdate};
use crate::{MAX_AMOUNT_CENTS, MAX_STOCK, MAX_TEXT_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, required: bool) -> ValidationResult<()> {
    let value = value.trim();

    if required && value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - At most `MAX_TEXT_LEN` characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Basmati Rice 5kg").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, true)
}

/// Validates a brand. Empty brands are allowed.
pub fn validate_brand(brand: &str) -> ValidationResult<()> {
    validate_text("brand", brand, false)
}

/// Validates an expense title.
pub fn validate_expense_title(title: &str) -> ValidationResult<()> {
    validate_text("title", title, true)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity on a sale or purchase.
///
/// Only positivity is checked here. Whether the quantity fits the product's
/// stock is decided under the product lock by [`crate::stock`].
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a product's opening stock.
pub fn validate_opening_stock(stock: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK).contains(&stock) {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_STOCK,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed, `MAX_AMOUNT_CENTS` is the
/// ceiling.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a buying/selling price pair.
///
/// ## Rules
/// - Both prices non-negative
/// - Selling price not below buying price
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_prices;
///
/// assert!(validate_prices(0, 0).is_ok());
/// assert!(validate_prices(500, 500).is_ok());
/// assert!(validate_prices(-1, 500).is_err());
/// assert!(validate_prices(600, 500).is_err());
/// ```
pub fn validate_prices(buying_cents: i64, selling_cents: i64) -> ValidationResult<()> {
    validate_price_cents("buying_price", buying_cents)?;
    validate_price_cents("selling_price", selling_cents)?;

    if selling_cents < buying_cents {
        return Err(ValidationError::SellingBelowBuying {
            selling_cents,
            buying_cents,
        });
    }

    Ok(())
}

/// Validates an expense amount in cents. Must be strictly positive and at
/// most `MAX_AMOUNT_CENTS`.
pub fn validate_expense_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a calendar month (1-12).
pub fn validate_month(month: u32) -> ValidationResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        });
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates everything about a new product that can be checked without
/// touching storage.
pub fn validate_new_product(input: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&input.name)?;
    validate_brand(&input.brand)?;
    validate_prices(input.buying_price_cents, input.selling_price_cents)?;
    validate_opening_stock(input.stock)
}

/// Validates a product edit.
pub fn validate_product_update(input: &ProductUpdate) -> ValidationResult<()> {
    validate_product_name(&input.name)?;
    validate_brand(&input.brand)?;
    validate_prices(input.buying_price_cents, input.selling_price_cents)
}

/// Validates a new or edited expense.
pub fn validate_expense(input: &ExpenseInput) -> ValidationResult<()> {
    validate_expense_title(&input.title)?;
    validate_expense_amount(input.amount_cents)
}

// =============================================================================
// Unit Tests
// =============================================================================
