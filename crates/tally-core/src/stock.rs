//! # Stock Rules
//!
//! Pure stock transitions applied by the stock engine once it holds the
//! product lock. Each function takes the stock it read under the lock and
//! returns the stock to write, or the reason the commit must abort.
//!
//! ## Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale create            stock − qty          InsufficientStock         │
//! │  Sale update (Δ > 0)    stock − Δ            InsufficientStock         │
//! │  Sale update (Δ < 0)    stock + |Δ|          StockLimitExceeded        │
//! │  Sale delete            stock + qty          StockLimitExceeded        │
//! │                                                                         │
//! │  Purchase create        stock + qty          StockLimitExceeded        │
//! │  Purchase update        stock + Δ            NegativeStock / Limit     │
//! │  Purchase reassign      old − old_qty        NegativeStock             │
//! │                         new + new_qty        StockLimitExceeded        │
//! │  Purchase delete        stock − qty          NegativeStock             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every successful result lies in `0..=MAX_STOCK`.

use crate::error::{CoreError, CoreResult};
use crate::MAX_STOCK;

/// Applies a signed change to a stock level.
///
/// ## Errors
/// - [`CoreError::NegativeStock`] if the result is below zero
/// - [`CoreError::StockLimitExceeded`] if the result is above `MAX_STOCK`
///
/// A change too large to represent at all fails the same way, with
/// `resulting` saturated at the `i64` bound.
pub fn adjust(product_id: &str, stock: i64, change: i64) -> CoreResult<i64> {
    let resulting = stock.saturating_add(change);

    if resulting < 0 {
        return Err(CoreError::NegativeStock {
            product_id: product_id.to_string(),
            stock,
            change,
        });
    }

    if resulting > MAX_STOCK {
        return Err(CoreError::StockLimitExceeded {
            product_id: product_id.to_string(),
            resulting,
            limit: MAX_STOCK,
        });
    }

    Ok(resulting)
}

/// Stock after committing a sale of `requested` units.
///
/// `previous` is the quantity already recorded on the sale being updated,
/// `None` for a new sale. Those units are already out of stock, so only the
/// difference is taken (or given back).
///
/// ## Example
/// ```rust
/// use tally_core::stock::apply_sale;
///
/// assert_eq!(apply_sale("p", 10, None, 3).unwrap(), 7);
/// // Raising a recorded sale from 3 to 5 takes 2 more units
/// assert_eq!(apply_sale("p", 7, Some(3), 5).unwrap(), 5);
/// // Lowering it from 5 to 1 returns 4
/// assert_eq!(apply_sale("p", 5, Some(5), 1).unwrap(), 9);
/// assert!(apply_sale("p", 2, None, 3).is_err());
/// ```
pub fn apply_sale(
    product_id: &str,
    stock: i64,
    previous: Option<i64>,
    requested: i64,
) -> CoreResult<i64> {
    let delta = requested.saturating_sub(previous.unwrap_or(0));

    if delta > 0 && stock < delta {
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            available: stock,
            requested: delta,
        });
    }

    adjust(product_id, stock, delta.saturating_neg())
}

/// Stock after committing a purchase of `quantity` units on the same
/// product. `previous` is the quantity already recorded on the purchase
/// being updated.
pub fn apply_purchase(
    product_id: &str,
    stock: i64,
    previous: Option<i64>,
    quantity: i64,
) -> CoreResult<i64> {
    adjust(product_id, stock, quantity.saturating_sub(previous.unwrap_or(0)))
}

/// Stock of both products after moving a purchase from one to the other.
///
/// The old product gives back the old quantity, the new product receives
/// the new quantity. Returns `(old_product_stock, new_product_stock)`.
pub fn reassign_purchase(
    old_product_id: &str,
    old_stock: i64,
    old_quantity: i64,
    new_product_id: &str,
    new_stock: i64,
    new_quantity: i64,
) -> CoreResult<(i64, i64)> {
    let old_resulting = adjust(old_product_id, old_stock, old_quantity.saturating_neg())?;
    let new_resulting = adjust(new_product_id, new_stock, new_quantity)?;
    Ok((old_resulting, new_resulting))
}

/// Stock after deleting a sale: its units go back on the shelf.
pub fn revert_sale(product_id: &str, stock: i64, quantity: i64) -> CoreResult<i64> {
    adjust(product_id, stock, quantity)
}

/// Stock after deleting a purchase: its units are taken back out.
pub fn revert_purchase(product_id: &str, stock: i64, quantity: i64) -> CoreResult<i64> {
    adjust(product_id, stock, quantity.saturating_neg())
}

// =============================================================================
// Unit Tests
// =============================================================================
