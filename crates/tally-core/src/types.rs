//! # Domain Types
//!
//! Ledger records used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Records                                  │
//! │                                                                         │
//! │  ┌─────────────────────┐                                               │
//! │  │      Product        │◄──────────┬───────────────────┐               │
//! │  │  ─────────────────  │           │ product_id (FK)   │ product_id    │
//! │  │  id (UUID)          │  ┌────────┴────────┐ ┌────────┴────────┐      │
//! │  │  name, brand        │  │      Sale       │ │    Purchase     │      │
//! │  │  stock              │  │  quantity       │ │  quantity       │      │
//! │  │  buying_price_cents │  │  total_price    │ │  total_cost     │      │
//! │  │  selling_price_cents│  │  date           │ │  date           │      │
//! │  └─────────────────────┘  └─────────────────┘ └─────────────────┘      │
//! │                                                                         │
//! │  ┌─────────────────┐   Standalone: no relation to products             │
//! │  │    Expense      │                                                   │
//! │  │  title, amount  │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived Fields
//! `Sale.total_price_cents` and `Purchase.total_cost_cents` are never
//! supplied by callers. They are computed at commit time from the product's
//! *current* prices, including on updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product kept in stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name (non-empty).
    pub name: String,

    /// Brand, may be empty.
    pub brand: String,

    /// Units on hand, always within `0..=MAX_STOCK`.
    pub stock: i64,

    /// Units on hand when the product was created.
    pub opening_stock: i64,

    /// Cost per unit in cents.
    pub buying_price_cents: i64,

    /// Price per unit in cents, never below the buying price.
    pub selling_price_cents: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the buying price as Money.
    #[inline]
    pub fn buying_price(&self) -> Money {
        Money::from_cents(self.buying_price_cents)
    }

    /// Returns the selling price as Money.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Value of the units on hand at buying price.
    pub fn stock_value_at_cost(&self) -> Money {
        self.buying_price().multiply_quantity(self.stock)
    }

    /// Value of the units on hand at selling price.
    pub fn stock_value_at_retail(&self) -> Money {
        self.selling_price().multiply_quantity(self.stock)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub brand: String,
    /// Opening stock (defaults to zero).
    #[serde(default)]
    pub stock: i64,
    pub buying_price_cents: i64,
    pub selling_price_cents: i64,
}

/// Editable product fields. Stock is deliberately absent: it only moves
/// through sale and purchase commits.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: String,
    #[serde(default)]
    pub brand: String,
    pub buying_price_cents: i64,
    pub selling_price_cents: i64,
}

// =============================================================================
// Sale
// =============================================================================

/// Units sold out of stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    /// quantity × selling price at the last commit.
    pub total_price_cents: i64,
    /// Set at creation, never changed.
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

impl Sale {
    /// Returns the total price as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// Units bought into stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    /// quantity × buying price at the last commit.
    pub total_cost_cents: i64,
    /// Set at creation, never changed.
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

impl Purchase {
    /// Returns the total cost as Money.
    #[inline]
    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.total_cost_cents)
    }
}

// =============================================================================
// Expense
// =============================================================================

/// An operating expense (rent, wages, utilities...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub title: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

impl Expense {
    /// Returns the amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Input for creating or editing an expense.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseInput {
    pub title: String,
    pub amount_cents: i64,
}

// =============================================================================
// Aggregation Lines
// =============================================================================

/// A sale as seen by the aggregator.
///
/// `buying_price_cents` is the product's buying price *at aggregation time*,
/// not at the time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub date: DateTime<Utc>,
    pub quantity: i64,
    pub total_price_cents: i64,
    pub buying_price_cents: i64,
}

impl SaleLine {
    /// Revenue recorded by this sale.
    #[inline]
    pub fn revenue(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    /// Cost of the goods sold, at the current buying price.
    #[inline]
    pub fn cogs(&self) -> Money {
        Money::from_cents(self.buying_price_cents).multiply_quantity(self.quantity)
    }
}

/// An expense as seen by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ExpenseLine {
    pub date: DateTime<Utc>,
    pub amount_cents: i64,
}

impl ExpenseLine {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Stock Statistics
// =============================================================================

/// Summed purchases for a date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseTotals {
    pub total_cost: Money,
    pub total_quantity: i64,
}

/// Snapshot of what is on the shelves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockSummary {
    pub product_count: i64,
    pub total_units: i64,
    pub value_at_cost: Money,
    pub value_at_retail: Money,
    /// Threshold used for `low_stock`.
    pub low_stock_threshold: i64,
    /// Products with `stock <= low_stock_threshold`, lowest first.
    pub low_stock: Vec<Product>,
}

impl StockSummary {
    /// Builds a summary from the full product list.
    pub fn from_products(products: &[Product], low_stock_threshold: i64) -> Self {
        let mut low_stock: Vec<Product> = products
            .iter()
            .filter(|p| p.stock <= low_stock_threshold)
            .cloned()
            .collect();
        low_stock.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));

        StockSummary {
            product_count: products.len() as i64,
            total_units: products.iter().map(|p| p.stock).sum(),
            value_at_cost: products.iter().map(Product::stock_value_at_cost).sum(),
            value_at_retail: products.iter().map(Product::stock_value_at_retail).sum(),
            low_stock_threshold,
            low_stock,
        }
    }
}

/// A product whose stock disagrees with its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMismatch {
    pub product_id: String,
    /// Value stored on the product row.
    pub recorded: i64,
    /// opening + Σ purchases − Σ sales.
    pub expected: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
