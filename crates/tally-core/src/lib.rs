//! # tally-core: Pure Business Logic for Tally
//!
//! This crate is the **heart** of Tally. It contains the stock rules, period
//! bucketing and profit derivation as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Presentation (HTTP / CSV / dashboard)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          tally-db (ledger store, stock engine, reports)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌───────────┐ ┌────────┐ │   │
//! │  │   │  types  │ │  money  │ │  stock  │ │ aggregate │ │ report │ │   │
//! │  │   │ Product │ │  Money  │ │  rules  │ │  buckets  │ │ P & L  │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └───────────┘ └────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO LOGGING • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Ledger records (Product, Sale, Purchase, Expense)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types and logical error kinds
//! - [`validation`] - Input validation
//! - [`stock`] - Stock transitions for sale and purchase commits
//! - [`period`] - Granularities, period truncation and date range resolution
//! - [`aggregate`] - Period-bucketed revenue / COGS / expense / profit
//! - [`report`] - Financial report derivation
//! - [`clock`] - Injectable source of "now"
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::stock::apply_sale;
//!
//! // 3 units at $10.00
//! let total = Money::from_cents(1000).multiply_quantity(3);
//! assert_eq!(total.cents(), 3000);
//!
//! // Selling 3 of 10 units leaves 7
//! assert_eq!(apply_sale("p-1", 10, None, 3).unwrap(), 7);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod money;
pub mod period;
pub mod report;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregate::{MonthlySales, PeriodBucket, ProfitQuery, ProfitSummary, ProfitTotals};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use period::{DateRange, Granularity};
pub use report::{FinancialReport, ReportPeriod, ReportTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Upper bound for a product's stock level.
///
/// Every commit that would leave a product above this value is rejected with
/// [`CoreError::StockLimitExceeded`].
pub const MAX_STOCK: i64 = 1_000_000;

/// Upper bound, in cents, for a unit price or an expense amount.
///
/// Keeps `MAX_STOCK` units at the highest price well inside `i64` cents.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000;

/// Maximum length of product names, brands and expense titles.
pub const MAX_TEXT_LEN: usize = 100;
