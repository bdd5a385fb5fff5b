//! # Repository Module
//!
//! Database repository implementations for the ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │  db.products().create(input)                                   │
//! │       ▼                                                                 │
//! │  ProductRepository / SaleRepository / PurchaseRepository /             │
//! │  ExpenseRepository                                                     │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Sale and purchase WRITES are not here: they move stock and belong to  │
//! │  the stock engine (crate::engine), which reuses the fetch helpers      │
//! │  below inside its transactions.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD, stock summary, reconciliation
//! - [`sale::SaleRepository`] - Sale reads, range sums, aggregation lines
//! - [`purchase::PurchaseRepository`] - Purchase reads and range sums
//! - [`expense::ExpenseRepository`] - Expense CRUD, range sums, aggregation lines

pub mod expense;
pub mod product;
pub mod purchase;
pub mod sale;

use uuid::Uuid;

/// Generates a new record ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
