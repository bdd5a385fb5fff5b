//! # tally-db: Storage, Stock Engine and Reports for Tally
//!
//! SQLite-backed ledger of products, sales, purchases and expenses, built
//! on sqlx. Owns every stock mutation and every report query.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Data Flow                                │
//! │                                                                         │
//! │  Presentation layer (HTTP, CLI, CSV export...)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌───────────────┐  ┌───────────────────┐  │   │
//! │  │   │  StockEngine  │  │ ReportService │  │   Repositories    │  │   │
//! │  │   │  (engine.rs)  │  │  (report.rs)  │  │  product, sale,   │  │   │
//! │  │   │ commit_sale   │  │ build_report  │  │  purchase,        │  │   │
//! │  │   │ commit_purch. │  │ aggregate     │  │  expense          │  │   │
//! │  │   └───────┬───────┘  └───────┬───────┘  └─────────┬─────────┘  │   │
//! │  │           └──────────────────┼────────────────────┘            │   │
//! │  │                              ▼                                 │   │
//! │  │                 Database (pool.rs) + migrations                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                          ▲                                      │
//! │       ▼                          │ pure rules                           │
//! │  SQLite (WAL)              tally-core (stock, period, aggregate)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - TOML/env configuration and tracing setup
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`engine`] - Transactional sale/purchase commits
//! - [`report`] - Financial reports and profit aggregation
//! - [`repository`] - Repository implementations (product, sale, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, LedgerConfig};
//!
//! let config = LedgerConfig::load_or_default(None);
//! config.init_tracing();
//!
//! let db = Database::new(config.db_config()).await?;
//!
//! let sale = db.stock().commit_sale(&product_id, 3, None).await?;
//! let report = db.reports().build_report("weekly", Some(2024), None, Some(30)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod report;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, LedgerConfig};
pub use engine::StockEngine;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use report::{LedgerTotals, ReportService};

// Repository re-exports for convenience
pub use repository::expense::ExpenseRepository;
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::sale::SaleRepository;
