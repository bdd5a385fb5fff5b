//! # Sale Repository
//!
//! Read-side database operations for sales.
//!
//! Creating, editing and deleting a sale moves stock, so those live in
//! [`crate::engine::StockEngine`].
//!
//! ## Range Filters
//! ```text
//! DateRange { start ..= end }  ──►  date >= start 00:00Z AND date < end+1 00:00Z
//! ```

use sqlx::{Executor, Sqlite, SqlitePool};
use tally_core::{DateRange, Money, Sale, SaleLine};

use crate::error::{DbError, DbResult};

/// Fetches a sale with any executor (pool or open transaction).
pub(crate) async fn fetch_sale<'e, E>(executor: E, id: &str) -> DbResult<Option<Sale>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sale = sqlx::query_as::<_, Sale>(
        r#"
        SELECT id, product_id, quantity, total_price_cents, date
        FROM sales
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(sale)
}

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        fetch_sale(&self.pool, id).await
    }

    /// Gets a sale by its ID, failing with `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Sale> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Lists sales, newest first.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, product_id, quantity, total_price_cents, date
            FROM sales
            ORDER BY date DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists the sales of one product, newest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, product_id, quantity, total_price_cents, date
            FROM sales
            WHERE product_id = ?1
            ORDER BY date DESC, id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Σ total_price over sales dated in `range` (zero when none).
    pub async fn revenue_in_range(&self, range: DateRange) -> DbResult<Money> {
        let (from, until) = range.bounds_utc();

        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_price_cents), 0)
            FROM sales
            WHERE date >= ?1 AND date < ?2
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }

    /// Σ quantity × current buying price over sales dated in `range`.
    pub async fn cogs_in_range(&self, range: DateRange) -> DbResult<Money> {
        let (from, until) = range.bounds_utc();

        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(s.quantity * p.buying_price_cents), 0)
            FROM sales s
            INNER JOIN products p ON p.id = s.product_id
            WHERE s.date >= ?1 AND s.date < ?2
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }

    /// Every sale with its product's current buying price, for aggregation.
    pub async fn lines(&self) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(
            r#"
            SELECT s.date, s.quantity, s.total_price_cents, p.buying_price_cents
            FROM sales s
            INNER JOIN products p ON p.id = s.product_id
            ORDER BY s.date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Counts sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
