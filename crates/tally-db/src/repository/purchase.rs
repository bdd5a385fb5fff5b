//! # Purchase Repository
//!
//! Read-side database operations for purchases. Writes go through
//! [`crate::engine::StockEngine`].

use sqlx::{Executor, Sqlite, SqlitePool};
use tally_core::{DateRange, Money, Purchase, PurchaseTotals};

use crate::error::{DbError, DbResult};

/// Fetches a purchase with any executor (pool or open transaction).
pub(crate) async fn fetch_purchase<'e, E>(executor: E, id: &str) -> DbResult<Option<Purchase>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let purchase = sqlx::query_as::<_, Purchase>(
        r#"
        SELECT id, product_id, quantity, total_cost_cents, date
        FROM purchases
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(purchase)
}

/// Repository for purchase reads.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Gets a purchase by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        fetch_purchase(&self.pool, id).await
    }

    /// Gets a purchase by its ID, failing with `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Purchase> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", id))
    }

    /// Lists purchases, newest first.
    pub async fn list(&self) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, product_id, quantity, total_cost_cents, date
            FROM purchases
            ORDER BY date DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }

    /// Σ total_cost and Σ quantity over purchases dated in `range`.
    pub async fn totals_in_range(&self, range: DateRange) -> DbResult<PurchaseTotals> {
        let (from, until) = range.bounds_utc();

        let (cost, quantity): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(total_cost_cents), 0),
                COALESCE(SUM(quantity), 0)
            FROM purchases
            WHERE date >= ?1 AND date < ?2
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;

        Ok(PurchaseTotals {
            total_cost: Money::from_cents(cost),
            total_quantity: quantity,
        })
    }

    /// Counts purchases.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
