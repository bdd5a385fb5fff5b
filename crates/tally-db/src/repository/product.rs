//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD (stock is never written here after creation)
//! - Stock summary for the dashboard
//! - Stock reconciliation against the sale and purchase ledger
//!
//! ## Stock Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create()  ──► stock = opening_stock                                   │
//! │  update()  ──► name, brand, prices only                                │
//! │                                                                         │
//! │  Every later stock change goes through StockEngine, under the product  │
//! │  lock, so at quiescence:                                               │
//! │                                                                         │
//! │    stock = opening_stock + Σ purchases.quantity − Σ sales.quantity     │
//! │                                                                         │
//! │  reconcile_stock() reports every product where that does not hold.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Executor, Sqlite, SqlitePool};
use std::sync::Arc;
use tally_core::validation::{validate_new_product, validate_product_update};
use tally_core::{Clock, NewProduct, Product, ProductUpdate, StockMismatch, StockSummary};
use tracing::debug;

use super::generate_id;
use crate::error::{DbError, DbResult};

/// Fetches a product with any executor (pool or open transaction).
pub(crate) async fn fetch_product<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT
            id, name, brand, stock, opening_stock,
            buying_price_cents, selling_price_cents,
            created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(product)
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let rice = repo.create(NewProduct { name: "Rice".into(), .. }).await?;
/// let summary = repo.stock_summary(5).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        ProductRepository { pool, clock }
    }

    /// Creates a product with its opening stock.
    ///
    /// ## Errors
    /// - `Domain(Validation)` - empty/long name, negative prices, selling
    ///   below buying, opening stock outside `0..=MAX_STOCK`
    pub async fn create(&self, input: NewProduct) -> DbResult<Product> {
        validate_new_product(&input)?;

        let now = self.clock.now();
        let product = Product {
            id: generate_id(),
            name: input.name.trim().to_string(),
            brand: input.brand.trim().to_string(),
            stock: input.stock,
            opening_stock: input.stock,
            buying_price_cents: input.buying_price_cents,
            selling_price_cents: input.selling_price_cents,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, stock = product.stock, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, brand, stock, opening_stock,
                buying_price_cents, selling_price_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(product.stock)
        .bind(product.opening_stock)
        .bind(product.buying_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        fetch_product(&self.pool, id).await
    }

    /// Gets a product by its ID, failing with `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Lists all products by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, brand, stock, opening_stock,
                buying_price_cents, selling_price_cents,
                created_at, updated_at
            FROM products
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates name, brand and prices. Stock is untouched.
    ///
    /// New prices apply to every later sale/purchase commit, including
    /// edits of existing ones.
    pub async fn update(&self, id: &str, input: ProductUpdate) -> DbResult<Product> {
        validate_product_update(&input)?;

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                brand = ?3,
                buying_price_cents = ?4,
                selling_price_cents = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.brand.trim())
        .bind(input.buying_price_cents)
        .bind(input.selling_price_cents)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get(id).await
    }

    /// Deletes a product together with its sales and purchases.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Units on hand, inventory value and low-stock products.
    pub async fn stock_summary(&self, low_stock_threshold: i64) -> DbResult<StockSummary> {
        let products = self.list().await?;
        Ok(StockSummary::from_products(&products, low_stock_threshold))
    }

    /// Returns every product whose stock disagrees with its ledger.
    ///
    /// Empty when the stock invariant holds.
    pub async fn reconcile_stock(&self) -> DbResult<Vec<StockMismatch>> {
        let mismatches = sqlx::query_as::<_, StockMismatch>(
            r#"
            SELECT product_id, recorded, expected
            FROM (
                SELECT
                    p.id AS product_id,
                    p.stock AS recorded,
                    p.opening_stock
                        + COALESCE((SELECT SUM(quantity) FROM purchases WHERE product_id = p.id), 0)
                        - COALESCE((SELECT SUM(quantity) FROM sales WHERE product_id = p.id), 0)
                        AS expected
                FROM products p
            )
            WHERE recorded <> expected
            ORDER BY product_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(mismatches)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use tally_core::{ErrorKind, NewProduct, ProductUpdate};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn rice(stock: i64) -> NewProduct {
        NewProduct {
            name: "  Rice 5kg ".into(),
            brand: "Tilda".into(),
            stock,
            buying_price_cents: 500,
            selling_price_cents: 1000,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = db().await;
        let created = db.products().create(rice(100)).await.unwrap();

        assert_eq!(created.name, "Rice 5kg");
        assert_eq!(created.stock, 100);
        assert_eq!(created.opening_stock, 100);

        let fetched = db.products().get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let db = db().await;

        let mut input = rice(0);
        input.selling_price_cents = 100;
        let err = db.products().create(input).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));

        let err = db.products().create(rice(1_000_001)).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));

        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_keeps_stock() {
        let db = db().await;
        let created = db.products().create(rice(42)).await.unwrap();

        let updated = db
            .products()
            .update(
                &created.id,
                ProductUpdate {
                    name: "Rice 10kg".into(),
                    brand: String::new(),
                    buying_price_cents: 900,
                    selling_price_cents: 1800,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Rice 10kg");
        assert_eq!(updated.selling_price_cents, 1800);
        assert_eq!(updated.stock, 42);
    }

    #[tokio::test]
    async fn test_missing_product() {
        let db = db().await;
        assert!(db.products().get_by_id("nope").await.unwrap().is_none());

        let err = db.products().get("nope").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));

        let err = db.products().delete("nope").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_stock_summary() {
        let db = db().await;
        db.products().create(rice(100)).await.unwrap();
        let mut low = rice(2);
        low.name = "Saffron".into();
        db.products().create(low).await.unwrap();

        let summary = db.products().stock_summary(5).await.unwrap();
        assert_eq!(summary.product_count, 2);
        assert_eq!(summary.total_units, 102);
        assert_eq!(summary.value_at_cost.cents(), 102 * 500);
        assert_eq!(summary.low_stock.len(), 1);
        assert_eq!(summary.low_stock[0].name, "Saffron");
    }

    #[tokio::test]
    async fn test_reconcile_detects_drift() {
        let db = db().await;
        let product = db.products().create(rice(10)).await.unwrap();
        assert!(db.products().reconcile_stock().await.unwrap().is_empty());

        // Simulate an out-of-band write
        sqlx::query("UPDATE products SET stock = 7 WHERE id = ?1")
            .bind(&product.id)
            .execute(db.pool())
            .await
            .unwrap();

        let mismatches = db.products().reconcile_stock().await.unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].product_id, product.id);
        assert_eq!(mismatches[0].recorded, 7);
        assert_eq!(mismatches[0].expected, 10);
    }
}
