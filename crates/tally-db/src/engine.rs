//! # Stock Mutation Engine
//!
//! Commits sales and purchases so that product stock always matches the
//! ledger, even under concurrent edits.
//!
//! ## Commit Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        One Commit = One Transaction                     │
//! │                                                                         │
//! │  validate input (no lock yet)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock product row(s), ascending id order                               │
//! │    UPDATE products SET updated_at = ? WHERE id = ?                     │
//! │    (first statement is a write: SQLite hands this transaction the      │
//! │     write lock, every later read sees the latest committed stock)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  read stock + prices ──► tally_core::stock rule ──► Err? ROLLBACK      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  write stock, write sale/purchase (totals from CURRENT prices)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A dropped, uncommitted transaction rolls back, so an error or a
//! cancelled call never leaves a partial write behind.
//!
//! ## Purchases That Move
//! A purchase's product can change. Editing or deleting one reads its
//! product first, locks, then re-reads it under the lock. If a concurrent
//! reassignment moved it to a product this transaction does not hold, the
//! transaction is rolled back and retried (at most [`MAX_LOCK_ATTEMPTS`]).

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::BTreeMap;
use std::sync::Arc;
use tally_core::stock;
use tally_core::validation::{validate_price_cents, validate_quantity};
use tally_core::{Clock, Product, Purchase, Sale, ValidationError};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use crate::repository::product::fetch_product;
use crate::repository::purchase::fetch_purchase;
use crate::repository::sale::fetch_sale;

/// Attempts at locking a purchase whose product keeps changing.
pub const MAX_LOCK_ATTEMPTS: u32 = 3;

// =============================================================================
// Locking Helpers
// =============================================================================

/// Locks the given products for the rest of the transaction and reads them.
///
/// Ids are locked in ascending order, so two transactions that need the same
/// pair of products always queue instead of deadlocking.
async fn lock_products(
    conn: &mut SqliteConnection,
    ids: &[&str],
    now: DateTime<Utc>,
) -> DbResult<BTreeMap<String, Product>> {
    let mut ordered = ids.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    for id in &ordered {
        let result = sqlx::query("UPDATE products SET updated_at = ?2 WHERE id = ?1")
            .bind(*id)
            .bind(now)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", *id));
        }
    }

    let mut locked = BTreeMap::new();
    for id in ordered {
        let product = fetch_product(&mut *conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;
        locked.insert(product.id.clone(), product);
    }

    Ok(locked)
}

fn locked<'a>(products: &'a BTreeMap<String, Product>, id: &str) -> DbResult<&'a Product> {
    products
        .get(id)
        .ok_or_else(|| DbError::Internal(format!("product {id} used without holding its lock")))
}

async fn write_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    stock: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(product_id)
        .bind(stock)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// A purchase read under the lock of every product it involves.
struct LockedPurchase {
    tx: Transaction<'static, Sqlite>,
    purchase: Purchase,
    products: BTreeMap<String, Product>,
    now: DateTime<Utc>,
}

// =============================================================================
// Stock Engine
// =============================================================================

/// Transactional sale and purchase commits.
///
/// ## Usage
/// ```rust,ignore
/// let engine = db.stock();
///
/// let sale = engine.commit_sale(&product.id, 3, None).await?;
/// let sale = engine.commit_sale(&product.id, 5, Some(&sale.id)).await?;
///
/// let purchase = engine.commit_purchase(&a.id, 10, None, None).await?;
/// // Move it to product b with 4 units
/// engine.commit_purchase(&a.id, 4, Some(&purchase.id), Some(&b.id)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StockEngine {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl StockEngine {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        StockEngine { pool, clock }
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Creates a sale, or updates the quantity of `existing_sale_id`.
    ///
    /// ## Rules
    /// - Create: `quantity` units leave stock
    /// - Update: only the difference from the recorded quantity moves
    /// - `total_price` = quantity × the product's current selling price,
    ///   recomputed on every commit
    /// - A sale stays on its product: naming another product is invalid
    ///
    /// ## Errors
    /// - `InvalidInput` - quantity not positive, or product differs from the sale's
    /// - `NotFound` - unknown product or sale
    /// - `InsufficientStock` - not enough units for the (additional) quantity
    /// - `StockLimitExceeded` - units handed back would overflow the limit
    pub async fn commit_sale(
        &self,
        product_id: &str,
        quantity: i64,
        existing_sale_id: Option<&str>,
    ) -> DbResult<Sale> {
        validate_quantity(quantity)?;

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let products = lock_products(&mut tx, &[product_id], now).await?;
        let product = locked(&products, product_id)?;

        let previous = match existing_sale_id {
            Some(sale_id) => {
                let sale = fetch_sale(&mut *tx, sale_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

                if sale.product_id != product_id {
                    return Err(ValidationError::Immutable {
                        field: "product_id".to_string(),
                        reason: format!("sale {} belongs to product {}", sale.id, sale.product_id),
                    }
                    .into());
                }

                Some(sale)
            }
            None => None,
        };

        let new_stock = stock::apply_sale(
            product_id,
            product.stock,
            previous.as_ref().map(|s| s.quantity),
            quantity,
        )
        .inspect_err(|e| warn!(product_id = %product_id, error = %e, "Sale rejected"))?;

        let total_price = product.selling_price().multiply_quantity(quantity);
        write_stock(&mut tx, product_id, new_stock, now).await?;

        let sale = match previous {
            None => {
                let sale = Sale {
                    id: generate_id(),
                    product_id: product_id.to_string(),
                    quantity,
                    total_price_cents: total_price.cents(),
                    date: now,
                };

                sqlx::query(
                    r#"
                    INSERT INTO sales (id, product_id, quantity, total_price_cents, date)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(&sale.id)
                .bind(&sale.product_id)
                .bind(sale.quantity)
                .bind(sale.total_price_cents)
                .bind(sale.date)
                .execute(&mut *tx)
                .await?;

                sale
            }
            Some(existing) => {
                sqlx::query("UPDATE sales SET quantity = ?2, total_price_cents = ?3 WHERE id = ?1")
                    .bind(&existing.id)
                    .bind(quantity)
                    .bind(total_price.cents())
                    .execute(&mut *tx)
                    .await?;

                Sale {
                    quantity,
                    total_price_cents: total_price.cents(),
                    ..existing
                }
            }
        };

        tx.commit().await?;

        debug!(
            id = %sale.id,
            product_id = %product_id,
            quantity = quantity,
            stock = new_stock,
            total = %total_price,
            "Sale committed"
        );

        Ok(sale)
    }

    /// Deletes a sale and puts its units back in stock.
    pub async fn delete_sale(&self, sale_id: &str) -> DbResult<()> {
        let sale = fetch_sale(&self.pool, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let products = lock_products(&mut tx, &[sale.product_id.as_str()], now).await?;
        let product = locked(&products, &sale.product_id)?;

        // Re-read under the lock: a concurrent edit may have changed the quantity
        let sale = fetch_sale(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        let new_stock = stock::revert_sale(&product.id, product.stock, sale.quantity)
            .inspect_err(|e| warn!(sale_id = %sale_id, error = %e, "Sale deletion rejected"))?;

        write_stock(&mut tx, &product.id, new_stock, now).await?;
        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(id = %sale_id, product_id = %sale.product_id, stock = new_stock, "Sale deleted");
        Ok(())
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Creates a purchase, or updates `existing_purchase_id`.
    ///
    /// On update the purchase ends up on `new_product_id` if given, else on
    /// `product_id`. When that differs from its stored product, the old
    /// product gives back the old quantity and the new one receives the new
    /// quantity, in one transaction.
    ///
    /// `total_cost` = quantity × the final product's current buying price.
    ///
    /// ## Errors
    /// - `InvalidInput` - quantity not positive, negative buying price, or
    ///   `new_product_id` on a create
    /// - `NotFound` - unknown product or purchase
    /// - `NegativeStock` - removing units that were already sold
    /// - `StockLimitExceeded` - resulting stock above the limit
    pub async fn commit_purchase(
        &self,
        product_id: &str,
        quantity: i64,
        existing_purchase_id: Option<&str>,
        new_product_id: Option<&str>,
    ) -> DbResult<Purchase> {
        validate_quantity(quantity)?;

        match existing_purchase_id {
            Some(purchase_id) => {
                let target = new_product_id.unwrap_or(product_id);
                self.update_purchase(purchase_id, target, quantity).await
            }
            None if new_product_id.is_some() => Err(ValidationError::Immutable {
                field: "new_product_id".to_string(),
                reason: "only an existing purchase can be moved".to_string(),
            }
            .into()),
            None => self.create_purchase(product_id, quantity).await,
        }
    }

    async fn create_purchase(&self, product_id: &str, quantity: i64) -> DbResult<Purchase> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let products = lock_products(&mut tx, &[product_id], now).await?;
        let product = locked(&products, product_id)?;
        validate_price_cents("buying_price", product.buying_price_cents)?;

        let new_stock = stock::apply_purchase(product_id, product.stock, None, quantity)
            .inspect_err(|e| warn!(product_id = %product_id, error = %e, "Purchase rejected"))?;

        let purchase = Purchase {
            id: generate_id(),
            product_id: product_id.to_string(),
            quantity,
            total_cost_cents: product.buying_price().multiply_quantity(quantity).cents(),
            date: now,
        };

        write_stock(&mut tx, product_id, new_stock, now).await?;
        sqlx::query(
            r#"
            INSERT INTO purchases (id, product_id, quantity, total_cost_cents, date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.product_id)
        .bind(purchase.quantity)
        .bind(purchase.total_cost_cents)
        .bind(purchase.date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            id = %purchase.id,
            product_id = %product_id,
            quantity = quantity,
            stock = new_stock,
            "Purchase committed"
        );

        Ok(purchase)
    }

    async fn update_purchase(
        &self,
        purchase_id: &str,
        target_id: &str,
        quantity: i64,
    ) -> DbResult<Purchase> {
        let LockedPurchase {
            mut tx,
            purchase,
            products,
            now,
        } = self.lock_purchase(purchase_id, Some(target_id)).await?;

        let target = locked(&products, target_id)?;
        validate_price_cents("buying_price", target.buying_price_cents)?;

        if purchase.product_id == target_id {
            let new_stock =
                stock::apply_purchase(target_id, target.stock, Some(purchase.quantity), quantity)
                    .inspect_err(|e| warn!(id = %purchase_id, error = %e, "Purchase update rejected"))?;

            write_stock(&mut tx, target_id, new_stock, now).await?;
        } else {
            let source = locked(&products, &purchase.product_id)?;
            let (source_stock, target_stock) = stock::reassign_purchase(
                &source.id,
                source.stock,
                purchase.quantity,
                target_id,
                target.stock,
                quantity,
            )
            .inspect_err(|e| warn!(id = %purchase_id, error = %e, "Purchase reassignment rejected"))?;

            write_stock(&mut tx, &source.id, source_stock, now).await?;
            write_stock(&mut tx, target_id, target_stock, now).await?;

            debug!(
                id = %purchase_id,
                from = %source.id,
                to = %target_id,
                "Purchase reassigned"
            );
        }

        let total_cost = target.buying_price().multiply_quantity(quantity);
        sqlx::query(
            r#"
            UPDATE purchases
            SET product_id = ?2, quantity = ?3, total_cost_cents = ?4
            WHERE id = ?1
            "#,
        )
        .bind(purchase_id)
        .bind(target_id)
        .bind(quantity)
        .bind(total_cost.cents())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(id = %purchase_id, quantity = quantity, total = %total_cost, "Purchase updated");

        Ok(Purchase {
            product_id: target_id.to_string(),
            quantity,
            total_cost_cents: total_cost.cents(),
            ..purchase
        })
    }

    /// Deletes a purchase and takes its units back out of stock.
    pub async fn delete_purchase(&self, purchase_id: &str) -> DbResult<()> {
        let LockedPurchase {
            mut tx,
            purchase,
            products,
            now,
        } = self.lock_purchase(purchase_id, None).await?;

        let product = locked(&products, &purchase.product_id)?;
        let new_stock = stock::revert_purchase(&product.id, product.stock, purchase.quantity)
            .inspect_err(|e| warn!(id = %purchase_id, error = %e, "Purchase deletion rejected"))?;

        write_stock(&mut tx, &product.id, new_stock, now).await?;
        sqlx::query("DELETE FROM purchases WHERE id = ?1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(id = %purchase_id, product_id = %product.id, stock = new_stock, "Purchase deleted");
        Ok(())
    }

    /// Opens a transaction holding the lock of the purchase's current
    /// product (and of `extra`, if given), with the purchase re-read under
    /// those locks.
    async fn lock_purchase(
        &self,
        purchase_id: &str,
        extra: Option<&str>,
    ) -> DbResult<LockedPurchase> {
        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            let seen = fetch_purchase(&self.pool, purchase_id)
                .await?
                .ok_or_else(|| DbError::not_found("Purchase", purchase_id))?;

            let now = self.clock.now();
            let mut tx = self.pool.begin().await?;

            let mut ids = vec![seen.product_id.as_str()];
            ids.extend(extra);
            let products = lock_products(&mut tx, &ids, now).await?;

            let purchase = fetch_purchase(&mut *tx, purchase_id)
                .await?
                .ok_or_else(|| DbError::not_found("Purchase", purchase_id))?;

            if products.contains_key(&purchase.product_id) {
                return Ok(LockedPurchase {
                    tx,
                    purchase,
                    products,
                    now,
                });
            }

            warn!(
                id = %purchase_id,
                attempt = attempt,
                "Purchase moved to another product while locking, retrying"
            );
            tx.rollback().await?;
        }

        Err(DbError::TransactionFailed(format!(
            "purchase {purchase_id} kept moving between products"
        )))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use tally_core::{
        ErrorKind, FixedClock, NewProduct, Product, ProductUpdate, MAX_AMOUNT_CENTS, MAX_STOCK,
    };

    async fn db() -> Database {
        Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .with_clock(FixedClock::at_date(2024, 7, 24).unwrap())
    }

    async fn product(db: &Database, name: &str, stock: i64, buying: i64, selling: i64) -> Product {
        db.products()
            .create(NewProduct {
                name: name.into(),
                brand: String::new(),
                stock,
                buying_price_cents: buying,
                selling_price_cents: selling,
            })
            .await
            .unwrap()
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get(id).await.unwrap().stock
    }

    /// (stock, sales, purchases) for atomicity checks.
    async fn snapshot(db: &Database, id: &str) -> (i64, Vec<tally_core::Sale>, Vec<tally_core::Purchase>) {
        (
            stock_of(db, id).await,
            db.sales().list().await.unwrap(),
            db.purchases().list().await.unwrap(),
        )
    }

    #[tokio::test]
    async fn test_sale_round_trip() {
        let db = db().await;
        let a = product(&db, "A", 100, 500, 1000).await;

        let sale = db.stock().commit_sale(&a.id, 3, None).await.unwrap();
        assert_eq!(sale.total_price_cents, 3000);
        assert_eq!(stock_of(&db, &a.id).await, 97);

        let updated = db.stock().commit_sale(&a.id, 5, Some(sale.id.as_str())).await.unwrap();
        assert_eq!(updated.id, sale.id);
        assert_eq!(updated.total_price_cents, 5000);
        assert_eq!(updated.date, sale.date);
        assert_eq!(stock_of(&db, &a.id).await, 95);

        assert_eq!(db.sales().get(&sale.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_sale_update_uses_current_price() {
        let db = db().await;
        let a = product(&db, "A", 10, 500, 1000).await;
        let sale = db.stock().commit_sale(&a.id, 2, None).await.unwrap();

        db.products()
            .update(
                &a.id,
                ProductUpdate {
                    name: "A".into(),
                    brand: String::new(),
                    buying_price_cents: 500,
                    selling_price_cents: 1200,
                },
            )
            .await
            .unwrap();

        // Same quantity: stock untouched, total recomputed
        let updated = db.stock().commit_sale(&a.id, 2, Some(sale.id.as_str())).await.unwrap();
        assert_eq!(updated.total_price_cents, 2400);
        assert_eq!(stock_of(&db, &a.id).await, 8);
    }

    #[tokio::test]
    async fn test_sale_decrease_returns_units() {
        let db = db().await;
        let a = product(&db, "A", 10, 100, 100).await;
        let sale = db.stock().commit_sale(&a.id, 10, None).await.unwrap();
        assert_eq!(stock_of(&db, &a.id).await, 0);

        db.stock().commit_sale(&a.id, 4, Some(sale.id.as_str())).await.unwrap();
        assert_eq!(stock_of(&db, &a.id).await, 6);
    }

    #[tokio::test]
    async fn test_insufficient_stock_is_atomic() {
        let db = db().await;
        let a = product(&db, "A", 2, 100, 200).await;
        let before = snapshot(&db, &a.id).await;

        let err = db.stock().commit_sale(&a.id, 3, None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InsufficientStock));
        assert_eq!(snapshot(&db, &a.id).await, before);
    }

    #[tokio::test]
    async fn test_sale_increase_beyond_stock_keeps_sale() {
        let db = db().await;
        let a = product(&db, "A", 5, 100, 200).await;
        let sale = db.stock().commit_sale(&a.id, 3, None).await.unwrap();
        let before = snapshot(&db, &a.id).await;

        // 2 left, asking for 5 more
        let err = db.stock().commit_sale(&a.id, 8, Some(sale.id.as_str())).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InsufficientStock));
        assert_eq!(snapshot(&db, &a.id).await, before);
        assert_eq!(db.sales().get(&sale.id).await.unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_sale_invalid_calls() {
        let db = db().await;
        let a = product(&db, "A", 5, 100, 200).await;
        let b = product(&db, "B", 5, 100, 200).await;
        let sale = db.stock().commit_sale(&a.id, 1, None).await.unwrap();

        let err = db.stock().commit_sale(&a.id, 0, None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));

        let err = db.stock().commit_sale("missing", 1, None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));

        let err = db.stock().commit_sale(&a.id, 1, Some("missing")).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));

        let err = db.stock().commit_sale(&b.id, 1, Some(sale.id.as_str())).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));
        assert_eq!(stock_of(&db, &b.id).await, 5);
    }

    #[tokio::test]
    async fn test_purchase_limit_boundary() {
        let db = db().await;
        let a = product(&db, "A", 999_995, 100, 200).await;
        let before = snapshot(&db, &a.id).await;

        let err = db.stock().commit_purchase(&a.id, 11, None, None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::StockLimitExceeded));
        assert_eq!(snapshot(&db, &a.id).await, before);

        let purchase = db.stock().commit_purchase(&a.id, 5, None, None).await.unwrap();
        assert_eq!(purchase.total_cost_cents, 500);
        assert_eq!(stock_of(&db, &a.id).await, MAX_STOCK);
    }

    #[tokio::test]
    async fn test_oversized_quantities_are_rejected() {
        let db = db().await;
        let a = product(&db, "A", 1, 100, 200).await;
        let purchase = db.stock().commit_purchase(&a.id, 1, None, None).await.unwrap();
        let before = snapshot(&db, &a.id).await;

        let err = db.stock().commit_purchase(&a.id, i64::MAX, None, None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::StockLimitExceeded));

        let err = db
            .stock()
            .commit_purchase(&a.id, i64::MAX, Some(purchase.id.as_str()), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::StockLimitExceeded));

        let err = db.stock().commit_sale(&a.id, i64::MAX, None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InsufficientStock));

        assert_eq!(snapshot(&db, &a.id).await, before);
    }

    #[tokio::test]
    async fn test_prices_above_ceiling_are_rejected() {
        let db = db().await;
        let err = db
            .products()
            .create(NewProduct {
                name: "Gold bar".into(),
                brand: String::new(),
                stock: 1,
                buying_price_cents: 100,
                selling_price_cents: MAX_AMOUNT_CENTS + 1,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));
        assert_eq!(db.products().count().await.unwrap(), 0);

        // Highest price times highest stock still fits in cents
        let a = product(&db, "A", MAX_STOCK - 1, MAX_AMOUNT_CENTS, MAX_AMOUNT_CENTS).await;
        let purchase = db.stock().commit_purchase(&a.id, 1, None, None).await.unwrap();
        assert_eq!(purchase.total_cost_cents, MAX_AMOUNT_CENTS);
        let sale = db.stock().commit_sale(&a.id, MAX_STOCK, None).await.unwrap();
        assert_eq!(sale.total_price_cents, MAX_AMOUNT_CENTS * MAX_STOCK);
    }

    #[tokio::test]
    async fn test_purchase_update_cannot_go_negative() {
        let db = db().await;
        let a = product(&db, "A", 0, 500, 1000).await;
        let purchase = db.stock().commit_purchase(&a.id, 10, None, None).await.unwrap();
        db.stock().commit_sale(&a.id, 8, None).await.unwrap();
        let before = snapshot(&db, &a.id).await;

        let err = db
            .stock()
            .commit_purchase(&a.id, 1, Some(purchase.id.as_str()), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NegativeStock));
        assert_eq!(snapshot(&db, &a.id).await, before);

        let updated = db
            .stock()
            .commit_purchase(&a.id, 12, Some(purchase.id.as_str()), None)
            .await
            .unwrap();
        assert_eq!(updated.total_cost_cents, 6000);
        assert_eq!(stock_of(&db, &a.id).await, 4);
    }

    #[tokio::test]
    async fn test_purchase_reassignment() {
        let db = db().await;
        let a = product(&db, "A", 0, 500, 1000).await;
        let b = product(&db, "B", 0, 300, 400).await;
        let purchase = db.stock().commit_purchase(&a.id, 10, None, None).await.unwrap();

        let moved = db
            .stock()
            .commit_purchase(&a.id, 4, Some(purchase.id.as_str()), Some(b.id.as_str()))
            .await
            .unwrap();

        assert_eq!(moved.product_id, b.id);
        assert_eq!(moved.total_cost_cents, 1200);
        assert_eq!(stock_of(&db, &a.id).await, 0);
        assert_eq!(stock_of(&db, &b.id).await, 4);
        assert!(db.products().reconcile_stock().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reassignment_blocked_by_sold_units() {
        let db = db().await;
        let a = product(&db, "A", 0, 500, 1000).await;
        let b = product(&db, "B", 0, 300, 400).await;
        let purchase = db.stock().commit_purchase(&a.id, 10, None, None).await.unwrap();
        db.stock().commit_sale(&a.id, 8, None).await.unwrap();

        let err = db
            .stock()
            .commit_purchase(&a.id, 10, Some(purchase.id.as_str()), Some(b.id.as_str()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::NegativeStock));
        assert_eq!(stock_of(&db, &a.id).await, 2);
        assert_eq!(stock_of(&db, &b.id).await, 0);
        assert_eq!(db.purchases().get(&purchase.id).await.unwrap().product_id, a.id);
    }

    #[tokio::test]
    async fn test_new_product_id_on_create_is_invalid() {
        let db = db().await;
        let a = product(&db, "A", 0, 500, 1000).await;
        let b = product(&db, "B", 0, 300, 400).await;

        let err = db
            .stock()
            .commit_purchase(&a.id, 1, None, Some(b.id.as_str()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));
        assert_eq!(db.purchases().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deletes_keep_invariant() {
        let db = db().await;
        let a = product(&db, "A", 5, 500, 1000).await;

        let purchase = db.stock().commit_purchase(&a.id, 10, None, None).await.unwrap();
        let sale = db.stock().commit_sale(&a.id, 12, None).await.unwrap();
        assert_eq!(stock_of(&db, &a.id).await, 3);

        // 10 purchased units can't be removed while only 3 are left
        let err = db.stock().delete_purchase(&purchase.id).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NegativeStock));
        assert_eq!(db.purchases().count().await.unwrap(), 1);

        db.stock().delete_sale(&sale.id).await.unwrap();
        assert_eq!(stock_of(&db, &a.id).await, 15);

        db.stock().delete_purchase(&purchase.id).await.unwrap();
        assert_eq!(stock_of(&db, &a.id).await, 5);
        assert!(db.products().reconcile_stock().await.unwrap().is_empty());

        let err = db.stock().delete_sale(&sale.id).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_deleting_product_cascades() {
        let db = db().await;
        let a = product(&db, "A", 5, 500, 1000).await;
        db.stock().commit_sale(&a.id, 1, None).await.unwrap();
        db.stock().commit_purchase(&a.id, 1, None, None).await.unwrap();

        db.products().delete(&a.id).await.unwrap();
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.purchases().count().await.unwrap(), 0);
    }
}
