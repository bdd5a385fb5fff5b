//! # Expense Repository
//!
//! Database operations for operating expenses. Expenses don't touch stock,
//! so they are plain CRUD.

use sqlx::SqlitePool;
use std::sync::Arc;
use tally_core::validation::validate_expense;
use tally_core::{Clock, DateRange, Expense, ExpenseInput, ExpenseLine, Money};
use tracing::debug;

use super::generate_id;
use crate::error::{DbError, DbResult};

/// Repository for expense database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl ExpenseRepository {
    /// Creates a new ExpenseRepository.
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        ExpenseRepository { pool, clock }
    }

    /// Records an expense dated now.
    pub async fn create(&self, input: ExpenseInput) -> DbResult<Expense> {
        validate_expense(&input)?;

        let expense = Expense {
            id: generate_id(),
            title: input.title.trim().to_string(),
            amount_cents: input.amount_cents,
            date: self.clock.now(),
        };

        debug!(id = %expense.id, amount = %expense.amount(), "Creating expense");

        sqlx::query(
            r#"
            INSERT INTO expenses (id, title, amount_cents, date)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.title)
        .bind(expense.amount_cents)
        .bind(expense.date)
        .execute(&self.pool)
        .await?;

        Ok(expense)
    }

    /// Gets an expense by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Expense>> {
        let expense = sqlx::query_as::<_, Expense>(
            "SELECT id, title, amount_cents, date FROM expenses WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(expense)
    }

    /// Gets an expense by its ID, failing with `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Expense> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Expense", id))
    }

    /// Lists expenses, newest first.
    pub async fn list(&self) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(
            "SELECT id, title, amount_cents, date FROM expenses ORDER BY date DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    /// Edits title and amount. The date never changes.
    pub async fn update(&self, id: &str, input: ExpenseInput) -> DbResult<Expense> {
        validate_expense(&input)?;

        debug!(id = %id, "Updating expense");

        let result = sqlx::query("UPDATE expenses SET title = ?2, amount_cents = ?3 WHERE id = ?1")
            .bind(id)
            .bind(input.title.trim())
            .bind(input.amount_cents)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", id));
        }

        self.get(id).await
    }

    /// Deletes an expense.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting expense");

        let result = sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", id));
        }

        Ok(())
    }

    /// Σ amount over expenses dated in `range` (zero when none).
    pub async fn total_in_range(&self, range: DateRange) -> DbResult<Money> {
        let (from, until) = range.bounds_utc();

        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM expenses
            WHERE date >= ?1 AND date < ?2
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }

    /// Every expense, for aggregation.
    pub async fn lines(&self) -> DbResult<Vec<ExpenseLine>> {
        let lines = sqlx::query_as::<_, ExpenseLine>(
            "SELECT date, amount_cents FROM expenses ORDER BY date",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use tally_core::{DateRange, ErrorKind, ExpenseInput, FixedClock};

    fn rent(amount_cents: i64) -> ExpenseInput {
        ExpenseInput {
            title: "Rent".into(),
            amount_cents,
        }
    }

    #[tokio::test]
    async fn test_expense_crud() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.expenses();

        let created = repo.create(rent(50_000)).await.unwrap();
        assert_eq!(repo.get(&created.id).await.unwrap(), created);

        let updated = repo
            .update(
                &created.id,
                ExpenseInput {
                    title: "Rent (July)".into(),
                    amount_cents: 52_000,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Rent (July)");
        assert_eq!(updated.date, created.date);

        repo.delete(&created.id).await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());

        let err = repo.delete(&created.id).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_expense_validation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.expenses().create(rent(0)).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));
    }

    #[tokio::test]
    async fn test_total_in_range_is_end_inclusive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let on_end = db.clone().with_clock(FixedClock::at_date(2024, 7, 31).unwrap());
        on_end.expenses().create(rent(300)).await.unwrap();
        let after = db.clone().with_clock(FixedClock::at_date(2024, 8, 1).unwrap());
        after.expenses().create(rent(700)).await.unwrap();

        let july = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 31).unwrap(),
        );
        assert_eq!(db.expenses().total_in_range(july).await.unwrap().cents(), 300);

        let empty = DateRange::single_day(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert!(db.expenses().total_in_range(empty).await.unwrap().is_zero());
        assert_eq!(db.expenses().lines().await.unwrap().len(), 2);
    }
}
