//! # Period Aggregation
//!
//! Buckets sale and expense lines by period and derives profit per bucket.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleLine ───► truncate(date) ──► revenue += total_price               │
//! │                                   cogs    += quantity × buying_price   │
//! │                                                                         │
//! │  ExpenseLine ─► truncate(date) ──► expenses += amount                  │
//! │                                                                         │
//! │  union of bucket keys ──► profit = revenue − cogs − expenses           │
//! │                      └──► sorted ascending by period start             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Aggregation is a pure function of its inputs: the same lines always give
//! the same buckets in the same order.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::period::Granularity;
use crate::types::{ExpenseLine, SaleLine};

// =============================================================================
// Output Types
// =============================================================================

/// Revenue, cost and profit figures for one period (or for all time).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitTotals {
    pub revenue: Money,
    pub cogs: Money,
    pub expenses: Money,
    /// revenue − cogs − expenses
    pub profit: Money,
}

impl ProfitTotals {
    fn add_sale(&mut self, line: &SaleLine) {
        self.revenue += line.revenue();
        self.cogs += line.cogs();
        self.profit = self.revenue - self.cogs - self.expenses;
    }

    fn add_expense(&mut self, line: &ExpenseLine) {
        self.expenses += line.amount();
        self.profit = self.revenue - self.cogs - self.expenses;
    }
}

/// One period's figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeriodBucket {
    /// `2024-07-25`, `2024-W30`, `2024-07` or `2024`.
    pub label: String,
    #[ts(as = "String")]
    pub period_start: NaiveDate,
    pub revenue: Money,
    pub cogs: Money,
    pub expenses: Money,
    pub profit: Money,
}

/// Sales volume for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlySales {
    /// `YYYY-MM`
    pub month: String,
    #[ts(as = "String")]
    pub period_start: NaiveDate,
    pub total_sales: Money,
    pub total_quantity: i64,
}

impl MonthlySales {
    /// Average price per unit sold, rounded down to the cent.
    pub fn average_unit_price(&self) -> Money {
        if self.total_quantity <= 0 {
            return Money::zero();
        }
        Money::from_cents(self.total_sales.cents() / self.total_quantity)
    }
}

// =============================================================================
// Query
// =============================================================================

/// What a caller asked to aggregate: periodic buckets or one all-time total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfitQuery {
    Periodic(Granularity),
    Overall,
}

impl ProfitQuery {
    /// Parses `daily`, `weekly`, `monthly`, `yearly` or `overall`.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::{Granularity, ProfitQuery};
    ///
    /// assert_eq!(ProfitQuery::parse("overall").unwrap(), ProfitQuery::Overall);
    /// assert_eq!(
    ///     ProfitQuery::parse("weekly").unwrap(),
    ///     ProfitQuery::Periodic(Granularity::Weekly)
    /// );
    /// assert!(ProfitQuery::parse("hourly").is_err());
    /// ```
    pub fn parse(period: &str) -> CoreResult<Self> {
        if period == "overall" {
            return Ok(ProfitQuery::Overall);
        }
        period
            .parse::<Granularity>()
            .map(ProfitQuery::Periodic)
            .map_err(|_| CoreError::InvalidGranularity(period.to_string()))
    }
}

/// Result of running a [`ProfitQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
#[ts(export)]
pub enum ProfitSummary {
    Periodic(Vec<PeriodBucket>),
    Overall(ProfitTotals),
}

// =============================================================================
// Aggregation
// =============================================================================

/// Buckets sales and expenses by `granularity`.
///
/// A period appears if it has at least one sale or one expense; the missing
/// side contributes zero. Buckets are sorted by period start.
pub fn aggregate(
    granularity: Granularity,
    sales: &[SaleLine],
    expenses: &[ExpenseLine],
) -> Vec<PeriodBucket> {
    let mut buckets: BTreeMap<NaiveDate, ProfitTotals> = BTreeMap::new();

    for line in sales {
        let start = granularity.truncate(line.date.date_naive());
        buckets.entry(start).or_default().add_sale(line);
    }

    for line in expenses {
        let start = granularity.truncate(line.date.date_naive());
        buckets.entry(start).or_default().add_expense(line);
    }

    buckets
        .into_iter()
        .map(|(start, totals)| PeriodBucket {
            label: granularity.label(start),
            period_start: start,
            revenue: totals.revenue,
            cogs: totals.cogs,
            expenses: totals.expenses,
            profit: totals.profit,
        })
        .collect()
}

/// All-time totals.
pub fn aggregate_overall(sales: &[SaleLine], expenses: &[ExpenseLine]) -> ProfitTotals {
    let mut totals = ProfitTotals::default();
    sales.iter().for_each(|line| totals.add_sale(line));
    expenses.iter().for_each(|line| totals.add_expense(line));
    totals
}

/// Runs a parsed query.
pub fn run_query(query: ProfitQuery, sales: &[SaleLine], expenses: &[ExpenseLine]) -> ProfitSummary {
    match query {
        ProfitQuery::Periodic(granularity) => {
            ProfitSummary::Periodic(aggregate(granularity, sales, expenses))
        }
        ProfitQuery::Overall => ProfitSummary::Overall(aggregate_overall(sales, expenses)),
    }
}

/// Sales amount and units per calendar month, ascending.
pub fn monthly_sales(sales: &[SaleLine]) -> Vec<MonthlySales> {
    let mut months: BTreeMap<NaiveDate, (Money, i64)> = BTreeMap::new();

    for line in sales {
        let start = Granularity::Monthly.truncate(line.date.date_naive());
        let entry = months.entry(start).or_default();
        entry.0 += line.revenue();
        entry.1 += line.quantity;
    }

    months
        .into_iter()
        .map(|(start, (total_sales, total_quantity))| MonthlySales {
            month: Granularity::Monthly.label(start),
            period_start: start,
            total_sales,
            total_quantity,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
