//! # Financial Report Builder
//!
//! Resolves a period selector to a date range, sums the ledger over it and
//! hands the sums to [`FinancialReport::build`]. Also runs the period
//! aggregator over the full ledger.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  build_report("weekly", 2024, -, 30)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  resolve_period ──► DateRange 2024-07-22 ..= 2024-07-28                │
//! │       │                                                                 │
//! │       ▼  (concurrently, read-only)                                     │
//! │  ┌──────────────┬──────────────────┬───────────────┬─────────────┐     │
//! │  │ sales_revenue│ purchase_totals  │ expense_total │ sales_cogs  │     │
//! │  └──────────────┴──────────────────┴───────────────┴─────────────┘     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  FinancialReport::build(period, totals)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sums run on separate pooled connections, so a report is not a single
//! snapshot: a commit landing mid-report may show in one sum and not in
//! another.

use std::future::Future;
use std::sync::Arc;

use tally_core::aggregate::{self, ProfitQuery};
use tally_core::period::resolve_period;
use tally_core::report::ReportTotals;
use tally_core::{
    Clock, DateRange, ExpenseLine, FinancialReport, Granularity, Money, MonthlySales,
    PeriodBucket, ProfitSummary, ProfitTotals, PurchaseTotals, ReportPeriod, SaleLine,
};
use tracing::debug;

use crate::error::DbResult;
use crate::pool::Database;

// =============================================================================
// Ledger Access
// =============================================================================

/// Read-only sums and rows the report builder needs.
///
/// Implemented by [`Database`]; anything else that can answer these
/// (a replica, a fixture) can back a [`ReportService`] too.
pub trait LedgerTotals: Send + Sync {
    /// Σ Sale.total_price over sales dated in `range`.
    fn sales_revenue(&self, range: DateRange) -> impl Future<Output = DbResult<Money>> + Send;

    /// Σ total_cost and Σ quantity over purchases dated in `range`.
    fn purchase_totals(
        &self,
        range: DateRange,
    ) -> impl Future<Output = DbResult<PurchaseTotals>> + Send;

    /// Σ Expense.amount over expenses dated in `range`.
    fn expense_total(&self, range: DateRange) -> impl Future<Output = DbResult<Money>> + Send;

    /// Σ Sale.quantity × current buying price over sales dated in `range`.
    fn sales_cogs(&self, range: DateRange) -> impl Future<Output = DbResult<Money>> + Send;

    /// Every sale, joined with its product's buying price.
    fn sale_lines(&self) -> impl Future<Output = DbResult<Vec<SaleLine>>> + Send;

    /// Every expense.
    fn expense_lines(&self) -> impl Future<Output = DbResult<Vec<ExpenseLine>>> + Send;
}

impl LedgerTotals for Database {
    fn sales_revenue(&self, range: DateRange) -> impl Future<Output = DbResult<Money>> + Send {
        let sales = self.sales();
        async move { sales.revenue_in_range(range).await }
    }

    fn purchase_totals(
        &self,
        range: DateRange,
    ) -> impl Future<Output = DbResult<PurchaseTotals>> + Send {
        let purchases = self.purchases();
        async move { purchases.totals_in_range(range).await }
    }

    fn expense_total(&self, range: DateRange) -> impl Future<Output = DbResult<Money>> + Send {
        let expenses = self.expenses();
        async move { expenses.total_in_range(range).await }
    }

    fn sales_cogs(&self, range: DateRange) -> impl Future<Output = DbResult<Money>> + Send {
        let sales = self.sales();
        async move { sales.cogs_in_range(range).await }
    }

    fn sale_lines(&self) -> impl Future<Output = DbResult<Vec<SaleLine>>> + Send {
        let sales = self.sales();
        async move { sales.lines().await }
    }

    fn expense_lines(&self) -> impl Future<Output = DbResult<Vec<ExpenseLine>>> + Send {
        let expenses = self.expenses();
        async move { expenses.lines().await }
    }
}

// =============================================================================
// Report Service
// =============================================================================

/// Builds financial reports and profit aggregations.
///
/// ## Usage
/// ```rust,ignore
/// let reports = db.reports();
///
/// let week = reports.build_report("weekly", Some(2024), None, Some(30)).await?;
/// let monthly = reports.aggregate("monthly").await?;
/// let all_time = reports.aggregate_overall().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ReportService<L> {
    ledger: L,
    clock: Arc<dyn Clock>,
}

impl<L: LedgerTotals> ReportService<L> {
    pub fn new(ledger: L, clock: Arc<dyn Clock>) -> Self {
        ReportService { ledger, clock }
    }

    /// Builds the report for one period.
    ///
    /// `period_type` is `daily`, `weekly`, `monthly` or `yearly`; missing
    /// selectors default to the period containing today.
    ///
    /// ## Errors
    /// - `InvalidPeriodType` - unknown `period_type` (including `overall`)
    /// - `InvalidInput` - week or month out of range
    pub async fn build_report(
        &self,
        period_type: &str,
        year: Option<i32>,
        month: Option<u32>,
        week: Option<u32>,
    ) -> DbResult<FinancialReport> {
        let granularity = Granularity::from_period_type(period_type)?;
        let range = resolve_period(granularity, year, month, week, self.clock.today())?;

        let (revenue, purchases, expenses, sales_cogs) = tokio::try_join!(
            self.ledger.sales_revenue(range),
            self.ledger.purchase_totals(range),
            self.ledger.expense_total(range),
            self.ledger.sales_cogs(range),
        )?;

        debug!(
            period = %granularity,
            start = %range.start,
            end = %range.end,
            revenue = %revenue,
            purchases = %purchases.total_cost,
            expenses = %expenses,
            "Building financial report"
        );

        let period = ReportPeriod {
            period_type: granularity,
            start_date: range.start,
            end_date: range.end,
            year,
            month,
            week,
        };

        Ok(FinancialReport::build(
            period,
            ReportTotals {
                revenue,
                total_purchases: purchases.total_cost,
                purchase_quantity: purchases.total_quantity,
                expenses,
                sales_cogs,
            },
        ))
    }

    /// Profit per period across the whole ledger, oldest bucket first.
    ///
    /// ## Errors
    /// - `InvalidGranularity` - not `daily`, `weekly`, `monthly` or `yearly`
    pub async fn aggregate(&self, granularity: &str) -> DbResult<Vec<PeriodBucket>> {
        let granularity: Granularity = granularity.parse()?;
        let (sales, expenses) = self.lines().await?;
        Ok(aggregate::aggregate(granularity, &sales, &expenses))
    }

    /// All-time revenue, COGS, expenses and profit.
    pub async fn aggregate_overall(&self) -> DbResult<ProfitTotals> {
        let (sales, expenses) = self.lines().await?;
        Ok(aggregate::aggregate_overall(&sales, &expenses))
    }

    /// Dispatches a `period` query parameter, `overall` included.
    pub async fn profits(&self, period: &str) -> DbResult<ProfitSummary> {
        let query = ProfitQuery::parse(period)?;
        let (sales, expenses) = self.lines().await?;
        Ok(aggregate::run_query(query, &sales, &expenses))
    }

    /// Sales volume per calendar month.
    pub async fn monthly_sales(&self) -> DbResult<Vec<MonthlySales>> {
        let sales = self.ledger.sale_lines().await?;
        Ok(aggregate::monthly_sales(&sales))
    }

    async fn lines(&self) -> DbResult<(Vec<SaleLine>, Vec<ExpenseLine>)> {
        let (sales, expenses) =
            tokio::try_join!(self.ledger.sale_lines(), self.ledger.expense_lines())?;

        debug!(sales = sales.len(), expenses = expenses.len(), "Aggregating ledger");
        Ok((sales, expenses))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use std::future::ready;
    use tally_core::{ErrorKind, FixedClock, NewProduct};

    /// In-memory ledger rows.
    #[derive(Debug, Default)]
    struct Fixture {
        sales: Vec<SaleLine>,
        purchases: Vec<(DateTime<Utc>, i64, i64)>,
        expenses: Vec<ExpenseLine>,
    }

    fn in_range(range: &DateRange, date: &DateTime<Utc>) -> bool {
        range.contains(date.date_naive())
    }

    impl LedgerTotals for Fixture {
        fn sales_revenue(&self, range: DateRange) -> impl Future<Output = DbResult<Money>> + Send {
            let total: Money = self
                .sales
                .iter()
                .filter(|s| in_range(&range, &s.date))
                .map(SaleLine::revenue)
                .sum();
            ready(Ok(total))
        }

        fn purchase_totals(
            &self,
            range: DateRange,
        ) -> impl Future<Output = DbResult<PurchaseTotals>> + Send {
            let mut totals = PurchaseTotals {
                total_cost: Money::zero(),
                total_quantity: 0,
            };
            for (date, quantity, cost) in &self.purchases {
                if in_range(&range, date) {
                    totals.total_cost += Money::from_cents(*cost);
                    totals.total_quantity += quantity;
                }
            }
            ready(Ok(totals))
        }

        fn expense_total(&self, range: DateRange) -> impl Future<Output = DbResult<Money>> + Send {
            let total: Money = self
                .expenses
                .iter()
                .filter(|e| in_range(&range, &e.date))
                .map(ExpenseLine::amount)
                .sum();
            ready(Ok(total))
        }

        fn sales_cogs(&self, range: DateRange) -> impl Future<Output = DbResult<Money>> + Send {
            let total: Money = self
                .sales
                .iter()
                .filter(|s| in_range(&range, &s.date))
                .map(SaleLine::cogs)
                .sum();
            ready(Ok(total))
        }

        fn sale_lines(&self) -> impl Future<Output = DbResult<Vec<SaleLine>>> + Send {
            ready(Ok(self.sales.clone()))
        }

        fn expense_lines(&self) -> impl Future<Output = DbResult<Vec<ExpenseLine>>> + Send {
            ready(Ok(self.expenses.clone()))
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn sale(date: DateTime<Utc>, quantity: i64, total: i64, buying: i64) -> SaleLine {
        SaleLine {
            date,
            quantity,
            total_price_cents: total,
            buying_price_cents: buying,
        }
    }

    fn service(fixture: Fixture) -> ReportService<Fixture> {
        let clock = FixedClock::at_date(2024, 7, 24).unwrap();
        ReportService::new(fixture, Arc::new(clock))
    }

    #[tokio::test]
    async fn test_weekly_report() {
        let reports = service(Fixture {
            sales: vec![sale(at(2024, 7, 25), 4, 4000, 500)],
            purchases: vec![(at(2024, 7, 23), 10, 5000)],
            // Week 31, outside the report
            expenses: vec![ExpenseLine {
                date: at(2024, 7, 29),
                amount_cents: 900,
            }],
        });

        let report = reports
            .build_report("weekly", Some(2024), None, Some(30))
            .await
            .unwrap();

        assert_eq!(report.period.start_date, NaiveDate::from_ymd_opt(2024, 7, 22).unwrap());
        assert_eq!(report.period.end_date, NaiveDate::from_ymd_opt(2024, 7, 28).unwrap());
        assert_eq!(report.revenue.total_revenue.cents(), 4000);
        assert_eq!(report.costs.cost_of_goods_sold.cents(), 5000);
        assert_eq!(report.costs.purchase_quantity, 10);
        assert_eq!(report.costs.sales_cogs.cents(), 2000);
        assert!(report.costs.operating_expenses.is_zero());
        assert_eq!(report.profitability.gross_profit.cents(), -1000);
        assert_eq!(report.profitability.net_profit.cents(), -1000);
        assert_eq!(report.profitability.gross_profit_margin, -25.0);
        assert_eq!(report.balance.net_balance.cents(), -1000);
    }

    #[tokio::test]
    async fn test_empty_period_has_zero_margins() {
        let reports = service(Fixture::default());
        let report = reports.build_report("yearly", Some(2020), None, None).await.unwrap();

        assert!(report.revenue.total_revenue.is_zero());
        assert_eq!(report.profitability.gross_profit_margin, 0.0);
        assert_eq!(report.profitability.net_profit_margin, 0.0);
    }

    #[tokio::test]
    async fn test_daily_report_is_today() {
        let reports = service(Fixture {
            sales: vec![
                sale(at(2024, 7, 24), 1, 1000, 500),
                sale(at(2024, 7, 23), 1, 7000, 500),
            ],
            ..Default::default()
        });

        let report = reports.build_report("daily", None, None, None).await.unwrap();
        assert_eq!(report.period.start_date, NaiveDate::from_ymd_opt(2024, 7, 24).unwrap());
        assert_eq!(report.revenue.total_revenue.cents(), 1000);
    }

    #[tokio::test]
    async fn test_report_errors() {
        let reports = service(Fixture::default());

        let err = reports.build_report("overall", None, None, None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidPeriodType));

        let err = reports.build_report("hourly", None, None, None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidPeriodType));

        let err = reports.build_report("weekly", Some(2024), None, Some(53)).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));

        let err = reports.build_report("monthly", Some(2024), Some(13), None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));

        let err = reports.aggregate("quarterly").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidGranularity));

        // Names match exactly
        let err = reports.aggregate("Monthly").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidGranularity));

        let err = reports.build_report(" weekly", Some(2024), None, Some(30)).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidPeriodType));

        let err = reports.profits("hourly").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidGranularity));
    }

    #[tokio::test]
    async fn test_overall_profit() {
        let reports = service(Fixture {
            sales: vec![sale(at(2024, 3, 1), 2, 2000, 500)],
            expenses: vec![ExpenseLine {
                date: at(2024, 5, 1),
                amount_cents: 300,
            }],
            ..Default::default()
        });

        let totals = reports.aggregate_overall().await.unwrap();
        assert_eq!(totals.revenue.cents(), 2000);
        assert_eq!(totals.cogs.cents(), 1000);
        assert_eq!(totals.expenses.cents(), 300);
        assert_eq!(totals.profit.cents(), 700);

        assert_eq!(
            reports.profits("overall").await.unwrap(),
            ProfitSummary::Overall(totals)
        );
    }

    #[tokio::test]
    async fn test_aggregation_is_deterministic() {
        let fixture = || Fixture {
            sales: vec![
                sale(at(2024, 8, 2), 1, 1000, 400),
                sale(at(2024, 7, 2), 3, 3000, 400),
            ],
            expenses: vec![ExpenseLine {
                date: at(2024, 6, 15),
                amount_cents: 250,
            }],
            ..Default::default()
        };

        let first = service(fixture()).aggregate("monthly").await.unwrap();
        let second = service(fixture()).aggregate("monthly").await.unwrap();
        assert_eq!(first, second);

        let labels: Vec<_> = first.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["2024-06", "2024-07", "2024-08"]);
        assert_eq!(first[0].profit.cents(), -250);

        let monthly = service(fixture()).monthly_sales().await.unwrap();
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly[0].total_quantity, 3);
    }

    #[tokio::test]
    async fn test_report_against_database() {
        let db = Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .with_clock(FixedClock::at_date(2024, 7, 24).unwrap());

        let a = db
            .products()
            .create(NewProduct {
                name: "A".into(),
                brand: String::new(),
                stock: 100,
                buying_price_cents: 500,
                selling_price_cents: 1000,
            })
            .await
            .unwrap();

        db.stock().commit_sale(&a.id, 4, None).await.unwrap();
        db.stock().commit_purchase(&a.id, 10, None, None).await.unwrap();

        let report = db
            .reports()
            .build_report("weekly", Some(2024), None, Some(30))
            .await
            .unwrap();

        assert_eq!(report.revenue.total_revenue.cents(), 4000);
        assert_eq!(report.costs.total_purchases.cents(), 5000);
        assert_eq!(report.costs.sales_cogs.cents(), 2000);
        assert_eq!(report.profitability.gross_profit.cents(), -1000);
        assert_eq!(report.profitability.net_profit.cents(), -1000);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["period"]["type"], "weekly");
        assert_eq!(json["period"]["week"], 30);

        // Week 31 holds nothing
        let next = db
            .reports()
            .build_report("weekly", Some(2024), None, Some(31))
            .await
            .unwrap();
        assert!(next.revenue.total_revenue.is_zero());

        let weekly = db.reports().aggregate("weekly").await.unwrap();
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].label, "2024-W30");
        assert_eq!(weekly[0].profit.cents(), 2000);
    }
}
