//! # Financial Report
//!
//! Derives the profit and loss report from range sums.
//!
//! ## Report Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  period         type, start_date, end_date, year, month, week           │
//! │  revenue        total_revenue                                          │
//! │  costs          cost_of_goods_sold (= total_purchases)                 │
//! │                 total_purchases, purchase_quantity                     │
//! │                 operating_expenses, sales_cogs                         │
//! │  profitability  gross_profit  = revenue − cost_of_goods_sold           │
//! │                 net_profit    = gross_profit − operating_expenses      │
//! │                 gross/net margin % of revenue (0 when revenue is 0)    │
//! │  balance        total_income   = revenue                               │
//! │                 total_outgoing = purchases + expenses                  │
//! │                 net_balance    = income − outgoing                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two cost figures are reported. `cost_of_goods_sold` is what was spent on
//! purchases in the range. `sales_cogs` is quantity × current buying price
//! over the sales in the range, the same figure the period aggregator calls
//! `cogs`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::period::{DateRange, Granularity};

// =============================================================================
// Inputs
// =============================================================================

/// Range sums a report is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportTotals {
    /// Σ Sale.total_price
    pub revenue: Money,
    /// Σ Purchase.total_cost
    pub total_purchases: Money,
    /// Σ Purchase.quantity
    pub purchase_quantity: i64,
    /// Σ Expense.amount
    pub expenses: Money,
    /// Σ Sale.quantity × Product.buying_price
    pub sales_cogs: Money,
}

// =============================================================================
// Report Sections
// =============================================================================

/// The period a report covers, with the selectors that were asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportPeriod {
    #[serde(rename = "type")]
    pub period_type: Granularity,
    #[ts(as = "String")]
    pub start_date: chrono::NaiveDate,
    #[ts(as = "String")]
    pub end_date: chrono::NaiveDate,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub week: Option<u32>,
}

impl ReportPeriod {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RevenueSection {
    pub total_revenue: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CostSection {
    pub cost_of_goods_sold: Money,
    pub total_purchases: Money,
    pub purchase_quantity: i64,
    pub operating_expenses: Money,
    pub sales_cogs: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitabilitySection {
    pub gross_profit: Money,
    pub net_profit: Money,
    pub gross_profit_margin: f64,
    pub net_profit_margin: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BalanceSection {
    pub total_income: Money,
    pub total_outgoing: Money,
    pub net_balance: Money,
}

/// A derived financial report. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinancialReport {
    pub period: ReportPeriod,
    pub revenue: RevenueSection,
    pub costs: CostSection,
    pub profitability: ProfitabilitySection,
    pub balance: BalanceSection,
}

impl FinancialReport {
    /// Derives every figure from the range sums.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use tally_core::report::{FinancialReport, ReportPeriod, ReportTotals};
    /// use tally_core::{Granularity, Money};
    ///
    /// let day = NaiveDate::from_ymd_opt(2024, 7, 22).unwrap();
    /// let period = ReportPeriod {
    ///     period_type: Granularity::Daily,
    ///     start_date: day,
    ///     end_date: day,
    ///     year: None,
    ///     month: None,
    ///     week: None,
    /// };
    /// let totals = ReportTotals {
    ///     revenue: Money::from_cents(10_000),
    ///     total_purchases: Money::from_cents(6_000),
    ///     expenses: Money::from_cents(1_000),
    ///     ..Default::default()
    /// };
    ///
    /// let report = FinancialReport::build(period, totals);
    /// assert_eq!(report.profitability.net_profit.cents(), 3_000);
    /// assert_eq!(report.profitability.net_profit_margin, 30.0);
    /// ```
    pub fn build(period: ReportPeriod, totals: ReportTotals) -> Self {
        let revenue = totals.revenue;
        let cost_of_goods_sold = totals.total_purchases;
        let gross_profit = revenue - cost_of_goods_sold;
        let net_profit = gross_profit - totals.expenses;
        let total_outgoing = totals.total_purchases + totals.expenses;

        FinancialReport {
            period,
            revenue: RevenueSection {
                total_revenue: revenue,
            },
            costs: CostSection {
                cost_of_goods_sold,
                total_purchases: totals.total_purchases,
                purchase_quantity: totals.purchase_quantity,
                operating_expenses: totals.expenses,
                sales_cogs: totals.sales_cogs,
            },
            profitability: ProfitabilitySection {
                gross_profit,
                net_profit,
                gross_profit_margin: gross_profit.percent_of(revenue),
                net_profit_margin: net_profit.percent_of(revenue),
            },
            balance: BalanceSection {
                total_income: revenue,
                total_outgoing,
                net_balance: revenue - total_outgoing,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn weekly_period() -> ReportPeriod {
        ReportPeriod {
            period_type: Granularity::Weekly,
            start_date: NaiveDate::from_ymd_opt(2024, 7, 22).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 7, 28).unwrap(),
            year: Some(2024),
            month: None,
            week: Some(30),
        }
    }

    #[test]
    fn test_weekly_scenario() {
        // 4 sold at 10.00, 10 bought at 5.00
        let totals = ReportTotals {
            revenue: Money::from_cents(4000),
            total_purchases: Money::from_cents(5000),
            purchase_quantity: 10,
            expenses: Money::zero(),
            sales_cogs: Money::from_cents(2000),
        };
        let report = FinancialReport::build(weekly_period(), totals);

        assert_eq!(report.revenue.total_revenue.cents(), 4000);
        assert_eq!(report.costs.cost_of_goods_sold.cents(), 5000);
        assert_eq!(report.costs.purchase_quantity, 10);
        assert_eq!(report.costs.sales_cogs.cents(), 2000);
        assert_eq!(report.profitability.gross_profit.cents(), -1000);
        assert_eq!(report.profitability.net_profit.cents(), -1000);
        assert_eq!(report.profitability.gross_profit_margin, -25.0);
        assert_eq!(report.balance.total_outgoing.cents(), 5000);
        assert_eq!(report.balance.net_balance.cents(), -1000);
    }

    #[test]
    fn test_empty_period_is_all_zero() {
        let report = FinancialReport::build(weekly_period(), ReportTotals::default());
        assert!(report.revenue.total_revenue.is_zero());
        assert!(report.profitability.net_profit.is_zero());
        assert_eq!(report.profitability.gross_profit_margin, 0.0);
        assert_eq!(report.profitability.net_profit_margin, 0.0);
        assert!(report.balance.net_balance.is_zero());
    }

    #[test]
    fn test_expenses_only_reach_net_profit() {
        let totals = ReportTotals {
            revenue: Money::from_cents(10_000),
            total_purchases: Money::from_cents(4_000),
            purchase_quantity: 4,
            expenses: Money::from_cents(1_000),
            sales_cogs: Money::zero(),
        };
        let report = FinancialReport::build(weekly_period(), totals);
        assert_eq!(report.profitability.gross_profit.cents(), 6_000);
        assert_eq!(report.profitability.net_profit.cents(), 5_000);
        assert_eq!(report.profitability.gross_profit_margin, 60.0);
        assert_eq!(report.profitability.net_profit_margin, 50.0);
        assert_eq!(report.balance.total_outgoing.cents(), 5_000);
    }

    #[test]
    fn test_period_serialization() {
        let json = serde_json::to_value(weekly_period()).unwrap();
        assert_eq!(json["type"], "weekly");
        assert_eq!(json["start_date"], "2024-07-22");
        assert_eq!(json["week"], 30);
        assert!(json["month"].is_null());
    }
}
