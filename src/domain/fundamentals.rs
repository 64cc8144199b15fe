//! Quarterly fundamentals: the statement triad and derived ratios.
//!
//! Balance sheet, income statement and cash flow live in three parallel
//! tables rather than one polymorphic table, each keyed uniquely by
//! `(company_id, fiscal_year, fiscal_quarter)`. `financial_ratios` shares
//! the key and is recomputed whenever a source statement changes.

use chrono::NaiveDate;

/// Reporting period shared by all four fundamentals tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiscalPeriod {
    pub fiscal_year: i32,
    /// 1 through 4.
    pub fiscal_quarter: i32,
    pub report_date: NaiveDate,
}

/// One row in `financials_balance_sheet`. Figures at scale 2.
#[derive(Debug, Clone, Default)]
pub struct BalanceSheet {
    pub company_id: i64,
    pub fiscal_year: i32,
    pub fiscal_quarter: i32,
    pub report_date: NaiveDate,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub shareholder_equity: Option<f64>,
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub cash_and_equivalents: Option<f64>,
    pub inventory: Option<f64>,
    pub receivables: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub short_term_debt: Option<f64>,
    pub retained_earnings: Option<f64>,
}

/// One row in `financials_income_statement`. Figures at scale 2.
#[derive(Debug, Clone, Default)]
pub struct IncomeStatement {
    pub company_id: i64,
    pub fiscal_year: i32,
    pub fiscal_quarter: i32,
    pub report_date: NaiveDate,
    pub revenue: Option<f64>,
    pub cost_of_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_expenses: Option<f64>,
    pub operating_income: Option<f64>,
    pub interest_expense: Option<f64>,
    pub pretax_income: Option<f64>,
    pub net_income: Option<f64>,
    pub ebit: Option<f64>,
    pub ebitda: Option<f64>,
}

/// One row in `financials_cashflow_statement`. Figures at scale 2.
#[derive(Debug, Clone, Default)]
pub struct CashflowStatement {
    pub company_id: i64,
    pub fiscal_year: i32,
    pub fiscal_quarter: i32,
    pub report_date: NaiveDate,
    pub operating_cash_flow: Option<f64>,
    pub investing_cash_flow: Option<f64>,
    pub financing_cash_flow: Option<f64>,
    pub capital_expenditure: Option<f64>,
    pub free_cash_flow: Option<f64>,
}

/// One row in `financial_ratios`. Metrics at scale 8.
#[derive(Debug, Clone, Default)]
pub struct FinancialRatios {
    pub company_id: i64,
    pub fiscal_year: i32,
    pub fiscal_quarter: i32,
    pub report_date: NaiveDate,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub roe: Option<f64>,
    pub roa: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub ebitda_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub fcf_yield: Option<f64>,
}

impl FiscalPeriod {
    pub fn new(fiscal_year: i32, fiscal_quarter: i32, report_date: NaiveDate) -> Self {
        Self {
            fiscal_year,
            fiscal_quarter,
            report_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_equality_ignores_nothing() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        assert_eq!(FiscalPeriod::new(2024, 1, d), FiscalPeriod::new(2024, 1, d));
        assert_ne!(FiscalPeriod::new(2024, 1, d), FiscalPeriod::new(2024, 2, d));
    }
}
