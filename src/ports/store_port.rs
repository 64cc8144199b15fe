//! Store port: the typed surface over the relational schema.
//!
//! One method per operation an ingestion or analytics layer needs. Writes
//! that would violate a uniqueness constraint return
//! [`QuantledgerError::ConstraintViolation`]; the `insert_missing_*` and
//! `replace_*` variants are the idempotent forms used by re-runnable jobs.

use crate::domain::calendar::ExchangeHoliday;
use crate::domain::company::{Company, NewCompany};
use crate::domain::corporate_action::CorporateAction;
use crate::domain::error::QuantledgerError;
use crate::domain::etl_run::EtlRun;
use crate::domain::event::Event;
use crate::domain::feature::DailyFeature;
use crate::domain::fundamentals::{
    BalanceSheet, CashflowStatement, FinancialRatios, IncomeStatement,
};
use crate::domain::model::{
    BacktestRun, CovarianceSnapshot, ModelPrediction, ModelVersion, OptimizedPortfolio,
};
use crate::domain::price::PriceRow;
use chrono::NaiveDate;

/// Row counts across the fact tables owned by one company. Used by the
/// `info` command and by cascade checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompanyFacts {
    pub prices: usize,
    pub corporate_actions: usize,
    pub features: usize,
    pub predictions: usize,
    pub balance_sheets: usize,
    pub income_statements: usize,
    pub cashflow_statements: usize,
    pub ratios: usize,
}

impl CompanyFacts {
    pub fn total(&self) -> usize {
        self.prices
            + self.corporate_actions
            + self.features
            + self.predictions
            + self.balance_sheets
            + self.income_statements
            + self.cashflow_statements
            + self.ratios
    }
}

pub trait StorePort {
    /// Create every table, constraint and index. Idempotent.
    fn initialize_schema(&self) -> Result<(), QuantledgerError>;

    // Companies.
    fn insert_company(&self, company: &NewCompany) -> Result<i64, QuantledgerError>;
    /// Get-or-create keyed on `(symbol, exchange)`; returns the company id.
    fn ensure_company(&self, company: &NewCompany) -> Result<i64, QuantledgerError>;
    fn find_company(
        &self,
        symbol: &str,
        exchange: &str,
    ) -> Result<Option<Company>, QuantledgerError>;
    fn list_companies(&self, exchange: Option<&str>) -> Result<Vec<Company>, QuantledgerError>;
    /// Update mutable profile fields and bump `updated_at`.
    fn update_company(&self, company: &Company) -> Result<(), QuantledgerError>;
    /// Cascades to all owned fact rows; events detach instead.
    fn delete_company(&self, company_id: i64) -> Result<(), QuantledgerError>;
    fn company_fact_counts(&self, company_id: i64) -> Result<CompanyFacts, QuantledgerError>;

    // Price history (append-only).
    fn insert_prices(&self, rows: &[PriceRow]) -> Result<usize, QuantledgerError>;
    /// Insert only rows whose `(company_id, trade_date)` is not yet present.
    fn insert_missing_prices(&self, rows: &[PriceRow]) -> Result<usize, QuantledgerError>;
    fn existing_trade_dates(&self, company_id: i64) -> Result<Vec<NaiveDate>, QuantledgerError>;
    fn fetch_prices(
        &self,
        company_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceRow>, QuantledgerError>;
    fn price_range(
        &self,
        company_id: i64,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, QuantledgerError>;

    // Corporate actions.
    fn insert_corporate_action(&self, action: &CorporateAction) -> Result<i64, QuantledgerError>;
    fn corporate_actions_for(
        &self,
        company_id: i64,
    ) -> Result<Vec<CorporateAction>, QuantledgerError>;

    // Daily features.
    fn insert_feature(&self, feature: &DailyFeature) -> Result<i64, QuantledgerError>;
    /// Idempotent recompute: replaces any existing row for the same
    /// `(company_id, feature_date)`.
    fn replace_feature(&self, feature: &DailyFeature) -> Result<(), QuantledgerError>;

    // Model predictions and versions.
    fn insert_prediction(&self, prediction: &ModelPrediction) -> Result<i64, QuantledgerError>;
    fn predictions_on(
        &self,
        company_id: i64,
        prediction_date: NaiveDate,
    ) -> Result<Vec<ModelPrediction>, QuantledgerError>;
    fn insert_model_version(&self, version: &ModelVersion) -> Result<i64, QuantledgerError>;
    fn find_model_version(&self, version: &str) -> Result<Option<ModelVersion>, QuantledgerError>;

    // Covariance snapshots, portfolios, backtests.
    fn insert_covariance(&self, snapshot: &CovarianceSnapshot) -> Result<i64, QuantledgerError>;
    fn covariance_on(
        &self,
        calc_date: NaiveDate,
    ) -> Result<Option<CovarianceSnapshot>, QuantledgerError>;
    fn insert_portfolio(&self, portfolio: &OptimizedPortfolio) -> Result<i64, QuantledgerError>;
    fn portfolio_on(
        &self,
        portfolio_date: NaiveDate,
        model_version: &str,
    ) -> Result<Option<OptimizedPortfolio>, QuantledgerError>;
    fn insert_backtest_run(&self, run: &BacktestRun) -> Result<i64, QuantledgerError>;
    fn backtest_runs(&self, run_id: &str) -> Result<Vec<BacktestRun>, QuantledgerError>;

    // Fundamentals triad plus derived ratios.
    fn insert_balance_sheet(&self, row: &BalanceSheet) -> Result<i64, QuantledgerError>;
    fn insert_income_statement(&self, row: &IncomeStatement) -> Result<i64, QuantledgerError>;
    fn insert_cashflow_statement(&self, row: &CashflowStatement) -> Result<i64, QuantledgerError>;
    /// Ratios are derived; recomputation replaces the existing row.
    fn replace_ratios(&self, row: &FinancialRatios) -> Result<(), QuantledgerError>;

    // Exchange holidays.
    fn insert_holiday(&self, holiday: &ExchangeHoliday) -> Result<i64, QuantledgerError>;
    fn list_holidays(&self, exchange: &str) -> Result<Vec<ExchangeHoliday>, QuantledgerError>;

    // Events.
    fn insert_event(&self, event: &Event) -> Result<i64, QuantledgerError>;
    fn events_for_company(&self, company_id: i64) -> Result<Vec<Event>, QuantledgerError>;
    fn events_on(&self, event_date: NaiveDate) -> Result<Vec<Event>, QuantledgerError>;

    // ETL run log (append-only).
    fn log_run(&self, run: &EtlRun) -> Result<i64, QuantledgerError>;
    /// Most recent first.
    fn list_runs(&self, limit: usize) -> Result<Vec<EtlRun>, QuantledgerError>;
}
