//! PostgreSQL store adapter.
//!
//! Native DATE/TIMESTAMP columns and NUMERIC precision as declared:
//! prices and returns NUMERIC(24,6), financial figures NUMERIC(30,2),
//! ratio metrics NUMERIC(24,8). Enumerations are CHECK-constrained VARCHAR
//! so the accepted sets match the SQLite backend exactly.

use crate::domain::calendar::ExchangeHoliday;
use crate::domain::company::{Company, NewCompany};
use crate::domain::corporate_action::{ActionType, CorporateAction};
use crate::domain::error::QuantledgerError;
use crate::domain::etl_run::{EtlRun, RunStatus};
use crate::domain::event::Event;
use crate::domain::feature::DailyFeature;
use crate::domain::fundamentals::{
    BalanceSheet, CashflowStatement, FinancialRatios, IncomeStatement,
};
use crate::domain::model::{
    BacktestRun, CovarianceSnapshot, ModelPrediction, ModelVersion, OptimizedPortfolio,
};
use crate::domain::price::PriceRow;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::{CompanyFacts, StorePort};
use chrono::NaiveDate;
use postgres::error::SqlState;
use postgres::types::ToSql;
use postgres::{Client, NoTls};
use std::cell::RefCell;
use std::str::FromStr;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS companies (
    id SERIAL PRIMARY KEY,
    symbol VARCHAR(32) NOT NULL,
    name VARCHAR(128),
    exchange VARCHAR(32) NOT NULL,
    sector VARCHAR(64),
    industry VARCHAR(128),
    isin VARCHAR(32) UNIQUE,
    listing_date DATE,
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    updated_at TIMESTAMP NOT NULL DEFAULT now(),
    CONSTRAINT uq_symbol_exchange UNIQUE (symbol, exchange)
);

CREATE TABLE IF NOT EXISTS corporate_actions (
    id BIGSERIAL PRIMARY KEY,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    action_type VARCHAR(16) NOT NULL
        CHECK (action_type IN ('DIVIDEND', 'SPLIT', 'BONUS', 'RIGHTS')),
    action_date DATE NOT NULL,
    value NUMERIC(24, 6),
    ratio_from INTEGER,
    ratio_to INTEGER,
    created_at TIMESTAMP NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS price_history (
    id BIGSERIAL PRIMARY KEY,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    trade_date DATE NOT NULL,
    open NUMERIC(24, 6),
    high NUMERIC(24, 6),
    low NUMERIC(24, 6),
    close NUMERIC(24, 6),
    adj_close NUMERIC(24, 6),
    volume BIGINT,
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    CONSTRAINT uq_price_company_date UNIQUE (company_id, trade_date)
);
CREATE INDEX IF NOT EXISTS idx_price_company_date
    ON price_history(company_id, trade_date);

CREATE TABLE IF NOT EXISTS features_daily (
    id BIGSERIAL PRIMARY KEY,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    feature_date DATE NOT NULL,
    return_1d NUMERIC(24, 6),
    return_5d NUMERIC(24, 6),
    return_10d NUMERIC(24, 6),
    return_21d NUMERIC(24, 6),
    volatility_10d NUMERIC(24, 6),
    volatility_20d NUMERIC(24, 6),
    volatility_60d NUMERIC(24, 6),
    momentum_14d NUMERIC(24, 6),
    volume_change_5d NUMERIC(24, 6),
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    CONSTRAINT uq_features_company_date UNIQUE (company_id, feature_date)
);

CREATE TABLE IF NOT EXISTS model_predictions (
    id BIGSERIAL PRIMARY KEY,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    prediction_date DATE NOT NULL,
    predicted_return NUMERIC(24, 6),
    model_version VARCHAR(128) NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    CONSTRAINT uq_pred_company_date_version
        UNIQUE (company_id, prediction_date, model_version)
);

CREATE TABLE IF NOT EXISTS covariance_matrices (
    id BIGSERIAL PRIMARY KEY,
    calc_date DATE NOT NULL,
    num_assets INTEGER NOT NULL,
    matrix_json TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    CONSTRAINT uq_cov_calc_date UNIQUE (calc_date)
);

CREATE TABLE IF NOT EXISTS optimized_portfolios (
    id BIGSERIAL PRIMARY KEY,
    portfolio_date DATE NOT NULL,
    weights_json TEXT NOT NULL,
    objective_value NUMERIC(24, 6),
    model_version VARCHAR(128) NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    CONSTRAINT uq_portfolio_date_version UNIQUE (portfolio_date, model_version)
);

CREATE TABLE IF NOT EXISTS backtest_results (
    id BIGSERIAL PRIMARY KEY,
    run_id VARCHAR(128) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    sharpe NUMERIC(24, 6),
    max_drawdown NUMERIC(24, 6),
    total_return NUMERIC(24, 6),
    parameters_json TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS etl_runs (
    id BIGSERIAL PRIMARY KEY,
    pipeline_name VARCHAR(256) NOT NULL,
    status VARCHAR(16) NOT NULL CHECK (status IN ('SUCCESS', 'FAILED', 'PARTIAL')),
    rows_processed INTEGER,
    error_message TEXT,
    started_at TIMESTAMP,
    ended_at TIMESTAMP,
    created_at TIMESTAMP NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS financials_balance_sheet (
    id BIGSERIAL PRIMARY KEY,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    fiscal_year INTEGER NOT NULL,
    fiscal_quarter INTEGER NOT NULL,
    report_date DATE NOT NULL,
    total_assets NUMERIC(30, 2),
    total_liabilities NUMERIC(30, 2),
    shareholder_equity NUMERIC(30, 2),
    current_assets NUMERIC(30, 2),
    current_liabilities NUMERIC(30, 2),
    cash_and_equivalents NUMERIC(30, 2),
    inventory NUMERIC(30, 2),
    receivables NUMERIC(30, 2),
    long_term_debt NUMERIC(30, 2),
    short_term_debt NUMERIC(30, 2),
    retained_earnings NUMERIC(30, 2),
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    CONSTRAINT uq_bs_company_fy_fq UNIQUE (company_id, fiscal_year, fiscal_quarter)
);

CREATE TABLE IF NOT EXISTS financials_income_statement (
    id BIGSERIAL PRIMARY KEY,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    fiscal_year INTEGER NOT NULL,
    fiscal_quarter INTEGER NOT NULL,
    report_date DATE NOT NULL,
    revenue NUMERIC(30, 2),
    cost_of_revenue NUMERIC(30, 2),
    gross_profit NUMERIC(30, 2),
    operating_expenses NUMERIC(30, 2),
    operating_income NUMERIC(30, 2),
    interest_expense NUMERIC(30, 2),
    pretax_income NUMERIC(30, 2),
    net_income NUMERIC(30, 2),
    ebit NUMERIC(30, 2),
    ebitda NUMERIC(30, 2),
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    CONSTRAINT uq_is_company_fy_fq UNIQUE (company_id, fiscal_year, fiscal_quarter)
);

CREATE TABLE IF NOT EXISTS financials_cashflow_statement (
    id BIGSERIAL PRIMARY KEY,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    fiscal_year INTEGER NOT NULL,
    fiscal_quarter INTEGER NOT NULL,
    report_date DATE NOT NULL,
    operating_cash_flow NUMERIC(30, 2),
    investing_cash_flow NUMERIC(30, 2),
    financing_cash_flow NUMERIC(30, 2),
    capital_expenditure NUMERIC(30, 2),
    free_cash_flow NUMERIC(30, 2),
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    CONSTRAINT uq_cf_company_fy_fq UNIQUE (company_id, fiscal_year, fiscal_quarter)
);

CREATE TABLE IF NOT EXISTS financial_ratios (
    id BIGSERIAL PRIMARY KEY,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    fiscal_year INTEGER NOT NULL,
    fiscal_quarter INTEGER NOT NULL,
    report_date DATE NOT NULL,
    pe_ratio NUMERIC(24, 8),
    pb_ratio NUMERIC(24, 8),
    roe NUMERIC(24, 8),
    roa NUMERIC(24, 8),
    debt_to_equity NUMERIC(24, 8),
    current_ratio NUMERIC(24, 8),
    quick_ratio NUMERIC(24, 8),
    ebitda_margin NUMERIC(24, 8),
    net_margin NUMERIC(24, 8),
    fcf_yield NUMERIC(24, 8),
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    CONSTRAINT uq_ratios_company_fy_fq UNIQUE (company_id, fiscal_year, fiscal_quarter)
);

CREATE TABLE IF NOT EXISTS exchange_holidays (
    id SERIAL PRIMARY KEY,
    exchange VARCHAR(64) NOT NULL,
    holiday_date DATE NOT NULL,
    description VARCHAR(256),
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    CONSTRAINT uq_exchange_holiday UNIQUE (exchange, holiday_date)
);

CREATE TABLE IF NOT EXISTS model_versions (
    id SERIAL PRIMARY KEY,
    version VARCHAR(128) NOT NULL UNIQUE,
    model_type VARCHAR(64) NOT NULL,
    train_start DATE,
    train_end DATE,
    hyperparams_json TEXT,
    notes TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS events (
    id BIGSERIAL PRIMARY KEY,
    company_id INTEGER REFERENCES companies(id) ON DELETE SET NULL,
    event_date DATE NOT NULL,
    event_type VARCHAR(128),
    event_source VARCHAR(256),
    headline TEXT,
    sentiment_score NUMERIC(24, 8),
    created_at TIMESTAMP NOT NULL DEFAULT now()
);
";

pub struct PostgresAdapter {
    client: RefCell<Client>,
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantledgerError> {
        let connection_string = config
            .get_string("postgres", "connection_string")
            .or_else(|| config.get_string("database", "conninfo"))
            .ok_or_else(|| QuantledgerError::ConfigMissing {
                section: "database".into(),
                key: "conninfo".into(),
            })?;

        let client =
            Client::connect(&connection_string, NoTls).map_err(|e| QuantledgerError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client: RefCell::new(client),
        })
    }
}

fn classify(table: &str, e: postgres::Error) -> QuantledgerError {
    let is_constraint = e.code().is_some_and(|code| {
        *code == SqlState::UNIQUE_VIOLATION
            || *code == SqlState::FOREIGN_KEY_VIOLATION
            || *code == SqlState::CHECK_VIOLATION
            || *code == SqlState::NOT_NULL_VIOLATION
    });
    if is_constraint {
        let constraint = e
            .as_db_error()
            .and_then(|d| d.constraint())
            .unwrap_or("constraint")
            .to_string();
        QuantledgerError::ConstraintViolation {
            table: table.to_string(),
            constraint,
        }
    } else {
        QuantledgerError::DatabaseQuery {
            reason: e.to_string(),
        }
    }
}

fn query_err(e: postgres::Error) -> QuantledgerError {
    QuantledgerError::DatabaseQuery {
        reason: e.to_string(),
    }
}

// NUMERIC columns are cast to double precision on read so rows come back
// as f64, matching the domain structs.
fn company_from_row(row: &postgres::Row) -> Company {
    Company {
        id: row.get::<_, i32>(0) as i64,
        symbol: row.get(1),
        name: row.get(2),
        exchange: row.get(3),
        sector: row.get(4),
        industry: row.get(5),
        isin: row.get(6),
        listing_date: row.get(7),
        created_at: row.get(8),
        updated_at: row.get(9),
    }
}

fn event_from_row(row: &postgres::Row) -> Event {
    Event {
        company_id: row.get::<_, Option<i32>>(0).map(|id| id as i64),
        event_date: row.get(1),
        event_type: row.get(2),
        event_source: row.get(3),
        headline: row.get(4),
        sentiment_score: row.get(5),
    }
}

impl StorePort for PostgresAdapter {
    fn initialize_schema(&self) -> Result<(), QuantledgerError> {
        self.client
            .borrow_mut()
            .batch_execute(SCHEMA_SQL)
            .map_err(query_err)?;
        tracing::info!("schema initialized");
        Ok(())
    }

    fn insert_company(&self, company: &NewCompany) -> Result<i64, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO companies
                     (symbol, name, exchange, sector, industry, isin, listing_date)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING id",
                &[
                    &company.symbol,
                    &company.name,
                    &company.exchange,
                    &company.sector,
                    &company.industry,
                    &company.isin,
                    &company.listing_date,
                ],
            )
            .map_err(|e| classify("companies", e))?;
        Ok(row.get::<_, i32>(0) as i64)
    }

    fn ensure_company(&self, company: &NewCompany) -> Result<i64, QuantledgerError> {
        if let Some(existing) = self.find_company(&company.symbol, &company.exchange)? {
            return Ok(existing.id);
        }
        self.insert_company(company)
    }

    fn find_company(
        &self,
        symbol: &str,
        exchange: &str,
    ) -> Result<Option<Company>, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_opt(
                "SELECT id, symbol, name, exchange, sector, industry, isin,
                        listing_date, created_at, updated_at
                 FROM companies WHERE symbol = $1 AND exchange = $2",
                &[&symbol, &exchange],
            )
            .map_err(query_err)?;
        Ok(row.as_ref().map(company_from_row))
    }

    fn list_companies(&self, exchange: Option<&str>) -> Result<Vec<Company>, QuantledgerError> {
        let base = "SELECT id, symbol, name, exchange, sector, industry, isin,
                           listing_date, created_at, updated_at
                    FROM companies";
        let rows = match exchange {
            Some(ex) => self
                .client
                .borrow_mut()
                .query(
                    format!("{base} WHERE exchange = $1 ORDER BY symbol").as_str(),
                    &[&ex],
                )
                .map_err(query_err)?,
            None => self
                .client
                .borrow_mut()
                .query(format!("{base} ORDER BY exchange, symbol").as_str(), &[])
                .map_err(query_err)?,
        };
        Ok(rows.iter().map(company_from_row).collect())
    }

    fn update_company(&self, company: &Company) -> Result<(), QuantledgerError> {
        self.client
            .borrow_mut()
            .execute(
                "UPDATE companies
                 SET name = $1, sector = $2, industry = $3, isin = $4,
                     listing_date = $5, updated_at = now()
                 WHERE id = $6",
                &[
                    &company.name,
                    &company.sector,
                    &company.industry,
                    &company.isin,
                    &company.listing_date,
                    &(company.id as i32),
                ],
            )
            .map_err(|e| classify("companies", e))?;
        Ok(())
    }

    fn delete_company(&self, company_id: i64) -> Result<(), QuantledgerError> {
        self.client
            .borrow_mut()
            .execute(
                "DELETE FROM companies WHERE id = $1",
                &[&(company_id as i32)],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn company_fact_counts(&self, company_id: i64) -> Result<CompanyFacts, QuantledgerError> {
        let id = company_id as i32;
        let count = |table: &str| -> Result<usize, QuantledgerError> {
            let row = self
                .client
                .borrow_mut()
                .query_one(
                    format!("SELECT COUNT(*) FROM {table} WHERE company_id = $1").as_str(),
                    &[&id],
                )
                .map_err(query_err)?;
            Ok(row.get::<_, i64>(0) as usize)
        };
        Ok(CompanyFacts {
            prices: count("price_history")?,
            corporate_actions: count("corporate_actions")?,
            features: count("features_daily")?,
            predictions: count("model_predictions")?,
            balance_sheets: count("financials_balance_sheet")?,
            income_statements: count("financials_income_statement")?,
            cashflow_statements: count("financials_cashflow_statement")?,
            ratios: count("financial_ratios")?,
        })
    }

    fn insert_prices(&self, rows: &[PriceRow]) -> Result<usize, QuantledgerError> {
        let mut client = self.client.borrow_mut();
        let mut tx = client.transaction().map_err(query_err)?;
        for row in rows {
            tx.execute(
                "INSERT INTO price_history
                     (company_id, trade_date, open, high, low, close, adj_close, volume)
                 VALUES ($1, $2, $3::float8, $4::float8, $5::float8, $6::float8, $7::float8, $8)",
                &[
                    &(row.company_id as i32),
                    &row.trade_date,
                    &row.open,
                    &row.high,
                    &row.low,
                    &row.close,
                    &row.adj_close,
                    &row.volume,
                ],
            )
            .map_err(|e| classify("price_history", e))?;
        }
        tx.commit().map_err(query_err)?;
        Ok(rows.len())
    }

    fn insert_missing_prices(&self, rows: &[PriceRow]) -> Result<usize, QuantledgerError> {
        let mut client = self.client.borrow_mut();
        let mut tx = client.transaction().map_err(query_err)?;
        let mut inserted = 0usize;
        for row in rows {
            inserted += tx
                .execute(
                    "INSERT INTO price_history
                         (company_id, trade_date, open, high, low, close, adj_close, volume)
                     VALUES ($1, $2, $3::float8, $4::float8, $5::float8, $6::float8, $7::float8, $8)
                     ON CONFLICT (company_id, trade_date) DO NOTHING",
                    &[
                        &(row.company_id as i32),
                        &row.trade_date,
                        &row.open,
                        &row.high,
                        &row.low,
                        &row.close,
                        &row.adj_close,
                        &row.volume,
                    ],
                )
                .map_err(query_err)? as usize;
        }
        tx.commit().map_err(query_err)?;
        Ok(inserted)
    }

    fn existing_trade_dates(&self, company_id: i64) -> Result<Vec<NaiveDate>, QuantledgerError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT trade_date FROM price_history
                 WHERE company_id = $1 ORDER BY trade_date",
                &[&(company_id as i32)],
            )
            .map_err(query_err)?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    fn fetch_prices(
        &self,
        company_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceRow>, QuantledgerError> {
        let params: &[&(dyn ToSql + Sync)] = &[&(company_id as i32), &start_date, &end_date];
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT company_id, trade_date,
                        open::double precision, high::double precision,
                        low::double precision, close::double precision,
                        adj_close::double precision, volume
                 FROM price_history
                 WHERE company_id = $1 AND trade_date >= $2 AND trade_date <= $3
                 ORDER BY trade_date ASC",
                params,
            )
            .map_err(query_err)?;
        Ok(rows
            .iter()
            .map(|row| PriceRow {
                company_id: row.get::<_, i32>(0) as i64,
                trade_date: row.get(1),
                open: row.get(2),
                high: row.get(3),
                low: row.get(4),
                close: row.get(5),
                adj_close: row.get(6),
                volume: row.get(7),
            })
            .collect())
    }

    fn price_range(
        &self,
        company_id: i64,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_one(
                "SELECT MIN(trade_date), MAX(trade_date), COUNT(*)
                 FROM price_history WHERE company_id = $1",
                &[&(company_id as i32)],
            )
            .map_err(query_err)?;
        let min: Option<NaiveDate> = row.get(0);
        let max: Option<NaiveDate> = row.get(1);
        let count: i64 = row.get(2);
        match (min, max) {
            (Some(min), Some(max)) if count > 0 => Ok(Some((min, max, count as usize))),
            _ => Ok(None),
        }
    }

    fn insert_corporate_action(&self, action: &CorporateAction) -> Result<i64, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO corporate_actions
                     (company_id, action_type, action_date, value, ratio_from, ratio_to)
                 VALUES ($1, $2, $3, $4::float8, $5, $6)
                 RETURNING id",
                &[
                    &(action.company_id as i32),
                    &action.action_type.as_str(),
                    &action.action_date,
                    &action.value,
                    &action.ratio_from,
                    &action.ratio_to,
                ],
            )
            .map_err(|e| classify("corporate_actions", e))?;
        Ok(row.get(0))
    }

    fn corporate_actions_for(
        &self,
        company_id: i64,
    ) -> Result<Vec<CorporateAction>, QuantledgerError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT company_id, action_type, action_date,
                        value::double precision, ratio_from, ratio_to
                 FROM corporate_actions WHERE company_id = $1 ORDER BY action_date",
                &[&(company_id as i32)],
            )
            .map_err(query_err)?;
        let mut actions = Vec::with_capacity(rows.len());
        for row in &rows {
            let type_str: &str = row.get(1);
            let action_type = ActionType::from_str(type_str)?;
            actions.push(CorporateAction {
                company_id: row.get::<_, i32>(0) as i64,
                action_type,
                action_date: row.get(2),
                value: row.get(3),
                ratio_from: row.get(4),
                ratio_to: row.get(5),
            });
        }
        Ok(actions)
    }

    fn insert_feature(&self, feature: &DailyFeature) -> Result<i64, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO features_daily
                     (company_id, feature_date, return_1d, return_5d, return_10d, return_21d,
                      volatility_10d, volatility_20d, volatility_60d,
                      momentum_14d, volume_change_5d)
                 VALUES ($1, $2, $3::float8, $4::float8, $5::float8, $6::float8, $7::float8,
                         $8::float8, $9::float8, $10::float8, $11::float8)
                 RETURNING id",
                &[
                    &(feature.company_id as i32),
                    &feature.feature_date,
                    &feature.return_1d,
                    &feature.return_5d,
                    &feature.return_10d,
                    &feature.return_21d,
                    &feature.volatility_10d,
                    &feature.volatility_20d,
                    &feature.volatility_60d,
                    &feature.momentum_14d,
                    &feature.volume_change_5d,
                ],
            )
            .map_err(|e| classify("features_daily", e))?;
        Ok(row.get(0))
    }

    fn replace_feature(&self, feature: &DailyFeature) -> Result<(), QuantledgerError> {
        self.client
            .borrow_mut()
            .execute(
                "INSERT INTO features_daily
                     (company_id, feature_date, return_1d, return_5d, return_10d, return_21d,
                      volatility_10d, volatility_20d, volatility_60d,
                      momentum_14d, volume_change_5d)
                 VALUES ($1, $2, $3::float8, $4::float8, $5::float8, $6::float8, $7::float8,
                         $8::float8, $9::float8, $10::float8, $11::float8)
                 ON CONFLICT (company_id, feature_date) DO UPDATE SET
                     return_1d = excluded.return_1d,
                     return_5d = excluded.return_5d,
                     return_10d = excluded.return_10d,
                     return_21d = excluded.return_21d,
                     volatility_10d = excluded.volatility_10d,
                     volatility_20d = excluded.volatility_20d,
                     volatility_60d = excluded.volatility_60d,
                     momentum_14d = excluded.momentum_14d,
                     volume_change_5d = excluded.volume_change_5d",
                &[
                    &(feature.company_id as i32),
                    &feature.feature_date,
                    &feature.return_1d,
                    &feature.return_5d,
                    &feature.return_10d,
                    &feature.return_21d,
                    &feature.volatility_10d,
                    &feature.volatility_20d,
                    &feature.volatility_60d,
                    &feature.momentum_14d,
                    &feature.volume_change_5d,
                ],
            )
            .map_err(|e| classify("features_daily", e))?;
        Ok(())
    }

    fn insert_prediction(&self, prediction: &ModelPrediction) -> Result<i64, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO model_predictions
                     (company_id, prediction_date, predicted_return, model_version)
                 VALUES ($1, $2, $3::float8, $4)
                 RETURNING id",
                &[
                    &(prediction.company_id as i32),
                    &prediction.prediction_date,
                    &prediction.predicted_return,
                    &prediction.model_version,
                ],
            )
            .map_err(|e| classify("model_predictions", e))?;
        Ok(row.get(0))
    }

    fn predictions_on(
        &self,
        company_id: i64,
        prediction_date: NaiveDate,
    ) -> Result<Vec<ModelPrediction>, QuantledgerError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT company_id, prediction_date,
                        predicted_return::double precision, model_version
                 FROM model_predictions
                 WHERE company_id = $1 AND prediction_date = $2
                 ORDER BY model_version",
                &[&(company_id as i32), &prediction_date],
            )
            .map_err(query_err)?;
        Ok(rows
            .iter()
            .map(|row| ModelPrediction {
                company_id: row.get::<_, i32>(0) as i64,
                prediction_date: row.get(1),
                predicted_return: row.get(2),
                model_version: row.get(3),
            })
            .collect())
    }

    fn insert_model_version(&self, version: &ModelVersion) -> Result<i64, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO model_versions
                     (version, model_type, train_start, train_end, hyperparams_json, notes)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id",
                &[
                    &version.version,
                    &version.model_type,
                    &version.train_start,
                    &version.train_end,
                    &version.hyperparams_json,
                    &version.notes,
                ],
            )
            .map_err(|e| classify("model_versions", e))?;
        Ok(row.get::<_, i32>(0) as i64)
    }

    fn find_model_version(&self, version: &str) -> Result<Option<ModelVersion>, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_opt(
                "SELECT version, model_type, train_start, train_end, hyperparams_json, notes
                 FROM model_versions WHERE version = $1",
                &[&version],
            )
            .map_err(query_err)?;
        Ok(row.map(|row| ModelVersion {
            version: row.get(0),
            model_type: row.get(1),
            train_start: row.get(2),
            train_end: row.get(3),
            hyperparams_json: row.get(4),
            notes: row.get(5),
        }))
    }

    fn insert_covariance(&self, snapshot: &CovarianceSnapshot) -> Result<i64, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO covariance_matrices (calc_date, num_assets, matrix_json)
                 VALUES ($1, $2, $3)
                 RETURNING id",
                &[
                    &snapshot.calc_date,
                    &snapshot.num_assets,
                    &snapshot.matrix_json,
                ],
            )
            .map_err(|e| classify("covariance_matrices", e))?;
        Ok(row.get(0))
    }

    fn covariance_on(
        &self,
        calc_date: NaiveDate,
    ) -> Result<Option<CovarianceSnapshot>, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_opt(
                "SELECT calc_date, num_assets, matrix_json
                 FROM covariance_matrices WHERE calc_date = $1",
                &[&calc_date],
            )
            .map_err(query_err)?;
        Ok(row.map(|row| CovarianceSnapshot {
            calc_date: row.get(0),
            num_assets: row.get(1),
            matrix_json: row.get(2),
        }))
    }

    fn insert_portfolio(&self, portfolio: &OptimizedPortfolio) -> Result<i64, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO optimized_portfolios
                     (portfolio_date, weights_json, objective_value, model_version)
                 VALUES ($1, $2, $3::float8, $4)
                 RETURNING id",
                &[
                    &portfolio.portfolio_date,
                    &portfolio.weights_json,
                    &portfolio.objective_value,
                    &portfolio.model_version,
                ],
            )
            .map_err(|e| classify("optimized_portfolios", e))?;
        Ok(row.get(0))
    }

    fn portfolio_on(
        &self,
        portfolio_date: NaiveDate,
        model_version: &str,
    ) -> Result<Option<OptimizedPortfolio>, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_opt(
                "SELECT portfolio_date, weights_json,
                        objective_value::double precision, model_version
                 FROM optimized_portfolios
                 WHERE portfolio_date = $1 AND model_version = $2",
                &[&portfolio_date, &model_version],
            )
            .map_err(query_err)?;
        Ok(row.map(|row| OptimizedPortfolio {
            portfolio_date: row.get(0),
            weights_json: row.get(1),
            objective_value: row.get(2),
            model_version: row.get(3),
        }))
    }

    fn insert_backtest_run(&self, run: &BacktestRun) -> Result<i64, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO backtest_results
                     (run_id, start_date, end_date, sharpe, max_drawdown,
                      total_return, parameters_json)
                 VALUES ($1, $2, $3, $4::float8, $5::float8, $6::float8, $7)
                 RETURNING id",
                &[
                    &run.run_id,
                    &run.start_date,
                    &run.end_date,
                    &run.sharpe,
                    &run.max_drawdown,
                    &run.total_return,
                    &run.parameters_json,
                ],
            )
            .map_err(|e| classify("backtest_results", e))?;
        Ok(row.get(0))
    }

    fn backtest_runs(&self, run_id: &str) -> Result<Vec<BacktestRun>, QuantledgerError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT run_id, start_date, end_date,
                        sharpe::double precision, max_drawdown::double precision,
                        total_return::double precision, parameters_json
                 FROM backtest_results WHERE run_id = $1 ORDER BY id",
                &[&run_id],
            )
            .map_err(query_err)?;
        Ok(rows
            .iter()
            .map(|row| BacktestRun {
                run_id: row.get(0),
                start_date: row.get(1),
                end_date: row.get(2),
                sharpe: row.get(3),
                max_drawdown: row.get(4),
                total_return: row.get(5),
                parameters_json: row.get(6),
            })
            .collect())
    }

    fn insert_balance_sheet(&self, row: &BalanceSheet) -> Result<i64, QuantledgerError> {
        let result = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO financials_balance_sheet
                     (company_id, fiscal_year, fiscal_quarter, report_date,
                      total_assets, total_liabilities, shareholder_equity,
                      current_assets, current_liabilities, cash_and_equivalents,
                      inventory, receivables, long_term_debt, short_term_debt,
                      retained_earnings)
                 VALUES ($1, $2, $3, $4, $5::float8, $6::float8, $7::float8, $8::float8,
                         $9::float8, $10::float8, $11::float8, $12::float8, $13::float8,
                         $14::float8, $15::float8)
                 RETURNING id",
                &[
                    &(row.company_id as i32),
                    &row.fiscal_year,
                    &row.fiscal_quarter,
                    &row.report_date,
                    &row.total_assets,
                    &row.total_liabilities,
                    &row.shareholder_equity,
                    &row.current_assets,
                    &row.current_liabilities,
                    &row.cash_and_equivalents,
                    &row.inventory,
                    &row.receivables,
                    &row.long_term_debt,
                    &row.short_term_debt,
                    &row.retained_earnings,
                ],
            )
            .map_err(|e| classify("financials_balance_sheet", e))?;
        Ok(result.get(0))
    }

    fn insert_income_statement(&self, row: &IncomeStatement) -> Result<i64, QuantledgerError> {
        let result = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO financials_income_statement
                     (company_id, fiscal_year, fiscal_quarter, report_date,
                      revenue, cost_of_revenue, gross_profit, operating_expenses,
                      operating_income, interest_expense, pretax_income, net_income,
                      ebit, ebitda)
                 VALUES ($1, $2, $3, $4, $5::float8, $6::float8, $7::float8, $8::float8,
                         $9::float8, $10::float8, $11::float8, $12::float8, $13::float8,
                         $14::float8)
                 RETURNING id",
                &[
                    &(row.company_id as i32),
                    &row.fiscal_year,
                    &row.fiscal_quarter,
                    &row.report_date,
                    &row.revenue,
                    &row.cost_of_revenue,
                    &row.gross_profit,
                    &row.operating_expenses,
                    &row.operating_income,
                    &row.interest_expense,
                    &row.pretax_income,
                    &row.net_income,
                    &row.ebit,
                    &row.ebitda,
                ],
            )
            .map_err(|e| classify("financials_income_statement", e))?;
        Ok(result.get(0))
    }

    fn insert_cashflow_statement(&self, row: &CashflowStatement) -> Result<i64, QuantledgerError> {
        let result = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO financials_cashflow_statement
                     (company_id, fiscal_year, fiscal_quarter, report_date,
                      operating_cash_flow, investing_cash_flow, financing_cash_flow,
                      capital_expenditure, free_cash_flow)
                 VALUES ($1, $2, $3, $4, $5::float8, $6::float8, $7::float8, $8::float8,
                         $9::float8)
                 RETURNING id",
                &[
                    &(row.company_id as i32),
                    &row.fiscal_year,
                    &row.fiscal_quarter,
                    &row.report_date,
                    &row.operating_cash_flow,
                    &row.investing_cash_flow,
                    &row.financing_cash_flow,
                    &row.capital_expenditure,
                    &row.free_cash_flow,
                ],
            )
            .map_err(|e| classify("financials_cashflow_statement", e))?;
        Ok(result.get(0))
    }

    fn replace_ratios(&self, row: &FinancialRatios) -> Result<(), QuantledgerError> {
        self.client
            .borrow_mut()
            .execute(
                "INSERT INTO financial_ratios
                     (company_id, fiscal_year, fiscal_quarter, report_date,
                      pe_ratio, pb_ratio, roe, roa, debt_to_equity, current_ratio,
                      quick_ratio, ebitda_margin, net_margin, fcf_yield)
                 VALUES ($1, $2, $3, $4, $5::float8, $6::float8, $7::float8, $8::float8,
                         $9::float8, $10::float8, $11::float8, $12::float8, $13::float8,
                         $14::float8)
                 ON CONFLICT (company_id, fiscal_year, fiscal_quarter) DO UPDATE SET
                     report_date = excluded.report_date,
                     pe_ratio = excluded.pe_ratio,
                     pb_ratio = excluded.pb_ratio,
                     roe = excluded.roe,
                     roa = excluded.roa,
                     debt_to_equity = excluded.debt_to_equity,
                     current_ratio = excluded.current_ratio,
                     quick_ratio = excluded.quick_ratio,
                     ebitda_margin = excluded.ebitda_margin,
                     net_margin = excluded.net_margin,
                     fcf_yield = excluded.fcf_yield",
                &[
                    &(row.company_id as i32),
                    &row.fiscal_year,
                    &row.fiscal_quarter,
                    &row.report_date,
                    &row.pe_ratio,
                    &row.pb_ratio,
                    &row.roe,
                    &row.roa,
                    &row.debt_to_equity,
                    &row.current_ratio,
                    &row.quick_ratio,
                    &row.ebitda_margin,
                    &row.net_margin,
                    &row.fcf_yield,
                ],
            )
            .map_err(|e| classify("financial_ratios", e))?;
        Ok(())
    }

    fn insert_holiday(&self, holiday: &ExchangeHoliday) -> Result<i64, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO exchange_holidays (exchange, holiday_date, description)
                 VALUES ($1, $2, $3)
                 RETURNING id",
                &[
                    &holiday.exchange,
                    &holiday.holiday_date,
                    &holiday.description,
                ],
            )
            .map_err(|e| classify("exchange_holidays", e))?;
        Ok(row.get::<_, i32>(0) as i64)
    }

    fn list_holidays(&self, exchange: &str) -> Result<Vec<ExchangeHoliday>, QuantledgerError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT exchange, holiday_date, description
                 FROM exchange_holidays WHERE exchange = $1 ORDER BY holiday_date",
                &[&exchange],
            )
            .map_err(query_err)?;
        Ok(rows
            .iter()
            .map(|row| ExchangeHoliday {
                exchange: row.get(0),
                holiday_date: row.get(1),
                description: row.get(2),
            })
            .collect())
    }

    fn insert_event(&self, event: &Event) -> Result<i64, QuantledgerError> {
        let company_id = event.company_id.map(|id| id as i32);
        let row = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO events
                     (company_id, event_date, event_type, event_source,
                      headline, sentiment_score)
                 VALUES ($1, $2, $3, $4, $5, $6::float8)
                 RETURNING id",
                &[
                    &company_id,
                    &event.event_date,
                    &event.event_type,
                    &event.event_source,
                    &event.headline,
                    &event.sentiment_score,
                ],
            )
            .map_err(|e| classify("events", e))?;
        Ok(row.get(0))
    }

    fn events_for_company(&self, company_id: i64) -> Result<Vec<Event>, QuantledgerError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT company_id, event_date, event_type, event_source,
                        headline, sentiment_score::double precision
                 FROM events WHERE company_id = $1 ORDER BY event_date",
                &[&(company_id as i32)],
            )
            .map_err(query_err)?;
        Ok(rows.iter().map(event_from_row).collect())
    }

    fn events_on(&self, event_date: NaiveDate) -> Result<Vec<Event>, QuantledgerError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT company_id, event_date, event_type, event_source,
                        headline, sentiment_score::double precision
                 FROM events WHERE event_date = $1 ORDER BY id",
                &[&event_date],
            )
            .map_err(query_err)?;
        Ok(rows.iter().map(event_from_row).collect())
    }

    fn log_run(&self, run: &EtlRun) -> Result<i64, QuantledgerError> {
        let row = self
            .client
            .borrow_mut()
            .query_one(
                "INSERT INTO etl_runs
                     (pipeline_name, status, rows_processed, error_message,
                      started_at, ended_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id",
                &[
                    &run.pipeline_name,
                    &run.status.as_str(),
                    &run.rows_processed,
                    &run.error_message,
                    &run.started_at,
                    &run.ended_at,
                ],
            )
            .map_err(|e| classify("etl_runs", e))?;
        Ok(row.get(0))
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<EtlRun>, QuantledgerError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT pipeline_name, status, rows_processed, error_message,
                        started_at, ended_at
                 FROM etl_runs ORDER BY id DESC LIMIT $1",
                &[&(limit as i64)],
            )
            .map_err(query_err)?;
        let mut runs = Vec::with_capacity(rows.len());
        for row in &rows {
            let status_str: &str = row.get(1);
            runs.push(EtlRun {
                pipeline_name: row.get(0),
                status: RunStatus::from_str(status_str)?,
                rows_processed: row.get(2),
                error_message: row.get(3),
                started_at: row.get(4),
                ended_at: row.get(5),
            });
        }
        Ok(runs)
    }
}
