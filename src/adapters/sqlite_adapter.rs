//! SQLite store adapter.
//!
//! Dates are stored as ISO-8601 TEXT, NUMERIC columns map to REAL, and the
//! enumerations become CHECK constraints. Foreign keys are switched on for
//! every pooled connection; without the pragma SQLite would silently skip
//! the cascade and detach rules.

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
use chrono::{NaiveDate, NaiveDateTime};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::str::FromStr;

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS companies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    name TEXT,
    exchange TEXT NOT NULL,
    sector TEXT,
    industry TEXT,
    isin TEXT UNIQUE,
    listing_date TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    CONSTRAINT uq_symbol_exchange UNIQUE (symbol, exchange)
);

CREATE TABLE IF NOT EXISTS corporate_actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    action_type TEXT NOT NULL
        CHECK (action_type IN ('DIVIDEND', 'SPLIT', 'BONUS', 'RIGHTS')),
    action_date TEXT NOT NULL,
    value REAL,
    ratio_from INTEGER,
    ratio_to INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS price_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    trade_date TEXT NOT NULL,
    open REAL,
    high REAL,
    low REAL,
    close REAL,
    adj_close REAL,
    volume INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CONSTRAINT uq_price_company_date UNIQUE (company_id, trade_date)
);
CREATE INDEX IF NOT EXISTS idx_price_company_date
    ON price_history(company_id, trade_date);

CREATE TABLE IF NOT EXISTS features_daily (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    feature_date TEXT NOT NULL,
    return_1d REAL,
    return_5d REAL,
    return_10d REAL,
    return_21d REAL,
    volatility_10d REAL,
    volatility_20d REAL,
    volatility_60d REAL,
    momentum_14d REAL,
    volume_change_5d REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CONSTRAINT uq_features_company_date UNIQUE (company_id, feature_date)
);

CREATE TABLE IF NOT EXISTS model_predictions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    prediction_date TEXT NOT NULL,
    predicted_return REAL,
    model_version TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CONSTRAINT uq_pred_company_date_version
        UNIQUE (company_id, prediction_date, model_version)
);

CREATE TABLE IF NOT EXISTS covariance_matrices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    calc_date TEXT NOT NULL,
    num_assets INTEGER NOT NULL,
    matrix_json TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CONSTRAINT uq_cov_calc_date UNIQUE (calc_date)
);

CREATE TABLE IF NOT EXISTS optimized_portfolios (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    portfolio_date TEXT NOT NULL,
    weights_json TEXT NOT NULL,
    objective_value REAL,
    model_version TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CONSTRAINT uq_portfolio_date_version UNIQUE (portfolio_date, model_version)
);

CREATE TABLE IF NOT EXISTS backtest_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    sharpe REAL,
    max_drawdown REAL,
    total_return REAL,
    parameters_json TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS etl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pipeline_name TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('SUCCESS', 'FAILED', 'PARTIAL')),
    rows_processed INTEGER,
    error_message TEXT,
    started_at TEXT,
    ended_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS financials_balance_sheet (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    fiscal_year INTEGER NOT NULL,
    fiscal_quarter INTEGER NOT NULL,
    report_date TEXT NOT NULL,
    total_assets REAL,
    total_liabilities REAL,
    shareholder_equity REAL,
    current_assets REAL,
    current_liabilities REAL,
    cash_and_equivalents REAL,
    inventory REAL,
    receivables REAL,
    long_term_debt REAL,
    short_term_debt REAL,
    retained_earnings REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CONSTRAINT uq_bs_company_fy_fq UNIQUE (company_id, fiscal_year, fiscal_quarter)
);

CREATE TABLE IF NOT EXISTS financials_income_statement (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    fiscal_year INTEGER NOT NULL,
    fiscal_quarter INTEGER NOT NULL,
    report_date TEXT NOT NULL,
    revenue REAL,
    cost_of_revenue REAL,
    gross_profit REAL,
    operating_expenses REAL,
    operating_income REAL,
    interest_expense REAL,
    pretax_income REAL,
    net_income REAL,
    ebit REAL,
    ebitda REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CONSTRAINT uq_is_company_fy_fq UNIQUE (company_id, fiscal_year, fiscal_quarter)
);

CREATE TABLE IF NOT EXISTS financials_cashflow_statement (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    fiscal_year INTEGER NOT NULL,
    fiscal_quarter INTEGER NOT NULL,
    report_date TEXT NOT NULL,
    operating_cash_flow REAL,
    investing_cash_flow REAL,
    financing_cash_flow REAL,
    capital_expenditure REAL,
    free_cash_flow REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CONSTRAINT uq_cf_company_fy_fq UNIQUE (company_id, fiscal_year, fiscal_quarter)
);

CREATE TABLE IF NOT EXISTS financial_ratios (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    fiscal_year INTEGER NOT NULL,
    fiscal_quarter INTEGER NOT NULL,
    report_date TEXT NOT NULL,
    pe_ratio REAL,
    pb_ratio REAL,
    roe REAL,
    roa REAL,
    debt_to_equity REAL,
    current_ratio REAL,
    quick_ratio REAL,
    ebitda_margin REAL,
    net_margin REAL,
    fcf_yield REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CONSTRAINT uq_ratios_company_fy_fq UNIQUE (company_id, fiscal_year, fiscal_quarter)
);

CREATE TABLE IF NOT EXISTS exchange_holidays (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    exchange TEXT NOT NULL,
    holiday_date TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CONSTRAINT uq_exchange_holiday UNIQUE (exchange, holiday_date)
);

CREATE TABLE IF NOT EXISTS model_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version TEXT NOT NULL UNIQUE,
    model_type TEXT NOT NULL,
    train_start TEXT,
    train_end TEXT,
    hyperparams_json TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id INTEGER REFERENCES companies(id) ON DELETE SET NULL,
    event_date TEXT NOT NULL,
    event_type TEXT,
    event_source TEXT,
    headline TEXT,
    sentiment_score REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn build_pool(
    manager: SqliteConnectionManager,
    pool_size: u32,
) -> Result<Pool<SqliteConnectionManager>, QuantledgerError> {
    let manager = manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    Pool::builder()
        .max_size(pool_size)
        .build(manager)
        .map_err(|e: r2d2::Error| QuantledgerError::Database {
            reason: e.to_string(),
        })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantledgerError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| QuantledgerError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;
        let pool = build_pool(SqliteConnectionManager::file(&db_path), pool_size)?;
        Ok(Self { pool })
    }

    /// Single-connection in-memory store, used by tests and `--dry-run`
    /// style checks.
    pub fn in_memory() -> Result<Self, QuantledgerError> {
        let pool = build_pool(SqliteConnectionManager::memory(), 1)?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, QuantledgerError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| QuantledgerError::Database {
                reason: e.to_string(),
            })
    }
}

/// Constraint failures become [`QuantledgerError::ConstraintViolation`] so
/// callers can distinguish a duplicate key from an I/O problem; everything
/// else is a query error.
fn classify(table: &str, e: rusqlite::Error) -> QuantledgerError {
    match &e {
        rusqlite::Error::SqliteFailure(code, message)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            QuantledgerError::ConstraintViolation {
                table: table.to_string(),
                constraint: message.clone().unwrap_or_else(|| e.to_string()),
            }
        }
        _ => QuantledgerError::DatabaseQuery {
            reason: e.to_string(),
        },
    }
}

fn query_err(e: rusqlite::Error) -> QuantledgerError {
    QuantledgerError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn sql_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

fn sql_datetime(t: NaiveDateTime) -> String {
    t.format(DATETIME_FMT).to_string()
}

fn read_date(s: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(s.len(), rusqlite::types::Type::Text, Box::new(e))
    })
}

fn read_datetime(s: &str) -> Result<NaiveDateTime, rusqlite::Error> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(s.len(), rusqlite::types::Type::Text, Box::new(e))
    })
}

fn company_from_row(row: &rusqlite::Row<'_>) -> Result<Company, rusqlite::Error> {
    let listing: Option<String> = row.get(7)?;
    let created: String = row.get(8)?;
    let updated: String = row.get(9)?;
    Ok(Company {
        id: row.get(0)?,
        symbol: row.get(1)?,
        name: row.get(2)?,
        exchange: row.get(3)?,
        sector: row.get(4)?,
        industry: row.get(5)?,
        isin: row.get(6)?,
        listing_date: listing.as_deref().map(read_date).transpose()?,
        created_at: read_datetime(&created)?,
        updated_at: read_datetime(&updated)?,
    })
}

impl StorePort for SqliteAdapter {
    fn initialize_schema(&self) -> Result<(), QuantledgerError> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL).map_err(query_err)?;
        tracing::info!("schema initialized");
        Ok(())
    }

    fn insert_company(&self, company: &NewCompany) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO companies (symbol, name, exchange, sector, industry, isin, listing_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                company.symbol,
                company.name,
                company.exchange,
                company.sector,
                company.industry,
                company.isin,
                company.listing_date.map(sql_date),
            ],
        )
        .map_err(|e| classify("companies", e))?;
        Ok(conn.last_insert_rowid())
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
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, symbol, name, exchange, sector, industry, isin,
                        listing_date, created_at, updated_at
                 FROM companies WHERE symbol = ?1 AND exchange = ?2",
            )
            .map_err(query_err)?;
        let mut rows = stmt
            .query_map(params![symbol, exchange], company_from_row)
            .map_err(query_err)?;
        rows.next().transpose().map_err(query_err)
    }

    fn list_companies(&self, exchange: Option<&str>) -> Result<Vec<Company>, QuantledgerError> {
        let conn = self.conn()?;
        let base = "SELECT id, symbol, name, exchange, sector, industry, isin,
                           listing_date, created_at, updated_at
                    FROM companies";
        let mut companies = Vec::new();
        match exchange {
            Some(ex) => {
                let mut stmt = conn
                    .prepare(&format!("{base} WHERE exchange = ?1 ORDER BY symbol"))
                    .map_err(query_err)?;
                let rows = stmt
                    .query_map(params![ex], company_from_row)
                    .map_err(query_err)?;
                for row in rows {
                    companies.push(row.map_err(query_err)?);
                }
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!("{base} ORDER BY exchange, symbol"))
                    .map_err(query_err)?;
                let rows = stmt.query_map([], company_from_row).map_err(query_err)?;
                for row in rows {
                    companies.push(row.map_err(query_err)?);
                }
            }
        }
        Ok(companies)
    }

    fn update_company(&self, company: &Company) -> Result<(), QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE companies
             SET name = ?1, sector = ?2, industry = ?3, isin = ?4,
                 listing_date = ?5, updated_at = datetime('now')
             WHERE id = ?6",
            params![
                company.name,
                company.sector,
                company.industry,
                company.isin,
                company.listing_date.map(sql_date),
                company.id,
            ],
        )
        .map_err(|e| classify("companies", e))?;
        Ok(())
    }

    fn delete_company(&self, company_id: i64) -> Result<(), QuantledgerError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM companies WHERE id = ?1", params![company_id])
            .map_err(query_err)?;
        Ok(())
    }

    fn company_fact_counts(&self, company_id: i64) -> Result<CompanyFacts, QuantledgerError> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<usize, QuantledgerError> {
            let n: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {table} WHERE company_id = ?1"),
                    params![company_id],
                    |row| row.get(0),
                )
                .map_err(query_err)?;
            Ok(n as usize)
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
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for row in rows {
            tx.execute(
                "INSERT INTO price_history
                     (company_id, trade_date, open, high, low, close, adj_close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.company_id,
                    sql_date(row.trade_date),
                    row.open,
                    row.high,
                    row.low,
                    row.close,
                    row.adj_close,
                    row.volume,
                ],
            )
            .map_err(|e| classify("price_history", e))?;
        }
        tx.commit().map_err(query_err)?;
        Ok(rows.len())
    }

    fn insert_missing_prices(&self, rows: &[PriceRow]) -> Result<usize, QuantledgerError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        let mut inserted = 0;
        for row in rows {
            inserted += tx
                .execute(
                    "INSERT OR IGNORE INTO price_history
                         (company_id, trade_date, open, high, low, close, adj_close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        row.company_id,
                        sql_date(row.trade_date),
                        row.open,
                        row.high,
                        row.low,
                        row.close,
                        row.adj_close,
                        row.volume,
                    ],
                )
                .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(inserted)
    }

    fn existing_trade_dates(&self, company_id: i64) -> Result<Vec<NaiveDate>, QuantledgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT trade_date FROM price_history
                 WHERE company_id = ?1 ORDER BY trade_date",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![company_id], |row| {
                let s: String = row.get(0)?;
                read_date(&s)
            })
            .map_err(query_err)?;
        let mut dates = Vec::new();
        for row in rows {
            dates.push(row.map_err(query_err)?);
        }
        Ok(dates)
    }

    fn fetch_prices(
        &self,
        company_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceRow>, QuantledgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT company_id, trade_date, open, high, low, close, adj_close, volume
                 FROM price_history
                 WHERE company_id = ?1 AND trade_date >= ?2 AND trade_date <= ?3
                 ORDER BY trade_date ASC",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(
                params![company_id, sql_date(start_date), sql_date(end_date)],
                |row| {
                    let date_str: String = row.get(1)?;
                    Ok(PriceRow {
                        company_id: row.get(0)?,
                        trade_date: read_date(&date_str)?,
                        open: row.get(2)?,
                        high: row.get(3)?,
                        low: row.get(4)?,
                        close: row.get(5)?,
                        adj_close: row.get(6)?,
                        volume: row.get(7)?,
                    })
                },
            )
            .map_err(query_err)?;
        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(query_err)?);
        }
        Ok(bars)
    }

    fn price_range(
        &self,
        company_id: i64,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, QuantledgerError> {
        let conn = self.conn()?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(trade_date), MAX(trade_date), COUNT(*)
                 FROM price_history WHERE company_id = ?1",
                params![company_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = read_date(&min_str).map_err(query_err)?;
                let max = read_date(&max_str).map_err(query_err)?;
                Ok(Some((min, max, count as usize)))
            }
            _ => Ok(None),
        }
    }

    fn insert_corporate_action(&self, action: &CorporateAction) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO corporate_actions
                 (company_id, action_type, action_date, value, ratio_from, ratio_to)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                action.company_id,
                action.action_type.as_str(),
                sql_date(action.action_date),
                action.value,
                action.ratio_from,
                action.ratio_to,
            ],
        )
        .map_err(|e| classify("corporate_actions", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn corporate_actions_for(
        &self,
        company_id: i64,
    ) -> Result<Vec<CorporateAction>, QuantledgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT company_id, action_type, action_date, value, ratio_from, ratio_to
                 FROM corporate_actions WHERE company_id = ?1 ORDER BY action_date",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![company_id], |row| {
                let type_str: String = row.get(1)?;
                let date_str: String = row.get(2)?;
                let action_type = ActionType::from_str(&type_str).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(std::io::Error::other(e.to_string())),
                    )
                })?;
                Ok(CorporateAction {
                    company_id: row.get(0)?,
                    action_type,
                    action_date: read_date(&date_str)?,
                    value: row.get(3)?,
                    ratio_from: row.get(4)?,
                    ratio_to: row.get(5)?,
                })
            })
            .map_err(query_err)?;
        let mut actions = Vec::new();
        for row in rows {
            actions.push(row.map_err(query_err)?);
        }
        Ok(actions)
    }

    fn insert_feature(&self, feature: &DailyFeature) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO features_daily
                 (company_id, feature_date, return_1d, return_5d, return_10d, return_21d,
                  volatility_10d, volatility_20d, volatility_60d, momentum_14d, volume_change_5d)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                feature.company_id,
                sql_date(feature.feature_date),
                feature.return_1d,
                feature.return_5d,
                feature.return_10d,
                feature.return_21d,
                feature.volatility_10d,
                feature.volatility_20d,
                feature.volatility_60d,
                feature.momentum_14d,
                feature.volume_change_5d,
            ],
        )
        .map_err(|e| classify("features_daily", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn replace_feature(&self, feature: &DailyFeature) -> Result<(), QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO features_daily
                 (company_id, feature_date, return_1d, return_5d, return_10d, return_21d,
                  volatility_10d, volatility_20d, volatility_60d, momentum_14d, volume_change_5d)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
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
            params![
                feature.company_id,
                sql_date(feature.feature_date),
                feature.return_1d,
                feature.return_5d,
                feature.return_10d,
                feature.return_21d,
                feature.volatility_10d,
                feature.volatility_20d,
                feature.volatility_60d,
                feature.momentum_14d,
                feature.volume_change_5d,
            ],
        )
        .map_err(|e| classify("features_daily", e))?;
        Ok(())
    }

    fn insert_prediction(&self, prediction: &ModelPrediction) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO model_predictions
                 (company_id, prediction_date, predicted_return, model_version)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                prediction.company_id,
                sql_date(prediction.prediction_date),
                prediction.predicted_return,
                prediction.model_version,
            ],
        )
        .map_err(|e| classify("model_predictions", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn predictions_on(
        &self,
        company_id: i64,
        prediction_date: NaiveDate,
    ) -> Result<Vec<ModelPrediction>, QuantledgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT company_id, prediction_date, predicted_return, model_version
                 FROM model_predictions
                 WHERE company_id = ?1 AND prediction_date = ?2
                 ORDER BY model_version",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![company_id, sql_date(prediction_date)], |row| {
                let date_str: String = row.get(1)?;
                Ok(ModelPrediction {
                    company_id: row.get(0)?,
                    prediction_date: read_date(&date_str)?,
                    predicted_return: row.get(2)?,
                    model_version: row.get(3)?,
                })
            })
            .map_err(query_err)?;
        let mut predictions = Vec::new();
        for row in rows {
            predictions.push(row.map_err(query_err)?);
        }
        Ok(predictions)
    }

    fn insert_model_version(&self, version: &ModelVersion) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO model_versions
                 (version, model_type, train_start, train_end, hyperparams_json, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                version.version,
                version.model_type,
                version.train_start.map(sql_date),
                version.train_end.map(sql_date),
                version.hyperparams_json,
                version.notes,
            ],
        )
        .map_err(|e| classify("model_versions", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn find_model_version(&self, version: &str) -> Result<Option<ModelVersion>, QuantledgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT version, model_type, train_start, train_end, hyperparams_json, notes
                 FROM model_versions WHERE version = ?1",
            )
            .map_err(query_err)?;
        let mut rows = stmt
            .query_map(params![version], |row| {
                let start: Option<String> = row.get(2)?;
                let end: Option<String> = row.get(3)?;
                Ok(ModelVersion {
                    version: row.get(0)?,
                    model_type: row.get(1)?,
                    train_start: start.as_deref().map(read_date).transpose()?,
                    train_end: end.as_deref().map(read_date).transpose()?,
                    hyperparams_json: row.get(4)?,
                    notes: row.get(5)?,
                })
            })
            .map_err(query_err)?;
        rows.next().transpose().map_err(query_err)
    }

    fn insert_covariance(&self, snapshot: &CovarianceSnapshot) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO covariance_matrices (calc_date, num_assets, matrix_json)
             VALUES (?1, ?2, ?3)",
            params![
                sql_date(snapshot.calc_date),
                snapshot.num_assets,
                snapshot.matrix_json,
            ],
        )
        .map_err(|e| classify("covariance_matrices", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn covariance_on(
        &self,
        calc_date: NaiveDate,
    ) -> Result<Option<CovarianceSnapshot>, QuantledgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT calc_date, num_assets, matrix_json
                 FROM covariance_matrices WHERE calc_date = ?1",
            )
            .map_err(query_err)?;
        let mut rows = stmt
            .query_map(params![sql_date(calc_date)], |row| {
                let date_str: String = row.get(0)?;
                Ok(CovarianceSnapshot {
                    calc_date: read_date(&date_str)?,
                    num_assets: row.get(1)?,
                    matrix_json: row.get(2)?,
                })
            })
            .map_err(query_err)?;
        rows.next().transpose().map_err(query_err)
    }

    fn insert_portfolio(&self, portfolio: &OptimizedPortfolio) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO optimized_portfolios
                 (portfolio_date, weights_json, objective_value, model_version)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                sql_date(portfolio.portfolio_date),
                portfolio.weights_json,
                portfolio.objective_value,
                portfolio.model_version,
            ],
        )
        .map_err(|e| classify("optimized_portfolios", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn portfolio_on(
        &self,
        portfolio_date: NaiveDate,
        model_version: &str,
    ) -> Result<Option<OptimizedPortfolio>, QuantledgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT portfolio_date, weights_json, objective_value, model_version
                 FROM optimized_portfolios
                 WHERE portfolio_date = ?1 AND model_version = ?2",
            )
            .map_err(query_err)?;
        let mut rows = stmt
            .query_map(params![sql_date(portfolio_date), model_version], |row| {
                let date_str: String = row.get(0)?;
                Ok(OptimizedPortfolio {
                    portfolio_date: read_date(&date_str)?,
                    weights_json: row.get(1)?,
                    objective_value: row.get(2)?,
                    model_version: row.get(3)?,
                })
            })
            .map_err(query_err)?;
        rows.next().transpose().map_err(query_err)
    }

    fn insert_backtest_run(&self, run: &BacktestRun) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO backtest_results
                 (run_id, start_date, end_date, sharpe, max_drawdown, total_return, parameters_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.run_id,
                sql_date(run.start_date),
                sql_date(run.end_date),
                run.sharpe,
                run.max_drawdown,
                run.total_return,
                run.parameters_json,
            ],
        )
        .map_err(|e| classify("backtest_results", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn backtest_runs(&self, run_id: &str) -> Result<Vec<BacktestRun>, QuantledgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT run_id, start_date, end_date, sharpe, max_drawdown,
                        total_return, parameters_json
                 FROM backtest_results WHERE run_id = ?1 ORDER BY id",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                let start: String = row.get(1)?;
                let end: String = row.get(2)?;
                Ok(BacktestRun {
                    run_id: row.get(0)?,
                    start_date: read_date(&start)?,
                    end_date: read_date(&end)?,
                    sharpe: row.get(3)?,
                    max_drawdown: row.get(4)?,
                    total_return: row.get(5)?,
                    parameters_json: row.get(6)?,
                })
            })
            .map_err(query_err)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row.map_err(query_err)?);
        }
        Ok(runs)
    }

    fn insert_balance_sheet(&self, row: &BalanceSheet) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO financials_balance_sheet
                 (company_id, fiscal_year, fiscal_quarter, report_date,
                  total_assets, total_liabilities, shareholder_equity,
                  current_assets, current_liabilities, cash_and_equivalents,
                  inventory, receivables, long_term_debt, short_term_debt, retained_earnings)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                row.company_id,
                row.fiscal_year,
                row.fiscal_quarter,
                sql_date(row.report_date),
                row.total_assets,
                row.total_liabilities,
                row.shareholder_equity,
                row.current_assets,
                row.current_liabilities,
                row.cash_and_equivalents,
                row.inventory,
                row.receivables,
                row.long_term_debt,
                row.short_term_debt,
                row.retained_earnings,
            ],
        )
        .map_err(|e| classify("financials_balance_sheet", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn insert_income_statement(&self, row: &IncomeStatement) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO financials_income_statement
                 (company_id, fiscal_year, fiscal_quarter, report_date,
                  revenue, cost_of_revenue, gross_profit, operating_expenses,
                  operating_income, interest_expense, pretax_income, net_income, ebit, ebitda)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                row.company_id,
                row.fiscal_year,
                row.fiscal_quarter,
                sql_date(row.report_date),
                row.revenue,
                row.cost_of_revenue,
                row.gross_profit,
                row.operating_expenses,
                row.operating_income,
                row.interest_expense,
                row.pretax_income,
                row.net_income,
                row.ebit,
                row.ebitda,
            ],
        )
        .map_err(|e| classify("financials_income_statement", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn insert_cashflow_statement(&self, row: &CashflowStatement) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO financials_cashflow_statement
                 (company_id, fiscal_year, fiscal_quarter, report_date,
                  operating_cash_flow, investing_cash_flow, financing_cash_flow,
                  capital_expenditure, free_cash_flow)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                row.company_id,
                row.fiscal_year,
                row.fiscal_quarter,
                sql_date(row.report_date),
                row.operating_cash_flow,
                row.investing_cash_flow,
                row.financing_cash_flow,
                row.capital_expenditure,
                row.free_cash_flow,
            ],
        )
        .map_err(|e| classify("financials_cashflow_statement", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn replace_ratios(&self, row: &FinancialRatios) -> Result<(), QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO financial_ratios
                 (company_id, fiscal_year, fiscal_quarter, report_date,
                  pe_ratio, pb_ratio, roe, roa, debt_to_equity, current_ratio,
                  quick_ratio, ebitda_margin, net_margin, fcf_yield)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
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
            params![
                row.company_id,
                row.fiscal_year,
                row.fiscal_quarter,
                sql_date(row.report_date),
                row.pe_ratio,
                row.pb_ratio,
                row.roe,
                row.roa,
                row.debt_to_equity,
                row.current_ratio,
                row.quick_ratio,
                row.ebitda_margin,
                row.net_margin,
                row.fcf_yield,
            ],
        )
        .map_err(|e| classify("financial_ratios", e))?;
        Ok(())
    }

    fn insert_holiday(&self, holiday: &ExchangeHoliday) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO exchange_holidays (exchange, holiday_date, description)
             VALUES (?1, ?2, ?3)",
            params![
                holiday.exchange,
                sql_date(holiday.holiday_date),
                holiday.description,
            ],
        )
        .map_err(|e| classify("exchange_holidays", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn list_holidays(&self, exchange: &str) -> Result<Vec<ExchangeHoliday>, QuantledgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT exchange, holiday_date, description
                 FROM exchange_holidays WHERE exchange = ?1 ORDER BY holiday_date",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![exchange], |row| {
                let date_str: String = row.get(1)?;
                Ok(ExchangeHoliday {
                    exchange: row.get(0)?,
                    holiday_date: read_date(&date_str)?,
                    description: row.get(2)?,
                })
            })
            .map_err(query_err)?;
        let mut holidays = Vec::new();
        for row in rows {
            holidays.push(row.map_err(query_err)?);
        }
        Ok(holidays)
    }

    fn insert_event(&self, event: &Event) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO events
                 (company_id, event_date, event_type, event_source, headline, sentiment_score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.company_id,
                sql_date(event.event_date),
                event.event_type,
                event.event_source,
                event.headline,
                event.sentiment_score,
            ],
        )
        .map_err(|e| classify("events", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn events_for_company(&self, company_id: i64) -> Result<Vec<Event>, QuantledgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT company_id, event_date, event_type, event_source, headline, sentiment_score
                 FROM events WHERE company_id = ?1 ORDER BY event_date",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![company_id], event_from_row)
            .map_err(query_err)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(query_err)?);
        }
        Ok(events)
    }

    fn events_on(&self, event_date: NaiveDate) -> Result<Vec<Event>, QuantledgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT company_id, event_date, event_type, event_source, headline, sentiment_score
                 FROM events WHERE event_date = ?1 ORDER BY id",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![sql_date(event_date)], event_from_row)
            .map_err(query_err)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(query_err)?);
        }
        Ok(events)
    }

    fn log_run(&self, run: &EtlRun) -> Result<i64, QuantledgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO etl_runs
                 (pipeline_name, status, rows_processed, error_message, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run.pipeline_name,
                run.status.as_str(),
                run.rows_processed,
                run.error_message,
                run.started_at.map(sql_datetime),
                run.ended_at.map(sql_datetime),
            ],
        )
        .map_err(|e| classify("etl_runs", e))?;
        Ok(conn.last_insert_rowid())
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<EtlRun>, QuantledgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT pipeline_name, status, rows_processed, error_message, started_at, ended_at
                 FROM etl_runs ORDER BY id DESC LIMIT ?1",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let status_str: String = row.get(1)?;
                let status = RunStatus::from_str(&status_str).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(std::io::Error::other(e.to_string())),
                    )
                })?;
                let started: Option<String> = row.get(4)?;
                let ended: Option<String> = row.get(5)?;
                Ok(EtlRun {
                    pipeline_name: row.get(0)?,
                    status,
                    rows_processed: row.get(2)?,
                    error_message: row.get(3)?,
                    started_at: started.as_deref().map(read_datetime).transpose()?,
                    ended_at: ended.as_deref().map(read_datetime).transpose()?,
                })
            })
            .map_err(query_err)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row.map_err(query_err)?);
        }
        Ok(runs)
    }
}

fn event_from_row(row: &rusqlite::Row<'_>) -> Result<Event, rusqlite::Error> {
    let date_str: String = row.get(1)?;
    Ok(Event {
        company_id: row.get(0)?,
        event_date: read_date(&date_str)?,
        event_type: row.get(2)?,
        event_source: row.get(3)?,
        headline: row.get(4)?,
        sentiment_score: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    fn store() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn from_config_missing_path() {
        let result = SqliteAdapter::from_config(&EmptyConfig);
        match result {
            Err(QuantledgerError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn initialize_schema_is_idempotent() {
        let adapter = store();
        adapter.initialize_schema().unwrap();
    }

    #[test]
    fn ensure_company_returns_same_id() {
        let adapter = store();
        let company = NewCompany::new("RELIANCE", "NSE").with_name("Reliance Industries");
        let id1 = adapter.ensure_company(&company).unwrap();
        let id2 = adapter.ensure_company(&company).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(adapter.list_companies(Some("NSE")).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_symbol_exchange_rejected() {
        let adapter = store();
        adapter
            .insert_company(&NewCompany::new("TCS", "NSE"))
            .unwrap();
        let err = adapter
            .insert_company(&NewCompany::new("TCS", "NSE"))
            .unwrap_err();
        assert!(matches!(
            err,
            QuantledgerError::ConstraintViolation { ref table, .. } if table == "companies"
        ));
    }

    #[test]
    fn same_symbol_different_exchange_allowed() {
        let adapter = store();
        adapter
            .insert_company(&NewCompany::new("TCS", "NSE"))
            .unwrap();
        adapter
            .insert_company(&NewCompany::new("TCS", "BSE"))
            .unwrap();
        assert_eq!(adapter.list_companies(None).unwrap().len(), 2);
    }

    #[test]
    fn duplicate_isin_rejected() {
        let adapter = store();
        adapter
            .insert_company(&NewCompany::new("A", "NSE").with_isin("INE000000001"))
            .unwrap();
        let err = adapter
            .insert_company(&NewCompany::new("B", "NSE").with_isin("INE000000001"))
            .unwrap_err();
        assert!(matches!(err, QuantledgerError::ConstraintViolation { .. }));
    }

    #[test]
    fn null_isin_not_unique_constrained() {
        let adapter = store();
        adapter
            .insert_company(&NewCompany::new("A", "NSE"))
            .unwrap();
        adapter
            .insert_company(&NewCompany::new("B", "NSE"))
            .unwrap();
    }

    #[test]
    fn duplicate_price_date_rejected() {
        let adapter = store();
        let id = adapter
            .ensure_company(&NewCompany::new("INFY", "NSE"))
            .unwrap();
        let d = date(2024, 1, 2);
        adapter
            .insert_prices(&[PriceRow::bar(id, d, 1.0, 2.0, 0.5, 1.5, 1.5, 100)])
            .unwrap();
        let err = adapter
            .insert_prices(&[PriceRow::bar(id, d, 1.0, 2.0, 0.5, 1.5, 1.5, 100)])
            .unwrap_err();
        assert!(matches!(
            err,
            QuantledgerError::ConstraintViolation { ref table, .. } if table == "price_history"
        ));
    }

    #[test]
    fn insert_missing_prices_is_idempotent() {
        let adapter = store();
        let id = adapter
            .ensure_company(&NewCompany::new("INFY", "NSE"))
            .unwrap();
        let rows = vec![
            PriceRow::bar(id, date(2024, 1, 2), 1.0, 2.0, 0.5, 1.5, 1.5, 100),
            PriceRow::bar(id, date(2024, 1, 3), 1.5, 2.5, 1.0, 2.0, 2.0, 200),
        ];
        assert_eq!(adapter.insert_missing_prices(&rows).unwrap(), 2);
        assert_eq!(adapter.insert_missing_prices(&rows).unwrap(), 0);
        assert_eq!(adapter.existing_trade_dates(id).unwrap().len(), 2);
    }

    #[test]
    fn price_range_reports_bounds() {
        let adapter = store();
        let id = adapter
            .ensure_company(&NewCompany::new("INFY", "NSE"))
            .unwrap();
        adapter
            .insert_prices(&[
                PriceRow::bar(id, date(2024, 1, 2), 1.0, 2.0, 0.5, 1.5, 1.5, 100),
                PriceRow::bar(id, date(2024, 1, 10), 1.5, 2.5, 1.0, 2.0, 2.0, 200),
            ])
            .unwrap();
        let (min, max, count) = adapter.price_range(id).unwrap().unwrap();
        assert_eq!(min, date(2024, 1, 2));
        assert_eq!(max, date(2024, 1, 10));
        assert_eq!(count, 2);
        assert!(adapter.price_range(id + 1).unwrap().is_none());
    }

    #[test]
    fn invalid_action_type_rejected_by_check() {
        let adapter = store();
        let id = adapter
            .ensure_company(&NewCompany::new("INFY", "NSE"))
            .unwrap();
        let conn = adapter.conn().unwrap();
        let err = conn
            .execute(
                "INSERT INTO corporate_actions (company_id, action_type, action_date)
                 VALUES (?1, 'MERGER', '2024-01-02')",
                params![id],
            )
            .unwrap_err();
        assert!(matches!(
            classify("corporate_actions", err),
            QuantledgerError::ConstraintViolation { .. }
        ));
    }

    #[test]
    fn multiple_actions_per_company_date_allowed() {
        let adapter = store();
        let id = adapter
            .ensure_company(&NewCompany::new("INFY", "NSE"))
            .unwrap();
        let d = date(2024, 5, 10);
        adapter
            .insert_corporate_action(&CorporateAction {
                company_id: id,
                action_type: ActionType::Dividend,
                action_date: d,
                value: Some(8.5),
                ratio_from: None,
                ratio_to: None,
            })
            .unwrap();
        adapter
            .insert_corporate_action(&CorporateAction {
                company_id: id,
                action_type: ActionType::Split,
                action_date: d,
                value: None,
                ratio_from: Some(1),
                ratio_to: Some(5),
            })
            .unwrap();
        assert_eq!(adapter.corporate_actions_for(id).unwrap().len(), 2);
    }

    #[test]
    fn invalid_run_status_rejected_by_check() {
        let adapter = store();
        let conn = adapter.conn().unwrap();
        let err = conn
            .execute(
                "INSERT INTO etl_runs (pipeline_name, status) VALUES ('x', 'RUNNING')",
                [],
            )
            .unwrap_err();
        assert!(matches!(
            classify("etl_runs", err),
            QuantledgerError::ConstraintViolation { .. }
        ));
    }

    #[test]
    fn replace_feature_overwrites_in_place() {
        let adapter = store();
        let id = adapter
            .ensure_company(&NewCompany::new("INFY", "NSE"))
            .unwrap();
        let mut f = DailyFeature::new(id, date(2024, 1, 5));
        f.return_1d = Some(0.01);
        adapter.replace_feature(&f).unwrap();
        f.return_1d = Some(0.02);
        adapter.replace_feature(&f).unwrap();
        assert_eq!(adapter.company_fact_counts(id).unwrap().features, 1);
    }

    #[test]
    fn update_company_bumps_updated_at() {
        let adapter = store();
        let id = adapter
            .ensure_company(&NewCompany::new("INFY", "NSE"))
            .unwrap();
        let mut company = adapter.find_company("INFY", "NSE").unwrap().unwrap();
        assert_eq!(company.id, id);
        company.sector = Some("IT".into());
        adapter.update_company(&company).unwrap();
        let reloaded = adapter.find_company("INFY", "NSE").unwrap().unwrap();
        assert_eq!(reloaded.sector.as_deref(), Some("IT"));
        assert!(reloaded.updated_at >= company.updated_at);
    }
}
