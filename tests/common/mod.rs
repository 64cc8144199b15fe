#![allow(dead_code)]
#![cfg(feature = "sqlite")]

use chrono::NaiveDate;
use quantledger::adapters::sqlite_adapter::SqliteAdapter;
use quantledger::domain::company::NewCompany;
use quantledger::domain::price::PriceRow;
use quantledger::ports::store_port::StorePort;

pub fn store() -> SqliteAdapter {
    let adapter = SqliteAdapter::in_memory().unwrap();
    adapter.initialize_schema().unwrap();
    adapter
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn seed_company(store: &dyn StorePort, symbol: &str, exchange: &str) -> i64 {
    store
        .ensure_company(&NewCompany::new(symbol, exchange))
        .unwrap()
}

pub fn bar(company_id: i64, trade_date: NaiveDate, close: f64) -> PriceRow {
    PriceRow::bar(
        company_id,
        trade_date,
        close - 0.5,
        close + 1.0,
        close - 1.0,
        close,
        close,
        10_000,
    )
}

/// Consecutive calendar-day bars starting at `start`.
pub fn bars(company_id: i64, start: NaiveDate, count: usize, base: f64) -> Vec<PriceRow> {
    (0..count)
        .map(|i| {
            bar(
                company_id,
                start + chrono::Days::new(i as u64),
                base + i as f64,
            )
        })
        .collect()
}
