//! End-to-end tests for the price import flow: CSV on disk, cleaning,
//! idempotent insert, and the audit trail it leaves behind.

#![cfg(feature = "sqlite")]

mod common;

use common::*;
use quantledger::adapters::file_config_adapter::FileConfigAdapter;
use quantledger::adapters::sqlite_adapter::SqliteAdapter;
use quantledger::cli::import_prices;
use quantledger::domain::error::QuantledgerError;
use quantledger::domain::etl_run::RunStatus;
use quantledger::ports::store_port::StorePort;
use std::io::Write;
use std::path::Path;

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

const CLEAN_CSV: &str = "date,open,high,low,close,adj_close,volume\n\
    2024-01-02,100.0,101.5,99.0,101.0,100.8,120000\n\
    2024-01-03,101.0,102.0,100.5,101.5,101.3,90000\n\
    2024-01-04,101.5,103.0,101.0,102.5,102.3,110000\n";

#[test]
fn import_creates_company_and_inserts_bars() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(dir.path(), "TCS_NSE.csv", CLEAN_CSV);
    let store = store();

    import_prices(&store, "TCS", "NSE", &csv, false).unwrap();

    let company = store.find_company("TCS", "NSE").unwrap().unwrap();
    let (min, max, count) = store.price_range(company.id).unwrap().unwrap();
    assert_eq!(count, 3);
    assert_eq!(min, date(2024, 1, 2));
    assert_eq!(max, date(2024, 1, 4));

    let runs = store.list_runs(5).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Success);
    assert_eq!(runs[0].rows_processed, Some(3));
}

#[test]
fn reimport_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(dir.path(), "TCS_NSE.csv", CLEAN_CSV);
    let store = store();

    import_prices(&store, "TCS", "NSE", &csv, false).unwrap();
    import_prices(&store, "TCS", "NSE", &csv, false).unwrap();

    let company = store.find_company("TCS", "NSE").unwrap().unwrap();
    assert_eq!(store.existing_trade_dates(company.id).unwrap().len(), 3);

    // both runs are on record, the second inserted nothing
    let runs = store.list_runs(5).unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].rows_processed, Some(0));
}

#[test]
fn dirty_rows_produce_partial_status() {
    let dirty = "date,open,high,low,close,adj_close,volume\n\
        2024-01-02,,,,,,\n\
        2024-01-03,101.0,102.0,100.5,101.5,101.3,90000\n";
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(dir.path(), "INFY_NSE.csv", dirty);
    let store = store();

    import_prices(&store, "INFY", "NSE", &csv, false).unwrap();

    let runs = store.list_runs(5).unwrap();
    assert_eq!(runs[0].status, RunStatus::Partial);
    assert_eq!(runs[0].rows_processed, Some(1));
    assert!(runs[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("dropped"));
}

#[test]
fn unreadable_file_logs_failed_run() {
    let store = store();
    let err = import_prices(&store, "TCS", "NSE", Path::new("/nonexistent/prices.csv"), false)
        .unwrap_err();
    assert!(matches!(err, QuantledgerError::CsvParse { .. }));

    let runs = store.list_runs(5).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0].error_message.is_some());
}

#[test]
fn raw_import_skips_cleaning() {
    let dirty = "date,open,high,low,close,adj_close,volume\n\
        2024-01-02,-1.0,102.0,100.5,101.5,101.3,90000\n";
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(dir.path(), "INFY_NSE.csv", dirty);
    let store = store();

    import_prices(&store, "INFY", "NSE", &csv, true).unwrap();

    let company = store.find_company("INFY", "NSE").unwrap().unwrap();
    let rows = store
        .fetch_prices(company.id, date(2024, 1, 1), date(2024, 1, 31))
        .unwrap();
    assert_eq!(rows[0].open, Some(-1.0));
    assert_eq!(store.list_runs(5).unwrap()[0].status, RunStatus::Success);
}

#[test]
fn file_backed_store_from_ini_config() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ledger.db");
    let ini = format!("[sqlite]\npath = {}\npool_size = 2\n", db_path.display());
    let config_path = write_file(dir.path(), "quantledger.ini", &ini);

    let config = FileConfigAdapter::from_file(&config_path).unwrap();
    let store = SqliteAdapter::from_config(&config).unwrap();
    store.initialize_schema().unwrap();

    let id = seed_company(&store, "TCS", "NSE");
    store.insert_prices(&bars(id, date(2024, 1, 1), 5, 100.0)).unwrap();
    drop(store);

    // reopen: data persisted to the file
    let config = FileConfigAdapter::from_file(&config_path).unwrap();
    let reopened = SqliteAdapter::from_config(&config).unwrap();
    let company = reopened.find_company("TCS", "NSE").unwrap().unwrap();
    assert_eq!(reopened.price_range(company.id).unwrap().unwrap().2, 5);
}
