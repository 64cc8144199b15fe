//! CSV reader for daily price files.
//!
//! Expected header: `date,open,high,low,close,adj_close,volume`. Empty
//! cells become NULLs; the cleaning pass in [`crate::domain::validation`]
//! decides what survives.

use crate::domain::error::QuantledgerError;
use crate::domain::price::PriceRow;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvBar {
    date: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    adj_close: Option<f64>,
    volume: Option<i64>,
}

/// Read one company's price file, tagging every row with `company_id`.
/// Rows come back in file order; callers sort by date before cleaning if
/// the source is unordered.
pub fn read_price_file<P: AsRef<Path>>(
    path: P,
    company_id: i64,
) -> Result<Vec<PriceRow>, QuantledgerError> {
    let path = path.as_ref();
    let file_label = path.display().to_string();
    let mut rdr = csv::Reader::from_path(path).map_err(|e| QuantledgerError::CsvParse {
        file: file_label.clone(),
        reason: e.to_string(),
    })?;

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let bar: CsvBar = result.map_err(|e| QuantledgerError::CsvParse {
            file: file_label.clone(),
            reason: e.to_string(),
        })?;
        let trade_date = NaiveDate::parse_from_str(&bar.date, "%Y-%m-%d").map_err(|e| {
            QuantledgerError::CsvParse {
                file: file_label.clone(),
                reason: format!("invalid date {:?}: {e}", bar.date),
            }
        })?;
        rows.push(PriceRow {
            company_id,
            trade_date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            adj_close: bar.adj_close,
            volume: bar.volume,
        });
    }
    Ok(rows)
}
