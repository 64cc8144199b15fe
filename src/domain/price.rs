//! Daily OHLCV price rows, one per `(company_id, trade_date)`.

use chrono::NaiveDate;

/// One daily bar in `price_history`. Append-only: rows are never updated
/// once written, only inserted or (on company deletion) cascaded away.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub company_id: i64,
    pub trade_date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<i64>,
}

impl PriceRow {
    /// A fully-populated bar, the common case for exchange feeds.
    pub fn bar(
        company_id: i64,
        trade_date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        adj_close: f64,
        volume: i64,
    ) -> Self {
        Self {
            company_id,
            trade_date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            adj_close: Some(adj_close),
            volume: Some(volume),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_populates_all_fields() {
        let row = PriceRow::bar(
            1,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            100.0,
            110.0,
            90.0,
            105.0,
            104.5,
            50_000,
        );
        assert_eq!(row.close, Some(105.0));
        assert_eq!(row.volume, Some(50_000));
    }
}
