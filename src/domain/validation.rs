//! Cleaning rules for raw OHLCV rows before they reach the store.

use crate::domain::price::PriceRow;

/// Clean a date-ordered batch of raw price rows:
///
/// - drop rows with no fields at all,
/// - treat non-positive prices as missing,
/// - forward-fill missing prices from the previous row,
/// - missing volume becomes 0,
/// - drop rows still missing `close` or `adj_close` after filling.
///
/// Returns the cleaned rows and the number dropped.
pub fn clean_price_rows(rows: &[PriceRow]) -> (Vec<PriceRow>, usize) {
    let mut prev: Option<PriceRow> = None;
    let mut cleaned = Vec::with_capacity(rows.len());
    let mut dropped = 0;

    for row in rows {
        if is_empty(row) {
            dropped += 1;
            continue;
        }

        let mut row = row.clone();
        row.open = positive(row.open);
        row.high = positive(row.high);
        row.low = positive(row.low);
        row.close = positive(row.close);
        row.adj_close = positive(row.adj_close);

        if let Some(p) = &prev {
            row.open = row.open.or(p.open);
            row.high = row.high.or(p.high);
            row.low = row.low.or(p.low);
            row.close = row.close.or(p.close);
            row.adj_close = row.adj_close.or(p.adj_close);
        }

        row.volume = Some(row.volume.unwrap_or(0));

        if row.close.is_none() || row.adj_close.is_none() {
            dropped += 1;
            continue;
        }

        prev = Some(row.clone());
        cleaned.push(row);
    }

    (cleaned, dropped)
}

fn is_empty(row: &PriceRow) -> bool {
    row.open.is_none()
        && row.high.is_none()
        && row.low.is_none()
        && row.close.is_none()
        && row.adj_close.is_none()
        && row.volume.is_none()
}

fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|x| *x > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn full(d: u32, close: f64) -> PriceRow {
        PriceRow::bar(1, date(d), close, close + 1.0, close - 1.0, close, close, 1000)
    }

    #[test]
    fn empty_rows_dropped() {
        let empty = PriceRow {
            company_id: 1,
            trade_date: date(2),
            open: None,
            high: None,
            low: None,
            close: None,
            adj_close: None,
            volume: None,
        };
        let (cleaned, dropped) = clean_price_rows(&[full(1, 100.0), empty]);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn negative_price_forward_filled() {
        let mut bad = full(2, 101.0);
        bad.close = Some(-5.0);
        let (cleaned, dropped) = clean_price_rows(&[full(1, 100.0), bad]);
        assert_eq!(dropped, 0);
        assert_eq!(cleaned[1].close, Some(100.0));
    }

    #[test]
    fn leading_row_without_close_dropped() {
        let mut bad = full(1, 100.0);
        bad.close = None;
        bad.adj_close = None;
        let (cleaned, dropped) = clean_price_rows(&[bad, full(2, 101.0)]);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(dropped, 1);
        assert_eq!(cleaned[0].trade_date, date(2));
    }

    #[test]
    fn missing_volume_zero_filled() {
        let mut row = full(1, 100.0);
        row.volume = None;
        let (cleaned, _) = clean_price_rows(&[row]);
        assert_eq!(cleaned[0].volume, Some(0));
    }
}
