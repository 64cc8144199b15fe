//! Exchange holiday reference data and trading-day checks.

use chrono::{Datelike, NaiveDate, Weekday};

/// One row in `exchange_holidays`, unique per `(exchange, holiday_date)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeHoliday {
    pub exchange: String,
    pub holiday_date: NaiveDate,
    pub description: Option<String>,
}

impl ExchangeHoliday {
    pub fn new(exchange: &str, holiday_date: NaiveDate) -> Self {
        Self {
            exchange: exchange.to_string(),
            holiday_date,
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// A trading day is a weekday that is not listed as a holiday for the
/// exchange. Callers supply the holiday set they loaded from the store.
pub fn is_trading_day(date: NaiveDate, holidays: &[ExchangeHoliday]) -> bool {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    !holidays.iter().any(|h| h.holiday_date == date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekend_is_not_trading() {
        // 2024-01-06 is a Saturday
        assert!(!is_trading_day(date(2024, 1, 6), &[]));
        assert!(!is_trading_day(date(2024, 1, 7), &[]));
    }

    #[test]
    fn holiday_is_not_trading() {
        let holidays =
            vec![ExchangeHoliday::new("NSE", date(2024, 1, 26)).with_description("Republic Day")];
        assert!(!is_trading_day(date(2024, 1, 26), &holidays));
        assert!(is_trading_day(date(2024, 1, 25), &holidays));
    }
}
