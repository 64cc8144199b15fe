//! Derived daily feature vectors, one per `(company_id, feature_date)`.

use chrono::NaiveDate;

/// One row in `features_daily`. Downstream of `price_history`; a feature
/// job recomputes a date idempotently, so the store exposes a replace-style
/// insert alongside the strict one.
#[derive(Debug, Clone, Default)]
pub struct DailyFeature {
    pub company_id: i64,
    pub feature_date: NaiveDate,
    pub return_1d: Option<f64>,
    pub return_5d: Option<f64>,
    pub return_10d: Option<f64>,
    pub return_21d: Option<f64>,
    pub volatility_10d: Option<f64>,
    pub volatility_20d: Option<f64>,
    pub volatility_60d: Option<f64>,
    pub momentum_14d: Option<f64>,
    pub volume_change_5d: Option<f64>,
}

impl DailyFeature {
    pub fn new(company_id: i64, feature_date: NaiveDate) -> Self {
        Self {
            company_id,
            feature_date,
            ..Default::default()
        }
    }
}
