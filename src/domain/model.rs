//! Model outputs: versions, predictions, covariance snapshots, portfolios
//! and backtest runs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row in `model_versions`. The `version` string is unique and is what
/// `model_predictions` and `optimized_portfolios` reference — by name, not
/// by foreign key, so predictions can land before their model's metadata
/// is registered.
#[derive(Debug, Clone)]
pub struct ModelVersion {
    pub version: String,
    pub model_type: String,
    pub train_start: Option<NaiveDate>,
    pub train_end: Option<NaiveDate>,
    /// Opaque hyperparameter blob, JSON.
    pub hyperparams_json: Option<String>,
    pub notes: Option<String>,
}

/// One row in `model_predictions`, keyed by
/// `(company_id, prediction_date, model_version)`. Two models may predict
/// the same company-date without overwriting each other.
#[derive(Debug, Clone)]
pub struct ModelPrediction {
    pub company_id: i64,
    pub prediction_date: NaiveDate,
    pub predicted_return: Option<f64>,
    pub model_version: String,
}

/// One row in `covariance_matrices`: a single snapshot per `calc_date`.
/// The matrix itself is an opaque JSON blob; `num_assets` is stored
/// separately so consumers can validate dimensions before deserializing.
#[derive(Debug, Clone)]
pub struct CovarianceSnapshot {
    pub calc_date: NaiveDate,
    pub num_assets: i32,
    pub matrix_json: String,
}

impl CovarianceSnapshot {
    /// Serialize a dense row-major matrix. Fails only if the row lengths
    /// are ragged.
    pub fn from_matrix(
        calc_date: NaiveDate,
        matrix: &[Vec<f64>],
    ) -> Result<Self, serde_json::Error> {
        let n = matrix.len();
        debug_assert!(matrix.iter().all(|row| row.len() == n));
        Ok(Self {
            calc_date,
            num_assets: n as i32,
            matrix_json: serde_json::to_string(matrix)?,
        })
    }

    pub fn matrix(&self) -> Result<Vec<Vec<f64>>, serde_json::Error> {
        serde_json::from_str(&self.matrix_json)
    }
}

/// Weight entry inside `optimized_portfolios.weights_json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioWeight {
    pub symbol: String,
    pub weight: f64,
}

/// One row in `optimized_portfolios`, keyed by
/// `(portfolio_date, model_version)`.
#[derive(Debug, Clone)]
pub struct OptimizedPortfolio {
    pub portfolio_date: NaiveDate,
    pub weights_json: String,
    pub objective_value: Option<f64>,
    pub model_version: String,
}

impl OptimizedPortfolio {
    pub fn weights(&self) -> Result<Vec<PortfolioWeight>, serde_json::Error> {
        serde_json::from_str(&self.weights_json)
    }
}

/// One row in `backtest_results`. Identified by an opaque `run_id` with no
/// uniqueness constraint: many runs over overlapping date ranges are
/// expected.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub run_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sharpe: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub total_return: Option<f64>,
    pub parameters_json: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covariance_round_trip() {
        let m = vec![vec![1.0, 0.2], vec![0.2, 1.0]];
        let snap =
            CovarianceSnapshot::from_matrix(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), &m)
                .unwrap();
        assert_eq!(snap.num_assets, 2);
        assert_eq!(snap.matrix().unwrap(), m);
    }

    #[test]
    fn portfolio_weights_decode() {
        let p = OptimizedPortfolio {
            portfolio_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            weights_json: r#"[{"symbol":"RELIANCE","weight":0.6},{"symbol":"TCS","weight":0.4}]"#
                .to_string(),
            objective_value: Some(1.23),
            model_version: "xgb-v3".to_string(),
        };
        let weights = p.weights().unwrap();
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].symbol, "RELIANCE");
        assert!((weights[1].weight - 0.4).abs() < f64::EPSILON);
    }
}
