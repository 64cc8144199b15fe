//! Corporate actions: dividends, splits, bonus and rights issues.

use crate::domain::error::QuantledgerError;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// The closed set of action kinds accepted by `corporate_actions.action_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Dividend,
    Split,
    Bonus,
    Rights,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Dividend => "DIVIDEND",
            ActionType::Split => "SPLIT",
            ActionType::Bonus => "BONUS",
            ActionType::Rights => "RIGHTS",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = QuantledgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DIVIDEND" => Ok(ActionType::Dividend),
            "SPLIT" => Ok(ActionType::Split),
            "BONUS" => Ok(ActionType::Bonus),
            "RIGHTS" => Ok(ActionType::Rights),
            other => Err(QuantledgerError::InvalidEnum {
                value: other.to_string(),
                expected: "DIVIDEND, SPLIT, BONUS, RIGHTS".to_string(),
            }),
        }
    }
}

/// One row in `corporate_actions`. Deliberately no uniqueness constraint
/// beyond the company FK: a company can declare a dividend and a split on
/// the same date.
#[derive(Debug, Clone)]
pub struct CorporateAction {
    pub company_id: i64,
    pub action_type: ActionType,
    pub action_date: NaiveDate,
    /// Dividend amount per share, where applicable.
    pub value: Option<f64>,
    /// Split/bonus ratio, e.g. 1:5 is `ratio_from = 1, ratio_to = 5`.
    pub ratio_from: Option<i32>,
    pub ratio_to: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_type_round_trips() {
        for s in ["DIVIDEND", "SPLIT", "BONUS", "RIGHTS"] {
            assert_eq!(ActionType::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn action_type_rejects_unknown() {
        let err = ActionType::from_str("MERGER").unwrap_err();
        match err {
            QuantledgerError::InvalidEnum { value, .. } => assert_eq!(value, "MERGER"),
            other => panic!("expected InvalidEnum, got: {other}"),
        }
    }

    #[test]
    fn action_type_is_case_sensitive() {
        assert!(ActionType::from_str("dividend").is_err());
    }
}
