//! Domain error types.

/// Top-level error type for quantledger.
#[derive(Debug, thiserror::Error)]
pub enum QuantledgerError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("constraint violation on {table}: {constraint}")]
    ConstraintViolation { table: String, constraint: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("CSV parse error in {file}: {reason}")]
    CsvParse { file: String, reason: String },

    #[error("invalid value {value:?}, expected one of {expected}")]
    InvalidEnum { value: String, expected: String },

    #[error("unknown company {symbol} on {exchange}")]
    UnknownCompany { symbol: String, exchange: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&QuantledgerError> for std::process::ExitCode {
    fn from(err: &QuantledgerError) -> Self {
        let code: u8 = match err {
            QuantledgerError::Io(_) => 1,
            QuantledgerError::ConfigParse { .. }
            | QuantledgerError::ConfigMissing { .. }
            | QuantledgerError::ConfigInvalid { .. } => 2,
            QuantledgerError::Database { .. }
            | QuantledgerError::DatabaseQuery { .. }
            | QuantledgerError::ConstraintViolation { .. } => 3,
            QuantledgerError::CsvParse { .. } | QuantledgerError::InvalidEnum { .. } => 4,
            QuantledgerError::UnknownCompany { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_violation_display() {
        let err = QuantledgerError::ConstraintViolation {
            table: "price_history".into(),
            constraint: "uq_price_company_date".into(),
        };
        assert_eq!(
            err.to_string(),
            "constraint violation on price_history: uq_price_company_date"
        );
    }

    #[test]
    fn exit_codes_group_by_category() {
        let db = QuantledgerError::Database { reason: "x".into() };
        let uq = QuantledgerError::ConstraintViolation {
            table: "t".into(),
            constraint: "c".into(),
        };
        // ExitCode has no PartialEq; compare debug renderings
        assert_eq!(
            format!("{:?}", std::process::ExitCode::from(&db)),
            format!("{:?}", std::process::ExitCode::from(&uq))
        );
    }
}
