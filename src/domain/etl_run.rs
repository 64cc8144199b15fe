//! Append-only audit log of pipeline executions.

use crate::domain::error::QuantledgerError;
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

/// Terminal status of a pipeline run, the closed set accepted by
/// `etl_runs.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed,
    /// Some rows landed, some failed. The run record's `error_message`
    /// carries the detail.
    Partial,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::Failed => "FAILED",
            RunStatus::Partial => "PARTIAL",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = QuantledgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(RunStatus::Success),
            "FAILED" => Ok(RunStatus::Failed),
            "PARTIAL" => Ok(RunStatus::Partial),
            other => Err(QuantledgerError::InvalidEnum {
                value: other.to_string(),
                expected: "SUCCESS, FAILED, PARTIAL".to_string(),
            }),
        }
    }
}

/// One row in `etl_runs`. Never updated after insertion; a re-run writes a
/// new record.
#[derive(Debug, Clone)]
pub struct EtlRun {
    pub pipeline_name: String,
    pub status: RunStatus,
    pub rows_processed: Option<i32>,
    pub error_message: Option<String>,
    pub started_at: Option<NaiveDateTime>,
    pub ended_at: Option<NaiveDateTime>,
}

impl EtlRun {
    pub fn new(pipeline_name: &str, status: RunStatus) -> Self {
        Self {
            pipeline_name: pipeline_name.to_string(),
            status,
            rows_processed: None,
            error_message: None,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn with_rows(mut self, rows: i32) -> Self {
        self.rows_processed = Some(rows);
        self
    }

    pub fn with_error(mut self, message: &str) -> Self {
        self.error_message = Some(message.to_string());
        self
    }

    pub fn with_window(mut self, started_at: NaiveDateTime, ended_at: NaiveDateTime) -> Self {
        self.started_at = Some(started_at);
        self.ended_at = Some(ended_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in ["SUCCESS", "FAILED", "PARTIAL"] {
            assert_eq!(RunStatus::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn status_rejects_unknown() {
        assert!(RunStatus::from_str("RUNNING").is_err());
        assert!(RunStatus::from_str("success").is_err());
    }

    #[test]
    fn builder_composes() {
        let run = EtlRun::new("import_prices", RunStatus::Partial)
            .with_rows(120)
            .with_error("3 files skipped");
        assert_eq!(run.rows_processed, Some(120));
        assert_eq!(run.error_message.as_deref(), Some("3 files skipped"));
    }
}
