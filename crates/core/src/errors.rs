use chrono::NaiveDate;
use thiserror::Error;

/// Caller-misuse failures. Dirty input rows and degenerate math never end up
/// here: the former are skipped and counted, the latter return sentinels.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("insufficient history: need at least {required} weekly points, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },
    #[error("invalid forecast horizon {horizon_weeks}: must be greater than zero")]
    InvalidHorizon { horizon_weeks: u32 },
    #[error("invalid window of {window_days} days: must be greater than zero")]
    InvalidWindow { window_days: u32 },
    #[error(
        "invalid stockout thresholds: expected 0 <= critical_days ({critical_days}) <= \
         high_days ({high_days}) <= low_days ({low_days})"
    )]
    InvalidThresholds { critical_days: f64, high_days: f64, low_days: f64 },
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid scoring weights: {0}")]
    InvalidWeights(String),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApplicationError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("input failure: {0}")]
    Input(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable machine-readable class for structured command output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Engine(EngineError::InsufficientHistory { .. }) => "insufficient_history",
            Self::Engine(EngineError::InvalidHorizon { .. }) => "invalid_horizon",
            Self::Engine(EngineError::InvalidWindow { .. }) => "invalid_window",
            Self::Engine(EngineError::InvalidThresholds { .. }) => "invalid_thresholds",
            Self::Engine(EngineError::InvalidDateRange { .. }) => "invalid_date_range",
            Self::Engine(EngineError::InvalidWeights(_)) => "invalid_weights",
            Self::Input(_) => "input",
            Self::Configuration(_) => "config_validation",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Input(_) => 3,
            Self::Engine(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::errors::{ApplicationError, EngineError};

    #[test]
    fn insufficient_history_names_required_minimum() {
        let error = EngineError::InsufficientHistory { required: 8, actual: 5 };

        assert_eq!(
            error.to_string(),
            "insufficient history: need at least 8 weekly points, got 5"
        );
    }

    #[test]
    fn engine_errors_map_to_precondition_exit_code() {
        let error = ApplicationError::from(EngineError::InvalidHorizon { horizon_weeks: 0 });

        assert_eq!(error.exit_code(), 4);
        assert_eq!(error.error_class(), "invalid_horizon");
    }

    #[test]
    fn date_range_error_mentions_both_bounds() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date");
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
        let message = EngineError::InvalidDateRange { start, end }.to_string();

        assert!(message.contains("2024-03-10"));
        assert!(message.contains("2024-03-01"));
    }

    #[test]
    fn configuration_and_input_failures_have_distinct_codes() {
        let config = ApplicationError::Configuration("bad weights".to_owned());
        let input = ApplicationError::Input("unreadable rows".to_owned());

        assert_eq!(config.exit_code(), 2);
        assert_eq!(config.error_class(), "config_validation");
        assert_eq!(input.exit_code(), 3);
        assert_eq!(input.error_class(), "input");
    }
}
