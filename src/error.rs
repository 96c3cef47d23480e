use chrono::NaiveDate;
use thiserror::Error;

/// Top-level error for a pipeline run. Any of these aborts the run.
#[derive(Error, Debug)]
pub enum ClimateError {
    #[error("{0} model not trained. Fit it before requesting a forecast.")]
    Precondition(&'static str),

    #[error("{model} model has invalid {field} = {value}")]
    ModelParameter {
        model: &'static str,
        field: &'static str,
        value: f64,
    },

    #[error("Forecast model error: {0}")]
    Model(#[from] augurs_prophet::Error),

    #[error("Data quality error: {0}")]
    DataQuality(#[from] DataQualityError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Degenerate input that would otherwise surface as NaN-laden results.
#[derive(Error, Debug, PartialEq)]
pub enum DataQualityError {
    #[error("no observations to process")]
    EmptySeries,

    #[error("column '{0}' has no values to fill gaps from")]
    EmptyColumn(&'static str),

    #[error("training slice is empty (split ratio {0})")]
    EmptyTrainingSet(f64),

    #[error("{metric} evaluation matched no dates between actuals and forecast")]
    EmptyEvaluation { metric: String },

    #[error("{metric} evaluation covered {matched} of {expected} actual rows; first unmatched date {first_missing}")]
    IncompleteCoverage {
        metric: String,
        matched: usize,
        expected: usize,
        first_missing: NaiveDate,
    },

    #[error("{hazard} needs a {window}-day window but only {len} forecast days are available")]
    WindowNeverFilled {
        hazard: &'static str,
        window: usize,
        len: usize,
    },

    #[error("{0} falls outside the supported calendar range")]
    DateOutOfRange(&'static str),
}

/// Invalid configuration entry. Never fatal: the offending section is
/// replaced by its default and the problem is logged.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("could not read config file {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("{field} = {value} is out of range ({expected}); using default")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{section} cut points are not ordered ({detail}); using defaults")]
    UnorderedCuts {
        section: &'static str,
        detail: String,
    },
}

pub type Result<T> = std::result::Result<T, ClimateError>;
