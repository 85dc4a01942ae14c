//! Error types for the survey-richness library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid count value '{value}' at row {row}, column '{column}'")]
    InvalidCount {
        value: String,
        row: usize,
        column: String,
    },

    #[error("Missing data in row {row}: {reason}")]
    MissingData { row: usize, reason: String },

    #[error("No trait record for species '{species}'")]
    Join { species: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Model did not converge after {iterations} iterations (log-REML {log_reml})")]
    Convergence { iterations: usize, log_reml: f64 },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Duplicate species identifier '{0}'")]
    DuplicateSpecies(String),

    #[error("Invalid size range for species '{species}': min {min}, max {max}")]
    InvalidSizeRange {
        species: String,
        min: f64,
        max: f64,
    },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, SurveyError>;
