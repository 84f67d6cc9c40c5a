//! Error types shared by every stage of the pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a live data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The provider could not be reached or refused the request.
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// The provider answered but the payload could not be used.
    #[error("data source returned malformed data: {0}")]
    Malformed(String),
}

/// Errors that can occur while collecting data, training, persisting or forecasting.
#[derive(Debug, Error)]
pub enum Pm25Error {
    #[error("training data not found at {}; run `pm25 collect` first", path.display())]
    DataNotFound { path: PathBuf },

    #[error("missing required feature columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("insufficient data: need at least {required} complete rows, got {rows}")]
    InsufficientData { rows: usize, required: usize },

    #[error("no trained model at {}; run `pm25 train` first", path.display())]
    ModelNotFound { path: PathBuf },

    #[error(transparent)]
    ExternalSource(#[from] SourceError),

    #[error("row {row} has no value for column `{column}`")]
    MissingValue { row: usize, column: String },

    #[error("invalid value {value} for `{field}`")]
    InvalidObservation { field: &'static str, value: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("model serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Pm25Error>;
