//! Error types for the stock report worker.

use tally_db::DbError;

/// Stock report errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;
