use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {message}")]
    Query { query: String, message: String },

    #[error("Configuration: {0}")]
    Config(String),

    #[error("Report not loaded: {0}")]
    NotLoaded(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Report '{report}' row {row}: got {actual} values, schema declares {expected}")]
    ArityMismatch {
        report: String,
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Unparseable timestamp in column '{column}' row {row}: {value:?}")]
    Timestamp {
        column: String,
        row: usize,
        value: String,
    },

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
