use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or reshaping a [`crate::data::Dataset`].
#[derive(Debug, Error)]
pub enum DataError {
    #[error("data file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("column '{0}' does not exist")]
    UnknownColumn(String),

    #[error("column '{column}' has {got} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("column '{column}' is not numeric (row {row}: '{value}')")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },
}
