//! Rendering of analysis results to CSV and HTML.
//!
//! Model summaries ([`ModelSummary`]) describe one fitted estimator and render
//! to an HTML table and a CSV document. Tabular analyses produce one or more
//! [`Table`]s, each written to its own CSV file, plus a summary CSV that
//! stacks them.

mod summary;
mod table;

use std::io;

use thiserror::Error;

pub use summary::{CoefficientRow, ModelSummary};
pub use table::{round_to, write_summary_csv, Table, INDEX_HEADER};

/// Errors raised while writing result files.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output is not valid UTF-8")]
    Encoding,
}
