//! Tabular data: loading, filtering, and categorical expansion.

mod dataset;
mod dummies;
mod error;
mod filter;
mod loader;
mod value;

pub use dataset::{Column, ColumnKind, Dataset};
pub use dummies::{expand_dummies, DummyExpansion, DummySet};
pub use error::DataError;
pub use filter::{apply_filter, CmpOp, Expr, FilterError, Operand};
pub use loader::{read_csv, read_csv_str};
pub use value::Value;
