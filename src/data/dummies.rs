//! Categorical-to-indicator expansion.

use std::collections::BTreeSet;

use log::debug;

use super::dataset::{Column, Dataset};
use super::error::DataError;
use super::value::Value;

/// Indicator columns generated from one categorical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummySet {
    /// Column the levels were read from.
    pub source: String,
    /// One generated column per observed level, in level order.
    pub columns: Vec<String>,
}

impl DummySet {
    /// Generated columns minus the first, which serves as the baseline level.
    pub fn regressors(&self) -> &[String] {
        self.columns.get(1..).unwrap_or(&[])
    }

    /// The baseline column, if any level was observed.
    pub fn baseline(&self) -> Option<&str> {
        self.columns.first().map(String::as_str)
    }
}

/// Result of expanding several categorical columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DummyExpansion {
    pub sets: Vec<DummySet>,
}

impl DummyExpansion {
    /// Every generated column, baselines included.
    pub fn generated_names(&self) -> Vec<&str> {
        self.sets
            .iter()
            .flat_map(|s| s.columns.iter().map(String::as_str))
            .collect()
    }

    /// Names to pass on as explanatory variables (baselines excluded).
    pub fn regressor_names(&self) -> Vec<String> {
        self.sets
            .iter()
            .flat_map(|s| s.regressors().iter().cloned())
            .collect()
    }
}

/// Expand each listed column into one 0/1 column per distinct non-missing level.
///
/// Levels are sorted by their natural order and each generated column is named
/// by the level's string form. The source columns are left in place. A source
/// with no non-missing values yields an empty set. A generated name that is
/// already taken is an error.
pub fn expand_dummies<S: AsRef<str>>(
    dataset: &mut Dataset,
    categorical: &[S],
) -> Result<DummyExpansion, DataError> {
    let mut expansion = DummyExpansion::default();

    for source in categorical {
        let source = source.as_ref();
        let values = dataset.column(source)?.values.clone();

        let levels: BTreeSet<&Value> = values.iter().filter(|v| !v.is_null()).collect();
        let mut set = DummySet {
            source: source.to_string(),
            columns: Vec::with_capacity(levels.len()),
        };

        for level in levels {
            let name = level.to_string();
            let cells = values
                .iter()
                .map(|v| Value::Integer(i64::from(!v.is_null() && v == level)))
                .collect();
            dataset.push_column(Column::new(name.clone(), cells))?;
            set.columns.push(name);
        }

        debug!("expanded '{}' into {} indicator columns", source, set.columns.len());
        expansion.sets.push(set);
    }

    Ok(expansion)
}
