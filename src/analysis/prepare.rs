//! Preprocessing shared by every analysis.

use std::collections::BTreeMap;

use log::info;

use super::error::AnalysisError;
use super::request::DataSource;
use crate::core::NaInfo;
use crate::data::{apply_filter, read_csv, ColumnKind, Dataset, Value};

/// Complete-case data ready for an estimator.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Only the requested fields, without missing cells.
    pub dataset: Dataset,
    /// Rows dropped by the complete-case policy, relative to the filtered data.
    pub na_info: NaInfo,
}

/// Read the file and apply the row filter; an empty result is an error.
pub fn load_filtered(source: &DataSource) -> Result<Dataset, AnalysisError> {
    let dataset = read_csv(&source.file_path)?;
    info!(
        "loaded {} rows from {}",
        dataset.n_rows(),
        source.file_path.display()
    );
    let filtered = apply_filter(&dataset, source.where_string.as_deref())?;
    if source.where_string.is_some() {
        info!("{} rows after filter", filtered.n_rows());
    }
    if filtered.is_empty() {
        return Err(AnalysisError::EmptyDataset);
    }
    Ok(filtered)
}

/// Fail on the first field with no non-missing value.
pub fn check_columns_not_null<S: AsRef<str>>(
    dataset: &Dataset,
    fields: &[S],
) -> Result<(), AnalysisError> {
    for field in fields {
        if dataset.column(field.as_ref())?.is_entirely_missing() {
            return Err(AnalysisError::NullColumn(field.as_ref().to_string()));
        }
    }
    Ok(())
}

/// Like [`check_columns_not_null`], for grouping columns.
pub fn check_groups_not_null<S: AsRef<str>>(
    dataset: &Dataset,
    groups: &[S],
) -> Result<(), AnalysisError> {
    for group in groups {
        if dataset.column(group.as_ref())?.is_entirely_missing() {
            return Err(AnalysisError::NullGroupColumn(group.as_ref().to_string()));
        }
    }
    Ok(())
}

/// First occurrence of every field, order kept.
pub fn unique_fields<S: AsRef<str>>(fields: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(fields.len());
    for f in fields {
        if !out.iter().any(|o| o == f.as_ref()) {
            out.push(f.as_ref().to_string());
        }
    }
    out
}

/// Rows of each combination of the grouping columns, in key order.
///
/// Rows with a missing key are left out of every group.
pub fn group_rows<S: AsRef<str>>(
    dataset: &Dataset,
    groups: &[S],
) -> Result<BTreeMap<Vec<Value>, Vec<usize>>, AnalysisError> {
    let columns = groups
        .iter()
        .map(|g| dataset.column(g.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    let mut out: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
    for row in 0..dataset.n_rows() {
        let key: Vec<Value> = columns.iter().map(|c| c.values[row].clone()).collect();
        if key.iter().any(Value::is_null) {
            continue;
        }
        out.entry(key).or_default().push(row);
    }
    Ok(out)
}

/// Numeric columns in dataset order, excluding `skip`.
pub fn numeric_column_names<S: AsRef<str>>(dataset: &Dataset, skip: &[S]) -> Vec<String> {
    dataset
        .columns()
        .iter()
        .filter(|c| c.kind() == ColumnKind::Numeric && !skip.iter().any(|s| s.as_ref() == c.name))
        .map(|c| c.name.clone())
        .collect()
}

/// Load, filter, check, select and drop incomplete rows.
pub fn prepare<S: AsRef<str>>(
    source: &DataSource,
    fields: &[S],
) -> Result<PreparedData, AnalysisError> {
    let filtered = load_filtered(source)?;
    let fields = unique_fields(fields);
    check_columns_not_null(&filtered, &fields)?;

    let selected = filtered.select(&fields)?;
    let (dataset, na_info) = selected.drop_incomplete(&fields)?;
    if na_info.has_missing() {
        info!(
            "dropped {} of {} rows with missing values",
            na_info.n_dropped(),
            na_info.n_original
        );
    }
    if dataset.is_empty() {
        return Err(AnalysisError::EmptyDataset);
    }
    Ok(PreparedData { dataset, na_info })
}
