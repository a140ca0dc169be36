//! Descriptive statistics per variable, optionally per group.

use super::error::AnalysisError;
use super::prepare::{check_groups_not_null, group_rows, numeric_column_names};
use super::request::DescriptiveRequest;
use crate::data::Dataset;
use crate::report::{Table, INDEX_HEADER};

/// Statistic columns, in output order.
pub const STAT_COLUMNS: [&str; 9] =
    ["count", "mean", "std", "min", "25%", "50%", "75%", "max", "nmiss"];

/// Summary statistics of the non-missing entries of `values`.
///
/// `nmiss` counts the NaN entries. The standard deviation uses n - 1.
pub fn describe_values(values: &[f64]) -> [f64; 9] {
    let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    present.sort_by(f64::total_cmp);
    let count = present.len();
    let nmiss = (values.len() - count) as f64;
    if count == 0 {
        let nan = f64::NAN;
        return [0.0, nan, nan, nan, nan, nan, nan, nan, nmiss];
    }

    let n = count as f64;
    let mean = present.iter().sum::<f64>() / n;
    let std = if count > 1 {
        (present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        f64::NAN
    };
    [
        n,
        mean,
        std,
        present[0],
        quantile_sorted(&present, 0.25),
        quantile_sorted(&present, 0.5),
        quantile_sorted(&present, 0.75),
        present[count - 1],
        nmiss,
    ]
}

/// Linear-interpolation quantile of sorted, non-empty data.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Build the statistics tables for a request.
///
/// With both groups and variables, one table per variable indexed by the
/// group columns. Otherwise a single table labelled `show_name` with one row
/// per variable; an empty variable list means every numeric column.
pub fn describe(
    request: &DescriptiveRequest,
    dataset: &Dataset,
    show_name: &str,
) -> Result<Vec<Table>, AnalysisError> {
    check_groups_not_null(dataset, &request.group_list)?;
    let columns: Vec<String> = STAT_COLUMNS.iter().map(|s| s.to_string()).collect();

    if !request.group_list.is_empty() && !request.var_list.is_empty() {
        let groups = group_rows(dataset, &request.group_list)?;
        let mut tables = Vec::with_capacity(request.var_list.len());
        for var in &request.var_list {
            let values = dataset.numeric_values(var)?;
            let mut table = Table::new(var.clone(), request.group_list.clone(), columns.clone());
            for (key, rows) in &groups {
                let cells: Vec<f64> = rows.iter().map(|&r| values[r]).collect();
                table.push_row(
                    key.iter().map(ToString::to_string).collect(),
                    describe_values(&cells).to_vec(),
                );
            }
            tables.push(table);
        }
        return Ok(tables);
    }

    let vars = if request.var_list.is_empty() {
        numeric_column_names(dataset, &[] as &[&str])
    } else {
        request.var_list.clone()
    };
    let mut table = Table::new(show_name, vec![INDEX_HEADER.to_string()], columns);
    for var in &vars {
        let values = dataset.numeric_values(var)?;
        table.push_row(vec![var.clone()], describe_values(&values).to_vec());
    }
    Ok(vec![table])
}
