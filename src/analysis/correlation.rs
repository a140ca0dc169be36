//! Pearson, Kendall and Spearman correlation matrices.

use super::error::AnalysisError;
use super::prepare::{check_groups_not_null, group_rows, numeric_column_names};
use super::request::{CorrelationMethod, CorrelationRequest};
use crate::data::Dataset;
use crate::report::{Table, INDEX_HEADER};

/// Pairs where both entries are present.
fn complete_pairs(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| (*a, *b))
        .unzip()
}

pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Ranks starting at 1; ties share their average rank.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &i in &order[start..=end] {
            ranks[i] = rank;
        }
        start = end + 1;
    }
    ranks
}

pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    pearson(&average_ranks(x), &average_ranks(y))
}

/// Kendall's tau-b, which corrects for ties in either variable.
pub fn kendall_tau_b(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let (mut concordant, mut discordant, mut ties_x, mut ties_y) = (0i64, 0i64, 0i64, 0i64);
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            match (dx == 0.0, dy == 0.0) {
                (true, true) => {}
                (true, false) => ties_x += 1,
                (false, true) => ties_y += 1,
                (false, false) if (dx > 0.0) == (dy > 0.0) => concordant += 1,
                (false, false) => discordant += 1,
            }
        }
    }
    let pairs_x = concordant + discordant + ties_x;
    let pairs_y = concordant + discordant + ties_y;
    let denom = ((pairs_x * pairs_y) as f64).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    (concordant - discordant) as f64 / denom
}

/// Correlation of two columns over their pairwise-complete rows.
pub fn correlation(method: CorrelationMethod, x: &[f64], y: &[f64]) -> f64 {
    let (x, y) = complete_pairs(x, y);
    match method {
        CorrelationMethod::Pearson => pearson(&x, &y),
        CorrelationMethod::Kendall => kendall_tau_b(&x, &y),
        CorrelationMethod::Spearman => spearman(&x, &y),
    }
}

/// Square correlation matrix; the diagonal is 1 wherever the variable varies.
pub fn correlation_matrix(method: CorrelationMethod, columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let k = columns.len();
    let mut out = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        for j in i..k {
            let mut r = correlation(method, &columns[i], &columns[j]);
            if i == j && r.is_finite() {
                r = 1.0;
            }
            out[i][j] = r;
            out[j][i] = r;
        }
    }
    out
}

/// One table per requested method.
///
/// Ungrouped tables are indexed by variable name. Grouped tables stack one
/// block per group combination, indexed by the group keys and the variable.
pub fn correlate(
    request: &CorrelationRequest,
    dataset: &Dataset,
) -> Result<Vec<Table>, AnalysisError> {
    check_groups_not_null(dataset, &request.group_list)?;
    let vars = if request.var_list.is_empty() {
        numeric_column_names(dataset, &request.group_list)
    } else {
        request.var_list.clone()
    };
    let values = vars
        .iter()
        .map(|v| dataset.numeric_values(v))
        .collect::<Result<Vec<_>, _>>()?;

    let groups = if request.group_list.is_empty() {
        None
    } else {
        Some(group_rows(dataset, &request.group_list)?)
    };
    let index_names: Vec<String> = request
        .group_list
        .iter()
        .cloned()
        .chain(std::iter::once(INDEX_HEADER.to_string()))
        .collect();

    let mut tables = Vec::with_capacity(request.methods.len());
    for &method in &request.methods {
        let mut table = Table::new(method.name(), index_names.clone(), vars.clone());
        match &groups {
            None => push_block(&mut table, &[], &vars, &correlation_matrix(method, &values)),
            Some(groups) => {
                for (key, rows) in groups {
                    let subset: Vec<Vec<f64>> = values
                        .iter()
                        .map(|col| rows.iter().map(|&r| col[r]).collect())
                        .collect();
                    let keys: Vec<String> = key.iter().map(ToString::to_string).collect();
                    push_block(&mut table, &keys, &vars, &correlation_matrix(method, &subset));
                }
            }
        }
        tables.push(table);
    }
    Ok(tables)
}

fn push_block(table: &mut Table, keys: &[String], vars: &[String], matrix: &[Vec<f64>]) {
    for (var, row) in vars.iter().zip(matrix) {
        let mut index = keys.to_vec();
        index.push(var.clone());
        table.push_row(index, row.clone());
    }
}
