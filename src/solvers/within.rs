//! Group indices and the within (demeaning) transformation.
//!
//! One grouping dimension is removed exactly with a single pass of group
//! means. Two dimensions are removed by alternating projections (demean by
//! the first, then the second, until the vector stops changing), which
//! converges to the projection onto the orthogonal complement of both sets of
//! group dummies.

use std::collections::BTreeMap;

use faer::{Col, Mat};
use log::warn;

/// Dense group codes for one grouping dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupIndex {
    codes: Vec<usize>,
    counts: Vec<usize>,
}

impl GroupIndex {
    /// Code every row by its key. Codes follow the sorted key order.
    pub fn from_keys<K: Ord + Clone>(keys: &[K]) -> Self {
        let mut lookup: BTreeMap<K, usize> = BTreeMap::new();
        for key in keys {
            lookup.entry(key.clone()).or_insert(0);
        }
        for (code, slot) in lookup.values_mut().enumerate() {
            *slot = code;
        }
        let codes: Vec<usize> = keys.iter().map(|k| lookup[k]).collect();
        Self::from_codes(codes, lookup.len())
    }

    /// A single group covering `n` rows.
    pub fn constant(n: usize) -> Self {
        Self::from_codes(vec![0; n], usize::from(n > 0))
    }

    fn from_codes(codes: Vec<usize>, n_groups: usize) -> Self {
        let mut counts = vec![0; n_groups];
        for &c in &codes {
            counts[c] += 1;
        }
        Self { codes, counts }
    }

    /// Cells of the cross-classification of two indices.
    pub fn combine(a: &GroupIndex, b: &GroupIndex) -> Self {
        let pairs: Vec<(usize, usize)> =
            a.codes.iter().copied().zip(b.codes.iter().copied()).collect();
        Self::from_keys(&pairs)
    }

    /// Keep the listed rows and recode so that no group is empty.
    pub fn subset(&self, rows: &[usize]) -> Self {
        let keys: Vec<usize> = rows.iter().map(|&r| self.codes[r]).collect();
        Self::from_keys(&keys)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn n_groups(&self) -> usize {
        self.counts.len()
    }

    pub fn codes(&self) -> &[usize] {
        &self.codes
    }

    /// Rows per group.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Size of the group each row belongs to.
    pub fn group_size(&self, row: usize) -> usize {
        self.counts[self.codes[row]]
    }

    pub fn group_means(&self, values: &[f64]) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_groups()];
        for (&c, &v) in self.codes.iter().zip(values) {
            sums[c] += v;
        }
        sums.iter()
            .zip(&self.counts)
            .map(|(s, &n)| if n > 0 { s / n as f64 } else { 0.0 })
            .collect()
    }

    /// Subtract group means in place.
    pub fn demean_in_place(&self, values: &mut [f64]) {
        let means = self.group_means(values);
        for (v, &c) in values.iter_mut().zip(&self.codes) {
            *v -= means[c];
        }
    }
}

/// Limits for alternating projections.
#[derive(Debug, Clone, Copy)]
pub struct DemeanOptions {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for DemeanOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 10_000,
        }
    }
}

/// Remove every listed grouping dimension from a vector.
///
/// Returns the transformed vector and the number of sweeps used.
pub fn demean(values: &[f64], groups: &[&GroupIndex], options: DemeanOptions) -> (Vec<f64>, usize) {
    let mut v = values.to_vec();
    match groups {
        [] => (v, 0),
        [only] => {
            only.demean_in_place(&mut v);
            (v, 1)
        }
        _ => {
            let scale = values.iter().map(|x| x.abs()).fold(0.0, f64::max).max(1.0);
            for sweep in 1..=options.max_iterations {
                let before = v.clone();
                for g in groups {
                    g.demean_in_place(&mut v);
                }
                let change = v
                    .iter()
                    .zip(&before)
                    .map(|(a, b)| (a - b).abs())
                    .fold(0.0, f64::max);
                if change <= options.tolerance * scale {
                    return (v, sweep);
                }
            }
            warn!(
                "alternating projections did not converge in {} sweeps",
                options.max_iterations
            );
            (v, options.max_iterations)
        }
    }
}

/// Column-wise [`demean`] of a matrix.
pub fn demean_matrix(x: &Mat<f64>, groups: &[&GroupIndex], options: DemeanOptions) -> Mat<f64> {
    let mut out = Mat::zeros(x.nrows(), x.ncols());
    for j in 0..x.ncols() {
        let col: Vec<f64> = (0..x.nrows()).map(|i| x[(i, j)]).collect();
        let (dm, _) = demean(&col, groups, options);
        for (i, v) in dm.into_iter().enumerate() {
            out[(i, j)] = v;
        }
    }
    out
}

pub fn demean_col(y: &Col<f64>, groups: &[&GroupIndex], options: DemeanOptions) -> Col<f64> {
    let values: Vec<f64> = y.iter().copied().collect();
    let (dm, _) = demean(&values, groups, options);
    Col::from_fn(dm.len(), |i| dm[i])
}

/// Subtract the mean of every cell formed by one or more grouping columns.
///
/// This is a single exact pass over the cross-classified cells, not a
/// two-way within transformation.
pub fn demean_by_cells(x: &Mat<f64>, groups: &[&GroupIndex]) -> Mat<f64> {
    let Some((first, rest)) = groups.split_first() else {
        return x.clone();
    };
    let cells = rest
        .iter()
        .fold((*first).clone(), |acc, g| GroupIndex::combine(&acc, g));
    demean_matrix(x, &[&cells], DemeanOptions::default())
}
