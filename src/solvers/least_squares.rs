//! Least-squares kernel shared by the linear estimators.
//!
//! Columns are screened for collinearity in order with an incremental
//! Cholesky factorisation of X'X: a column whose squared residual norm after
//! projection on the columns already accepted falls below
//! `tolerance * ||x_j||²` is aliased (dropped, coefficient NaN), the way R's
//! `lm` reports collinear terms.

use faer::{Col, Mat};

use super::traits::RegressionError;

/// Default relative tolerance for collinearity screening.
pub const DEFAULT_RANK_TOLERANCE: f64 = 1e-10;

/// Outcome of a least-squares solve.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// One entry per input column; NaN for aliased columns.
    pub params: Col<f64>,
    pub aliased: Vec<bool>,
    /// Indices of the columns that entered the solve.
    pub active: Vec<usize>,
    /// (X'X)⁻¹ over the active columns.
    pub xtx_inv: Mat<f64>,
    pub fitted: Col<f64>,
    pub residuals: Col<f64>,
    pub ssr: f64,
}

impl LeastSquares {
    pub fn rank(&self) -> usize {
        self.active.len()
    }

    /// Active coefficients in active order.
    pub fn active_params(&self) -> Col<f64> {
        Col::from_fn(self.active.len(), |k| self.params[self.active[k]])
    }
}

/// Solve min ||y - Xβ||² with sequential aliasing of collinear columns.
pub fn least_squares(
    x: &Mat<f64>,
    y: &Col<f64>,
    tolerance: f64,
) -> Result<LeastSquares, RegressionError> {
    if x.nrows() != y.nrows() {
        return Err(RegressionError::DimensionMismatch {
            x_rows: x.nrows(),
            y_len: y.nrows(),
        });
    }

    let xtx = cross_product(x);
    let aliased = detect_aliased(&xtx, tolerance);
    let active: Vec<usize> = (0..x.ncols()).filter(|&j| !aliased[j]).collect();

    let xa = select_columns(x, &active);
    let xtx_a = cross_product(&xa);
    let xty_a = cross_product_vec(&xa, y);

    let l = cholesky(&xtx_a)?;
    let beta = cholesky_solve(&l, &xty_a);
    let xtx_inv = cholesky_inverse(&l);

    let fitted = mat_vec(&xa, &beta);
    let residuals = Col::from_fn(y.nrows(), |i| y[i] - fitted[i]);
    let ssr = residuals.iter().map(|r| r * r).sum();

    Ok(LeastSquares {
        params: expand_active(&beta, &active, x.ncols()),
        aliased,
        active,
        xtx_inv,
        fitted,
        residuals,
        ssr,
    })
}

/// Flag columns that are (numerically) linear combinations of earlier ones.
pub fn detect_aliased(xtx: &Mat<f64>, tolerance: f64) -> Vec<bool> {
    let p = xtx.nrows();
    let mut aliased = vec![false; p];
    // rows of L for the accepted columns, in acceptance order
    let mut accepted: Vec<usize> = Vec::with_capacity(p);
    let mut l_rows: Vec<Vec<f64>> = Vec::with_capacity(p);

    for j in 0..p {
        let a_jj = xtx[(j, j)];
        if a_jj.is_nan() || a_jj <= 0.0 || a_jj.is_infinite() {
            aliased[j] = true;
            continue;
        }

        let mut row = Vec::with_capacity(accepted.len() + 1);
        for (k, &col_k) in accepted.iter().enumerate() {
            let mut v = xtx[(j, col_k)];
            for m in 0..k {
                v -= row[m] * l_rows[k][m];
            }
            row.push(v / l_rows[k][k]);
        }
        let d = a_jj - row.iter().map(|v| v * v).sum::<f64>();

        if d <= tolerance * a_jj {
            aliased[j] = true;
        } else {
            row.push(d.sqrt());
            accepted.push(j);
            l_rows.push(row);
        }
    }

    aliased
}

/// Prepend a column of ones when requested.
pub fn with_intercept_column(x: &Mat<f64>, with_intercept: bool) -> Mat<f64> {
    if !with_intercept {
        return x.clone();
    }
    let n = x.nrows();
    let p = x.ncols();
    Mat::from_fn(n, p + 1, |i, j| if j == 0 { 1.0 } else { x[(i, j - 1)] })
}

/// X'X
pub fn cross_product(x: &Mat<f64>) -> Mat<f64> {
    let n = x.nrows();
    let p = x.ncols();
    let mut xtx = Mat::zeros(p, p);
    for i in 0..p {
        for j in i..p {
            let mut sum = 0.0;
            for k in 0..n {
                sum += x[(k, i)] * x[(k, j)];
            }
            xtx[(i, j)] = sum;
            xtx[(j, i)] = sum;
        }
    }
    xtx
}

/// X'y
pub fn cross_product_vec(x: &Mat<f64>, y: &Col<f64>) -> Col<f64> {
    Col::from_fn(x.ncols(), |j| (0..x.nrows()).map(|i| x[(i, j)] * y[i]).sum())
}

pub fn mat_vec(x: &Mat<f64>, b: &Col<f64>) -> Col<f64> {
    Col::from_fn(x.nrows(), |i| (0..x.ncols()).map(|j| x[(i, j)] * b[j]).sum())
}

/// Simple matrix multiplication (A × B).
pub fn mat_mul(a: &Mat<f64>, b: &Mat<f64>) -> Mat<f64> {
    let m = a.nrows();
    let n = b.ncols();
    let k = a.ncols();
    let mut result = Mat::zeros(m, n);
    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0;
            for l in 0..k {
                sum += a[(i, l)] * b[(l, j)];
            }
            result[(i, j)] = sum;
        }
    }
    result
}

pub fn select_columns(x: &Mat<f64>, columns: &[usize]) -> Mat<f64> {
    Mat::from_fn(x.nrows(), columns.len(), |i, k| x[(i, columns[k])])
}

pub fn select_rows(x: &Mat<f64>, rows: &[usize]) -> Mat<f64> {
    Mat::from_fn(rows.len(), x.ncols(), |r, j| x[(rows[r], j)])
}

/// Sub-matrix over the same rows and columns.
pub fn select_block(a: &Mat<f64>, idx: &[usize]) -> Mat<f64> {
    Mat::from_fn(idx.len(), idx.len(), |r, c| a[(idx[r], idx[c])])
}

/// Scatter active values into a vector of length `len`, NaN elsewhere.
pub fn expand_active(values: &Col<f64>, active: &[usize], len: usize) -> Col<f64> {
    let mut full = Col::from_fn(len, |_| f64::NAN);
    for (k, &j) in active.iter().enumerate() {
        full[j] = values[k];
    }
    full
}

/// Cholesky factor L (A = LL') of a symmetric positive definite matrix.
pub fn cholesky(a: &Mat<f64>) -> Result<Mat<f64>, RegressionError> {
    let n = a.nrows();
    let mut l: Mat<f64> = Mat::zeros(n, n);
    for j in 0..n {
        let mut sum = 0.0;
        for k in 0..j {
            sum += l[(j, k)].powi(2);
        }
        let diag = a[(j, j)] - sum;
        if diag.is_nan() || diag <= 0.0 || diag.is_infinite() {
            return Err(RegressionError::SingularMatrix);
        }
        l[(j, j)] = diag.sqrt();

        for i in (j + 1)..n {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[(i, k)] * l[(j, k)];
            }
            l[(i, j)] = (a[(i, j)] - sum) / l[(j, j)];
        }
    }
    Ok(l)
}

/// Solve LL'x = b.
pub fn cholesky_solve(l: &Mat<f64>, b: &Col<f64>) -> Col<f64> {
    let n = l.nrows();

    // Forward substitution: Ly = b
    let mut y = Col::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[(i, j)] * y[j];
        }
        y[i] = sum / l[(i, i)];
    }

    // Backward substitution: L'x = y
    let mut x = Col::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[(j, i)] * x[j];
        }
        x[i] = sum / l[(i, i)];
    }
    x
}

/// (LL')⁻¹ column by column.
pub fn cholesky_inverse(l: &Mat<f64>) -> Mat<f64> {
    let n = l.nrows();
    let mut inv = Mat::zeros(n, n);
    for c in 0..n {
        let e = Col::from_fn(n, |i| if i == c { 1.0 } else { 0.0 });
        let col = cholesky_solve(l, &e);
        for r in 0..n {
            inv[(r, c)] = col[r];
        }
    }
    inv
}

/// Inverse of a symmetric positive definite matrix.
pub fn invert_spd(a: &Mat<f64>) -> Result<Mat<f64>, RegressionError> {
    Ok(cholesky_inverse(&cholesky(a)?))
}
