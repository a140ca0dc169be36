//! Leverage (hat-matrix diagonal).

use faer::{Col, Mat};

/// Leverage values `h_ii = x_i' (X'X)⁻¹ x_i`.
///
/// `design` holds only the columns that entered the fit and `xtx_inv` is
/// the inverse cross-product over those same columns.
pub fn compute_leverage(design: &Mat<f64>, xtx_inv: &Mat<f64>) -> Col<f64> {
    let p = design.ncols();
    Col::from_fn(design.nrows(), |i| {
        let mut h = 0.0;
        for r in 0..p {
            let mut row = 0.0;
            for c in 0..p {
                row += xtx_inv[(r, c)] * design[(i, c)];
            }
            h += design[(i, r)] * row;
        }
        h
    })
}
