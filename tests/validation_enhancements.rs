//! Validation tests for input handling and reproducibility.
//!
//! Covers:
//! - Dimension mismatches
//! - Out-of-range and NaN outcomes
//! - Too few observations for the parameters and absorbed effects
//! - Collinear regressors
//! - Determinism of repeated fits

use anofox_econometrics::solvers::{
    BinomialRegressor, FittedRegressor, GroupIndex, PanelIndex, PanelRegressor, RegressionError,
    Regressor, TwoStageLeastSquares,
};
use faer::{Col, Mat};

mod common;

// ============================================================================
// 1. DIMENSION CHECKS
// ============================================================================

#[test]
fn test_dimension_mismatch_everywhere() {
    let x = Mat::from_fn(10, 1, |i, _| i as f64);
    let y = Col::from_fn(9, |i| (i % 2) as f64);

    let err = BinomialRegressor::logit().fit(&x, &y).unwrap_err();
    assert!(matches!(err, RegressionError::DimensionMismatch { .. }));

    let err = TwoStageLeastSquares::builder().build().fit(&x, &y, &x).unwrap_err();
    assert!(matches!(err, RegressionError::DimensionMismatch { .. }));

    let index = PanelIndex::entity_only(GroupIndex::constant(10));
    let err = PanelRegressor::builder().build().fit(&x, &y, &index).unwrap_err();
    assert!(matches!(err, RegressionError::DimensionMismatch { .. }));
}

#[test]
fn test_panel_index_lengths_must_agree() {
    let err = PanelIndex::from_keys(&[1, 1, 2], &[2019, 2020]).unwrap_err();
    assert!(matches!(err, RegressionError::DimensionMismatch { .. }));
}

// ============================================================================
// 2. OUTCOME CHECKS
// ============================================================================

#[test]
fn test_binomial_rejects_out_of_range_outcome() {
    let x = Mat::from_fn(6, 1, |i, _| i as f64);
    let y = Col::from_fn(6, |i| [0.0, 1.0, 2.0, 0.0, 1.0, 1.0][i]);
    let err = BinomialRegressor::probit().fit(&x, &y).unwrap_err();
    assert_eq!(err, RegressionError::OutcomeOutOfRange { value: 2.0 });
}

#[test]
fn test_binomial_rejects_nan_outcome() {
    let x = Mat::from_fn(6, 1, |i, _| i as f64);
    let y = Col::from_fn(6, |i| if i == 2 { f64::NAN } else { (i % 2) as f64 });
    let err = BinomialRegressor::logit().fit(&x, &y).unwrap_err();
    assert!(matches!(err, RegressionError::NumericalError(_)), "{err}");
}

// ============================================================================
// 3. DEGREES OF FREEDOM
// ============================================================================

#[test]
fn test_panel_too_few_rows_for_effects() {
    // 4 rows: intercept + 2 slopes + 1 absorbed entity leaves no residual df
    let x = Mat::from_fn(4, 2, |i, j| [[1.0, 0.5], [2.0, 3.0], [1.5, 1.0], [4.0, 1.5]][i][j]);
    let y = Col::from_fn(4, |i| [1.0, 2.0, 0.5, 3.0][i]);
    let index = PanelIndex::entity_only(GroupIndex::from_keys(&["a", "a", "b", "b"]));
    let err = PanelRegressor::builder().build().fit(&x, &y, &index).unwrap_err();
    assert!(matches!(err, RegressionError::InsufficientObservations { .. }), "{err}");
}

#[test]
fn test_binomial_needs_more_rows_than_parameters() {
    let x = Mat::from_fn(2, 1, |i, _| i as f64);
    let y = Col::from_fn(2, |i| i as f64);
    let err = BinomialRegressor::logit().fit(&x, &y).unwrap_err();
    assert!(matches!(err, RegressionError::InsufficientObservations { needed: 3, got: 2 }));
}

// ============================================================================
// 4. COLLINEARITY
// ============================================================================

#[test]
fn test_panel_collinear_column_is_nan() {
    let (x, y, entities, _) = common::generate_panel_data(15, 4, &[1.0], false, 0.1, 2);
    let n = y.nrows();
    let x2 = Mat::from_fn(n, 2, |i, j| if j == 0 { x[(i, 0)] } else { 2.0 * x[(i, 0)] });
    let index = PanelIndex::entity_only(GroupIndex::from_keys(&entities));

    let fitted = PanelRegressor::builder().build().fit(&x2, &y, &index).unwrap();
    assert!(fitted.coefficients()[0].is_finite());
    assert!(fitted.coefficients()[1].is_nan());
    assert!(fitted.result().aliased[1]);
    assert!(fitted.absorbed.is_empty());
    assert_eq!(fitted.result().n_parameters, 2);
}

#[test]
fn test_iv_collinear_control_is_dropped() {
    let n = 200;
    let (y, x1, x_end, z) = common::generate_iv_data(n, 12);
    // third structural column repeats the control
    let x = Mat::from_fn(n, 3, |i, j| match j {
        0 => x_end[i],
        _ => x1[i],
    });
    let zm = Mat::from_fn(n, 3, |i, j| match j {
        0 => z[i],
        _ => x1[i],
    });
    let y = Col::from_fn(n, |i| y[i]);

    let fitted = TwoStageLeastSquares::builder().build().fit(&x, &y, &zm).unwrap();
    assert!(fitted.coefficients()[0].is_finite());
    assert!(fitted.coefficients()[2].is_nan());
}

// ============================================================================
// 5. DETERMINISM
// ============================================================================

#[test]
fn test_repeated_fits_are_identical() {
    let (x, y) = common::generate_binary_data(120, 0.1, 0.9, 4);
    let first = BinomialRegressor::probit().fit(&x, &y).unwrap();
    for _ in 0..5 {
        let again = BinomialRegressor::probit().fit(&x, &y).unwrap();
        assert_eq!(first.coefficients()[0].to_bits(), again.coefficients()[0].to_bits());
        assert_eq!(first.iterations, again.iterations);
    }

    let (xp, yp, entities, times) = common::generate_panel_data(12, 5, &[0.7, 0.2], true, 0.3, 6);
    let index = PanelIndex::from_keys(&entities, &times).unwrap();
    let fit = || {
        PanelRegressor::builder()
            .time_effects(true)
            .build()
            .fit(&xp, &yp, &index)
            .unwrap()
    };
    let a = fit();
    let b = fit();
    for j in 0..2 {
        assert_eq!(a.coefficients()[j].to_bits(), b.coefficients()[j].to_bits());
    }
}
