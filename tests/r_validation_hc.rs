//! Integration tests for HC (Heteroskedasticity-Consistent) standard errors.
//!
//! Reference values computed analytically from the sandwich estimator formulas,
//! matching R's `sandwich::vcovHC()` output. The linear estimators reduce to
//! OLS when every regressor instruments itself (2SLS) or when all rows share
//! one entity (within estimator), so the OLS references apply to both.
//!
//! R validation code:
//! ```r
//! library(sandwich)
//! library(lmtest)
//!
//! # Simple heteroskedastic data
//! x <- c(1, 2, 3, 4, 5)
//! y <- c(2.1, 4.3, 5.8, 8.2, 9.9)
//! m <- lm(y ~ x)
//!
//! sqrt(diag(vcovHC(m, type="HC0")))  # [1] 0.12237 0.03178
//! sqrt(diag(vcovHC(m, type="HC1")))  # [1] 0.15796 0.04103
//! sqrt(diag(vcovHC(m, type="HC2")))  # [1] 0.15489 0.04185
//! sqrt(diag(vcovHC(m, type="HC3")))  # [1] 0.20343 0.05722
//!
//! # No-intercept model
//! m0 <- lm(y ~ x - 1)
//! sqrt(diag(vcovHC(m0, type="HC0")))  # [1] 0.02377
//! sqrt(diag(vcovHC(m0, type="HC1")))  # [1] 0.02658
//! sqrt(diag(vcovHC(m0, type="HC2")))  # [1] 0.02817
//! sqrt(diag(vcovHC(m0, type="HC3")))  # [1] 0.03408
//! ```

use anofox_econometrics::inference::{sandwich, CovarianceType, HcType};
use anofox_econometrics::solvers::{
    cross_product, invert_spd, with_intercept_column, FittedIv, FittedRegressor, GroupIndex,
    PanelIndex, PanelRegressor, TwoStageLeastSquares,
};
use approx::assert_relative_eq;
use faer::{Col, Mat};

// --------------------------------------------------------------------------
// Test data: simple heteroskedastic case (5 obs, 1 predictor)
// --------------------------------------------------------------------------

const X_SIMPLE: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];
const Y_SIMPLE: [f64; 5] = [2.1, 4.3, 5.8, 8.2, 9.9];

// OLS: y = 0.21 + 1.95*x
// Residuals: [-0.06, 0.19, -0.26, 0.19, -0.06]
// Leverage:  [0.60, 0.30, 0.20, 0.30, 0.60]

const HC0_SE: (f64, f64) = (0.12237, 0.03178);
// HC1 SE = sqrt(n/(n-p)) * HC0 SE, with n=5, p=2
const HC1_SE: (f64, f64) = (0.15796, 0.04103);
const HC2_SE: (f64, f64) = (0.15489, 0.04185);
const HC3_SE: (f64, f64) = (0.20343, 0.05722);

const HC0_SE_NOINT: f64 = 0.02377;
const HC1_SE_NOINT: f64 = 0.02658;
const HC2_SE_NOINT: f64 = 0.02817;
const HC3_SE_NOINT: f64 = 0.03408;

fn simple_data() -> (Mat<f64>, Col<f64>) {
    (
        Mat::from_fn(5, 1, |i, _| X_SIMPLE[i]),
        Col::from_fn(5, |i| Y_SIMPLE[i]),
    )
}

/// 2SLS with the regressor as its own instrument.
fn fit_exactly_instrumented(covariance: CovarianceType, with_intercept: bool) -> FittedIv {
    let (x, y) = simple_data();
    TwoStageLeastSquares::builder()
        .with_intercept(with_intercept)
        .covariance(covariance)
        .build()
        .fit(&x, &y, &x)
        .expect("simple model should fit")
}

fn check_se(fitted: &impl FittedRegressor, expected: (f64, f64)) {
    let result = fitted.result();
    assert_relative_eq!(result.intercept_std_error.unwrap(), expected.0, epsilon = 0.01);
    assert_relative_eq!(result.std_errors.as_ref().unwrap()[0], expected.1, epsilon = 0.01);
}

#[test]
fn test_ols_point_estimates() {
    let fitted = fit_exactly_instrumented(CovarianceType::Unadjusted, true);
    assert_relative_eq!(fitted.intercept().unwrap(), 0.21, epsilon = 1e-10);
    assert_relative_eq!(fitted.coefficients()[0], 1.95, epsilon = 1e-10);
    let expected = [-0.06, 0.19, -0.26, 0.19, -0.06];
    for (i, e) in expected.iter().enumerate() {
        assert_relative_eq!(fitted.result().residuals[i], e, epsilon = 1e-10);
    }
}

#[test]
fn test_hc0_simple_regression() {
    check_se(&fit_exactly_instrumented(CovarianceType::Hc0, true), HC0_SE);
}

#[test]
fn test_hc1_simple_regression() {
    check_se(&fit_exactly_instrumented(CovarianceType::Hc1, true), HC1_SE);
}

#[test]
fn test_hc2_simple_regression() {
    check_se(&fit_exactly_instrumented(CovarianceType::Hc2, true), HC2_SE);
}

#[test]
fn test_hc3_simple_regression() {
    check_se(&fit_exactly_instrumented(CovarianceType::Hc3, true), HC3_SE);
}

// --------------------------------------------------------------------------
// Test: HC ordering property (HC3 >= HC2 >= HC0 for slope SE)
// --------------------------------------------------------------------------

#[test]
fn test_hc_ordering() {
    let se = |cov| fit_exactly_instrumented(cov, true).result().std_errors.as_ref().unwrap()[0];
    let (hc0, hc2, hc3) = (
        se(CovarianceType::Hc0),
        se(CovarianceType::Hc2),
        se(CovarianceType::Hc3),
    );
    assert!(hc3 >= hc2 - 1e-10, "HC3 ({hc3}) should be >= HC2 ({hc2})");
    assert!(hc2 >= hc0 - 1e-10, "HC2 ({hc2}) should be >= HC0 ({hc0})");
}

#[test]
fn test_hc1_full_inference() {
    let fitted = fit_exactly_instrumented(CovarianceType::Hc1, true);
    let result = fitted.result();
    assert_eq!(fitted.covariance, CovarianceType::Hc1);
    assert_eq!(result.confidence_level, 0.95);

    let coef = fitted.coefficients()[0];
    let se = result.std_errors.as_ref().unwrap()[0];
    assert_relative_eq!(result.t_statistics.as_ref().unwrap()[0], coef / se, epsilon = 0.001);
    let p = result.p_values.as_ref().unwrap()[0];
    assert!((0.0..=1.0).contains(&p));
    assert!(result.conf_interval_lower.as_ref().unwrap()[0] < coef);
    assert!(result.conf_interval_upper.as_ref().unwrap()[0] > coef);

    let (lo, hi) = result.intercept_conf_interval.unwrap();
    assert!(lo < hi);
}

// --------------------------------------------------------------------------
// Test: No-intercept model
// --------------------------------------------------------------------------

#[test]
fn test_hc_no_intercept() {
    let cases = [
        (CovarianceType::Hc0, HC0_SE_NOINT),
        (CovarianceType::Hc1, HC1_SE_NOINT),
        (CovarianceType::Hc2, HC2_SE_NOINT),
        (CovarianceType::Hc3, HC3_SE_NOINT),
    ];
    for (cov, expected) in cases {
        let fitted = fit_exactly_instrumented(cov, false);
        assert!(fitted.result().intercept_std_error.is_none());
        let se = fitted.result().std_errors.as_ref().unwrap()[0];
        assert_relative_eq!(se, expected, epsilon = 0.01);
    }
}

// --------------------------------------------------------------------------
// Test: within estimator with a single entity is OLS
// --------------------------------------------------------------------------

#[test]
fn test_single_entity_panel_matches_ols() {
    let (x, y) = simple_data();
    let index = PanelIndex::entity_only(GroupIndex::constant(5));
    for (cov, expected) in [(CovarianceType::Hc1, HC1_SE), (CovarianceType::Hc3, HC3_SE)] {
        let fitted = PanelRegressor::builder()
            .covariance(cov)
            .drop_singletons(false)
            .build()
            .fit(&x, &y, &index)
            .expect("single entity should fit");
        assert_relative_eq!(fitted.coefficients()[0], 1.95, epsilon = 1e-10);
        check_se(&fitted, expected);
    }
}

// --------------------------------------------------------------------------
// Test: HC SEs differ from classical SEs for heteroskedastic data
// --------------------------------------------------------------------------

#[test]
fn test_hc_vs_classical_heteroskedastic() {
    let n = 20;
    let x = Mat::from_fn(n, 1, |i, _| (i + 1) as f64);
    // y = 1 + 2*x + noise * x (heteroskedastic)
    let y_data = [
        2.5, 5.8, 6.2, 10.1, 10.3, 14.8, 12.9, 18.5, 16.2, 23.7, 20.1, 27.9, 24.3, 31.6, 28.4, 35.8,
        33.1, 39.2,
        36.5, 43.1,
    ];
    let y = Col::from_fn(n, |i| y_data[i]);

    let fit = |cov| {
        TwoStageLeastSquares::builder()
            .covariance(cov)
            .build()
            .fit(&x, &y, &x)
            .expect("model should fit")
    };
    let classical = fit(CovarianceType::Unadjusted).result().std_errors.as_ref().unwrap()[0];
    let hc1 = fit(CovarianceType::Hc1).result().std_errors.as_ref().unwrap()[0];

    assert!(classical > 0.0 && classical.is_finite());
    assert!(hc1 > 0.0 && hc1.is_finite());
    let ratio = hc1 / classical;
    assert!(
        (ratio - 1.0).abs() > 1e-6,
        "HC1 and classical SE should differ for heteroskedastic data, ratio = {ratio}"
    );
}

// --------------------------------------------------------------------------
// Test: sandwich computed directly from known residuals
// --------------------------------------------------------------------------

#[test]
fn test_sandwich_directly() {
    let (x, _) = simple_data();
    let design = with_intercept_column(&x, true);
    let bread = invert_spd(&cross_product(&design)).unwrap();
    let residuals = Col::from_fn(5, |i| [-0.06, 0.19, -0.26, 0.19, -0.06][i]);

    let vcov = sandwich(&design, &bread, &residuals, 3, HcType::HC0);
    assert_relative_eq!(vcov[(0, 0)].sqrt(), HC0_SE.0, epsilon = 0.01);
    assert_relative_eq!(vcov[(1, 1)].sqrt(), HC0_SE.1, epsilon = 0.01);
}
