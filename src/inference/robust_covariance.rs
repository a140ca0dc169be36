//! Coefficient covariance: classical and heteroskedasticity-consistent (HC).
//!
//! HC0–HC3 use the sandwich formula
//! `V_HC = (X'X)^-1 X' Ω X (X'X)^-1`
//! where Ω is a diagonal matrix with observation-specific weights that depend
//! on the HC variant. For two-stage least squares X is the matrix of
//! first-stage fitted regressors and the residuals are structural.
//!
//! # References
//!
//! - White, H. (1980). "A Heteroskedasticity-Consistent Covariance Matrix Estimator
//!   and a Direct Test for Heteroskedasticity." *Econometrica*, 48(4), 817–838.
//! - MacKinnon, J.G. & White, H. (1985). "Some Heteroskedasticity-Consistent
//!   Covariance Matrix Estimators with Improved Finite Sample Properties."
//!   *Journal of Econometrics*, 29(3), 305–325.

use faer::{Col, Mat};
use serde::{Deserialize, Serialize};

use crate::diagnostics::compute_leverage;
use crate::solvers::{mat_mul, RegressionError};

/// Type of heteroskedasticity-consistent standard errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HcType {
    /// HC0: `ω_i = e_i²`
    HC0,
    /// HC1: `ω_i = n/df * e_i²`
    #[default]
    HC1,
    /// HC2: `ω_i = e_i² / (1 - h_ii)`
    HC2,
    /// HC3: `ω_i = e_i² / (1 - h_ii)²`
    HC3,
}

/// Covariance estimator requested for a linear model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CovarianceType {
    /// σ² (X'X)⁻¹
    #[default]
    Unadjusted,
    Hc0,
    Hc1,
    Hc2,
    Hc3,
}

impl CovarianceType {
    pub fn hc_type(&self) -> Option<HcType> {
        match self {
            Self::Unadjusted => None,
            Self::Hc0 => Some(HcType::HC0),
            Self::Hc1 => Some(HcType::HC1),
            Self::Hc2 => Some(HcType::HC2),
            Self::Hc3 => Some(HcType::HC3),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unadjusted => "Unadjusted",
            Self::Hc0 => "Robust (HC0)",
            Self::Hc1 => "Robust (HC1)",
            Self::Hc2 => "Robust (HC2)",
            Self::Hc3 => "Robust (HC3)",
        }
    }
}

/// Covariance of the active coefficients.
///
/// * `design` - the active columns of the (second-stage) design
/// * `bread` - `(X'X)⁻¹` over those columns
/// * `residuals` - model residuals
/// * `residual_df` - residual degrees of freedom, used for σ² and the HC1 scale
pub fn coefficient_covariance(
    design: &Mat<f64>,
    bread: &Mat<f64>,
    residuals: &Col<f64>,
    residual_df: usize,
    covariance: CovarianceType,
) -> Result<Mat<f64>, RegressionError> {
    if residual_df == 0 {
        return Err(RegressionError::InsufficientObservations {
            needed: design.nrows() + 1,
            got: design.nrows(),
        });
    }
    match covariance.hc_type() {
        None => {
            let ssr: f64 = residuals.iter().map(|e| e * e).sum();
            let sigma2 = ssr / residual_df as f64;
            Ok(Mat::from_fn(bread.nrows(), bread.ncols(), |r, c| sigma2 * bread[(r, c)]))
        }
        Some(hc) => Ok(sandwich(design, bread, residuals, residual_df, hc)),
    }
}

/// HC sandwich `bread · X'ΩX · bread`.
pub fn sandwich(
    design: &Mat<f64>,
    bread: &Mat<f64>,
    residuals: &Col<f64>,
    residual_df: usize,
    hc_type: HcType,
) -> Mat<f64> {
    let omega = omega_weights(design, bread, residuals, residual_df, hc_type);
    let p = design.ncols();

    // Compute the meat: X' Ω X where Ω = diag(omega)
    let mut meat = Mat::zeros(p, p);
    for (i, &w) in omega.iter().enumerate() {
        for r in 0..p {
            for c in 0..p {
                meat[(r, c)] += w * design[(i, r)] * design[(i, c)];
            }
        }
    }

    let temp = mat_mul(bread, &meat);
    mat_mul(&temp, bread)
}

/// Per-observation omega weights for the HC sandwich estimator.
fn omega_weights(
    design: &Mat<f64>,
    bread: &Mat<f64>,
    residuals: &Col<f64>,
    residual_df: usize,
    hc_type: HcType,
) -> Vec<f64> {
    let n = residuals.nrows();
    match hc_type {
        HcType::HC0 => (0..n).map(|i| residuals[i] * residuals[i]).collect(),
        HcType::HC1 => {
            let scale = n as f64 / residual_df as f64;
            (0..n).map(|i| scale * residuals[i] * residuals[i]).collect()
        }
        HcType::HC2 | HcType::HC3 => {
            let leverage = compute_leverage(design, bread);
            let power = if hc_type == HcType::HC2 { 1 } else { 2 };
            (0..n)
                .map(|i| {
                    let h_ii = leverage[i];
                    let e_sq = residuals[i] * residuals[i];
                    // Fallback to HC0 weight when h_ii >= 1.0 for numerical safety
                    if h_ii.is_nan() || h_ii >= 1.0 {
                        e_sq
                    } else {
                        e_sq / (1.0 - h_ii).powi(power)
                    }
                })
                .collect()
        }
    }
}
