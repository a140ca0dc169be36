//! Two-stage least squares.
//!
//! Every structural regressor is projected on the instrument set, the
//! response is regressed on the projections, and residuals are formed with
//! the original regressors:
//!
//! ```text
//! X̂ = Z (Z'Z)⁻¹ Z'X
//! β = (X̂'X̂)⁻¹ X̂'y
//! e = y - Xβ
//! ```
//!
//! Exogenous regressors must appear in both `x` and `z`; they are then
//! reproduced exactly by the first stage.

use faer::{Col, Mat};
use log::{debug, warn};

use super::least_squares::{
    cross_product, detect_aliased, least_squares, select_block, select_columns,
    with_intercept_column, DEFAULT_RANK_TOLERANCE,
};
use super::traits::{linear_prediction, FittedRegressor, RegressionError};
use crate::core::RegressionResult;
use crate::inference::{
    coefficient_covariance, wald_test, CoefficientInference, CovarianceType, ReferenceDistribution,
};

/// Instrumental-variables estimator.
#[derive(Debug, Clone)]
pub struct TwoStageLeastSquares {
    with_intercept: bool,
    covariance: CovarianceType,
    confidence_level: f64,
    rank_tolerance: f64,
    endogenous: Vec<usize>,
}

impl Default for TwoStageLeastSquares {
    fn default() -> Self {
        TwoStageLeastSquaresBuilder::default().build()
    }
}

impl TwoStageLeastSquares {
    pub fn builder() -> TwoStageLeastSquaresBuilder {
        TwoStageLeastSquaresBuilder::default()
    }

    /// Fit the structural equation `y = Xβ + e` with instruments `z`.
    ///
    /// Neither `x` nor `z` includes the intercept; when enabled, it is added
    /// to both.
    pub fn fit(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        z: &Mat<f64>,
    ) -> Result<FittedIv, RegressionError> {
        let n = y.nrows();
        for rows in [x.nrows(), z.nrows()] {
            if rows != n {
                return Err(RegressionError::DimensionMismatch { x_rows: rows, y_len: n });
            }
        }

        let n_features = x.ncols();
        let offset = usize::from(self.with_intercept);
        let xd = with_intercept_column(x, self.with_intercept);
        let zd = with_intercept_column(z, self.with_intercept);

        let x_aliased = detect_aliased(&cross_product(&xd), self.rank_tolerance);
        let rank_x = x_aliased.iter().filter(|&&a| !a).count();
        if rank_x == 0 {
            return Err(RegressionError::RankDeficient {
                columns: (0..n_features).collect(),
            });
        }
        // An endogenous regressor cannot be dropped as collinear.
        let lost_endogenous: Vec<usize> = self
            .endogenous
            .iter()
            .copied()
            .filter(|&j| j < n_features && x_aliased[j + offset])
            .collect();
        if !lost_endogenous.is_empty() {
            return Err(RegressionError::RankDeficient {
                columns: lost_endogenous,
            });
        }
        let rank_z = detect_aliased(&cross_product(&zd), self.rank_tolerance)
            .iter()
            .filter(|&&a| !a)
            .count();
        if rank_z < rank_x {
            return Err(RegressionError::Underidentified {
                instruments: rank_z,
                regressors: rank_x,
            });
        }

        // First stage, one regression per structural column.
        let mut x_hat = Mat::zeros(n, xd.ncols());
        let mut first_stage_r_squared = Vec::with_capacity(n_features);
        for j in 0..xd.ncols() {
            let col = Col::from_fn(n, |i| xd[(i, j)]);
            let stage = least_squares(&zd, &col, self.rank_tolerance)?;
            for i in 0..n {
                x_hat[(i, j)] = stage.fitted[i];
            }
            if j >= offset {
                first_stage_r_squared.push(r_squared(&col, stage.ssr, self.with_intercept));
            }
        }

        let second = least_squares(&x_hat, y, self.rank_tolerance)?;
        let lost: Vec<usize> = (0..xd.ncols())
            .filter(|&j| second.aliased[j] && !x_aliased[j])
            .collect();
        if !lost.is_empty() {
            return Err(RegressionError::Underidentified {
                instruments: second.rank(),
                regressors: rank_x,
            });
        }
        let collinear: Vec<usize> = (offset..xd.ncols())
            .filter(|&j| x_aliased[j])
            .map(|j| j - offset)
            .collect();
        if !collinear.is_empty() {
            warn!("dropping collinear regressors {:?}", collinear);
        }

        let k = second.rank();
        if n <= k {
            return Err(RegressionError::InsufficientObservations { needed: k + 1, got: n });
        }
        let residual_df = n - k;

        let x_active = select_columns(&xd, &second.active);
        let beta_active = second.active_params();
        let residuals = Col::from_fn(n, |i| {
            let fit: f64 = (0..k).map(|c| x_active[(i, c)] * beta_active[c]).sum();
            y[i] - fit
        });
        let ssr: f64 = residuals.iter().map(|e| e * e).sum();

        let x_hat_active = select_columns(&x_hat, &second.active);
        let vcov = coefficient_covariance(
            &x_hat_active,
            &second.xtx_inv,
            &residuals,
            residual_df,
            self.covariance,
        )?;
        let se_active = CoefficientInference::standard_errors(&vcov);
        let std_errors = Col::from_fn(xd.ncols(), |j| {
            second
                .active
                .iter()
                .position(|&a| a == j)
                .map_or(f64::NAN, |c| se_active[c])
        });

        let mut result = RegressionResult::empty(n_features, n);
        result.set_parameters(&second.params, self.with_intercept);
        result.aliased = (0..n_features).map(|j| second.aliased[j + offset]).collect();
        result.n_parameters = k;
        result.set_inference(
            &std_errors,
            ReferenceDistribution::StudentT(residual_df as f64),
            self.confidence_level,
        );
        result.r_squared = r_squared(y, ssr, self.with_intercept);
        result.adj_r_squared =
            1.0 - (1.0 - result.r_squared) * (n as f64 - offset as f64) / residual_df as f64;
        result.mse = ssr / residual_df as f64;
        result.rmse = result.mse.sqrt();

        let slope_c: Vec<usize> = (0..k).filter(|&c| second.active[c] >= offset).collect();
        let slopes = Col::from_fn(slope_c.len(), |i| beta_active[slope_c[i]]);
        let wald = wald_test(&slopes, &select_block(&vcov, &slope_c), residual_df);
        result.f_statistic = wald.f_statistic;
        result.f_pvalue = wald.p_value;

        result.fitted_values = Col::from_fn(n, |i| y[i] - residuals[i]);
        result.residuals = residuals;

        debug!("2SLS fit: n={}, regressors={}, instruments={}", n, rank_x, rank_z);

        Ok(FittedIv {
            result,
            first_stage_r_squared,
            n_instruments: rank_z,
            covariance: self.covariance,
            vcov,
        })
    }
}

/// 1 - SSR/TSS, centred when the model has an intercept.
fn r_squared(y: &Col<f64>, ssr: f64, centred: bool) -> f64 {
    let n = y.nrows() as f64;
    let mean = if centred { y.iter().sum::<f64>() / n } else { 0.0 };
    let tss: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    if tss > 0.0 {
        1.0 - ssr / tss
    } else {
        f64::NAN
    }
}

/// A fitted two-stage least-squares model.
#[derive(Debug, Clone)]
pub struct FittedIv {
    result: RegressionResult,
    /// First-stage R² of each structural regressor (intercept excluded).
    pub first_stage_r_squared: Vec<f64>,
    /// Rank of the instrument set, intercept included.
    pub n_instruments: usize,
    pub covariance: CovarianceType,
    pub vcov: Mat<f64>,
}

impl FittedIv {
    /// Instruments beyond the number needed for exact identification.
    pub fn overidentification(&self) -> usize {
        self.n_instruments.saturating_sub(self.result.n_parameters)
    }
}

impl FittedRegressor for FittedIv {
    fn predict(&self, x: &Mat<f64>) -> Col<f64> {
        linear_prediction(&self.result, x)
    }

    fn result(&self) -> &RegressionResult {
        &self.result
    }
}

/// Builder for [`TwoStageLeastSquares`].
#[derive(Debug, Clone)]
pub struct TwoStageLeastSquaresBuilder {
    with_intercept: bool,
    covariance: CovarianceType,
    confidence_level: f64,
    rank_tolerance: f64,
    endogenous: Vec<usize>,
}

impl Default for TwoStageLeastSquaresBuilder {
    fn default() -> Self {
        Self {
            with_intercept: true,
            covariance: CovarianceType::Unadjusted,
            confidence_level: 0.95,
            rank_tolerance: DEFAULT_RANK_TOLERANCE,
            endogenous: Vec::new(),
        }
    }
}

impl TwoStageLeastSquaresBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_intercept(mut self, include: bool) -> Self {
        self.with_intercept = include;
        self
    }

    pub fn covariance(mut self, covariance: CovarianceType) -> Self {
        self.covariance = covariance;
        self
    }

    pub fn confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    pub fn rank_tolerance(mut self, tolerance: f64) -> Self {
        self.rank_tolerance = tolerance;
        self
    }

    /// Feature columns of `x` that are endogenous. The fit fails with
    /// [`RegressionError::RankDeficient`] when one of them is collinear.
    pub fn endogenous(mut self, columns: &[usize]) -> Self {
        self.endogenous = columns.to_vec();
        self
    }

    pub fn build(self) -> TwoStageLeastSquares {
        TwoStageLeastSquares {
            with_intercept: self.with_intercept,
            covariance: self.covariance,
            confidence_level: self.confidence_level,
            rank_tolerance: self.rank_tolerance,
            endogenous: self.endogenous,
        }
    }
}
