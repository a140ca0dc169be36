//! Common result structure for fitted models.

use faer::Col;

use crate::inference::{CoefficientInference, ReferenceDistribution};

/// Estimates and fit statistics shared by every estimator.
///
/// `coefficients` and the per-coefficient vectors are aligned with the
/// columns of the feature matrix passed to `fit` (no intercept). Columns
/// dropped as collinear or absorbed are flagged in `aliased` and carry NaN
/// everywhere. The intercept, when estimated, is reported separately.
#[derive(Debug, Clone)]
pub struct RegressionResult {
    pub coefficients: Col<f64>,
    pub intercept: Option<f64>,

    pub std_errors: Option<Col<f64>>,
    pub t_statistics: Option<Col<f64>>,
    pub p_values: Option<Col<f64>>,
    pub conf_interval_lower: Option<Col<f64>>,
    pub conf_interval_upper: Option<Col<f64>>,

    pub intercept_std_error: Option<f64>,
    pub intercept_t_statistic: Option<f64>,
    pub intercept_p_value: Option<f64>,
    pub intercept_conf_interval: Option<(f64, f64)>,

    /// Distribution behind the test statistics.
    pub distribution: ReferenceDistribution,
    pub confidence_level: f64,

    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub mse: f64,
    pub rmse: f64,
    pub f_statistic: f64,
    pub f_pvalue: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,

    pub n_observations: usize,
    /// Estimated parameters, intercept included, aliased columns excluded.
    pub n_parameters: usize,
    /// Degrees of freedom used up by absorbed effects.
    pub df_absorbed: usize,

    pub residuals: Col<f64>,
    pub fitted_values: Col<f64>,
    pub aliased: Vec<bool>,
}

impl RegressionResult {
    /// A result with every statistic unset.
    pub fn empty(n_features: usize, n_observations: usize) -> Self {
        Self {
            coefficients: Col::from_fn(n_features, |_| f64::NAN),
            intercept: None,
            std_errors: None,
            t_statistics: None,
            p_values: None,
            conf_interval_lower: None,
            conf_interval_upper: None,
            intercept_std_error: None,
            intercept_t_statistic: None,
            intercept_p_value: None,
            intercept_conf_interval: None,
            distribution: ReferenceDistribution::Normal,
            confidence_level: 0.95,
            r_squared: f64::NAN,
            adj_r_squared: f64::NAN,
            mse: f64::NAN,
            rmse: f64::NAN,
            f_statistic: f64::NAN,
            f_pvalue: f64::NAN,
            log_likelihood: f64::NAN,
            aic: f64::NAN,
            bic: f64::NAN,
            n_observations,
            n_parameters: 0,
            df_absorbed: 0,
            residuals: Col::zeros(n_observations),
            fitted_values: Col::zeros(n_observations),
            aliased: vec![false; n_features],
        }
    }

    /// Residual degrees of freedom.
    pub fn residual_df(&self) -> usize {
        self.n_observations
            .saturating_sub(self.n_parameters)
            .saturating_sub(self.df_absorbed)
    }

    /// Indices of the feature columns that were dropped.
    pub fn aliased_columns(&self) -> Vec<usize> {
        self.aliased
            .iter()
            .enumerate()
            .filter_map(|(j, &a)| a.then_some(j))
            .collect()
    }

    /// Store a full parameter vector laid out as `[intercept?, features...]`.
    pub(crate) fn set_parameters(&mut self, params: &Col<f64>, with_intercept: bool) {
        let offset = usize::from(with_intercept);
        self.intercept = with_intercept.then(|| params[0]);
        self.coefficients = Col::from_fn(params.nrows() - offset, |j| params[j + offset]);
    }

    /// Derive test statistics, p-values and intervals from standard errors
    /// laid out like the parameter vector given to [`Self::set_parameters`].
    pub(crate) fn set_inference(
        &mut self,
        std_errors: &Col<f64>,
        distribution: ReferenceDistribution,
        confidence_level: f64,
    ) {
        let with_intercept = self.intercept.is_some();
        let offset = usize::from(with_intercept);
        let k = self.coefficients.nrows();

        let params = Col::from_fn(k + offset, |i| {
            if with_intercept && i == 0 {
                self.intercept.unwrap_or(f64::NAN)
            } else {
                self.coefficients[i - offset]
            }
        });
        let stats = CoefficientInference::t_statistics(&params, std_errors);
        let p = CoefficientInference::p_values(&stats, distribution);
        let (lo, hi) =
            CoefficientInference::confidence_intervals(
                &params,
                std_errors,
                distribution,
                confidence_level,
            );

        let tail = |v: &Col<f64>| Col::from_fn(k, |j| v[j + offset]);
        self.std_errors = Some(tail(std_errors));
        self.t_statistics = Some(tail(&stats));
        self.p_values = Some(tail(&p));
        self.conf_interval_lower = Some(tail(&lo));
        self.conf_interval_upper = Some(tail(&hi));

        if with_intercept {
            self.intercept_std_error = Some(std_errors[0]);
            self.intercept_t_statistic = Some(stats[0]);
            self.intercept_p_value = Some(p[0]);
            self.intercept_conf_interval = Some((lo[0], hi[0]));
        }

        self.distribution = distribution;
        self.confidence_level = confidence_level;
    }

    /// Gaussian log-likelihood, AIC and BIC from the residual sum of squares.
    pub(crate) fn set_gaussian_information(&mut self, ssr: f64) {
        let n = self.n_observations as f64;
        let k = self.n_parameters as f64;
        self.log_likelihood = -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + (ssr / n).ln() + 1.0);
        self.aic = -2.0 * self.log_likelihood + 2.0 * k;
        self.bic = -2.0 * self.log_likelihood + k * n.ln();
    }
}
