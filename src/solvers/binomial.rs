//! Probit and logit regression by Newton–Raphson.

use faer::{Col, Mat};
use log::{debug, warn};

use super::least_squares::{
    cholesky, cholesky_solve, cross_product, detect_aliased, invert_spd, mat_vec,
    with_intercept_column, DEFAULT_RANK_TOLERANCE,
};
use super::traits::{linear_prediction, FittedRegressor, RegressionError, Regressor};
use crate::core::{BinomialLink, RegressionResult};
use crate::diagnostics::{check_binary_separation, SeparationCheck, SeparationType};
use crate::inference::{chi_squared_pvalue, CoefficientInference, ReferenceDistribution};

/// Fitted probabilities this close to the outcome everywhere mean separation.
const SEPARATION_TOLERANCE: f64 = 1e-8;

/// Maximum-likelihood binary-outcome regression.
///
/// The outcome is expected to be coded 0/1. Values strictly between 0 and 1
/// are accepted and treated as fractional responses.
///
/// # Example
///
/// ```rust,ignore
/// use anofox_econometrics::core::BinomialLink;
/// use anofox_econometrics::solvers::{BinomialRegressor, FittedRegressor, Regressor};
///
/// let fitted = BinomialRegressor::builder()
///     .link(BinomialLink::Probit)
///     .build()
///     .fit(&x, &y)?;
/// println!("pseudo R² = {}", fitted.pseudo_r_squared);
/// ```
#[derive(Debug, Clone)]
pub struct BinomialRegressor {
    link: BinomialLink,
    with_intercept: bool,
    max_iterations: usize,
    tolerance: f64,
    rank_tolerance: f64,
    confidence_level: f64,
}

impl Default for BinomialRegressor {
    fn default() -> Self {
        BinomialRegressorBuilder::default().build()
    }
}

impl BinomialRegressor {
    pub fn builder() -> BinomialRegressorBuilder {
        BinomialRegressorBuilder::default()
    }

    pub fn logit() -> Self {
        Self::builder().link(BinomialLink::Logit).build()
    }

    pub fn probit() -> Self {
        Self::builder().link(BinomialLink::Probit).build()
    }

    /// Score vector and observed information at `beta`.
    fn newton_system(
        &self,
        design: &Mat<f64>,
        y: &Col<f64>,
        eta: &Col<f64>,
    ) -> (Col<f64>, Mat<f64>) {
        let (n, p) = (design.nrows(), design.ncols());
        let mut grad = Col::zeros(p);
        let mut hess = Mat::zeros(p, p);
        for i in 0..n {
            let t = self.link.newton_terms(y[i], eta[i]);
            for r in 0..p {
                let xr = design[(i, r)];
                grad[r] += t.score * xr;
                for c in 0..=r {
                    hess[(r, c)] += t.weight * xr * design[(i, c)];
                }
            }
        }
        for r in 0..p {
            for c in (r + 1)..p {
                hess[(r, c)] = hess[(c, r)];
            }
        }
        (grad, hess)
    }

    fn log_likelihood(&self, y: &Col<f64>, eta: &Col<f64>) -> f64 {
        (0..y.nrows()).map(|i| self.link.log_likelihood(y[i], eta[i])).sum()
    }

    fn check_outcome(&self, y: &Col<f64>) -> Result<(), RegressionError> {
        if let Some(bad) = y.iter().find(|v| !v.is_finite()) {
            return Err(RegressionError::NumericalError(format!("non-finite outcome {bad}")));
        }
        if let Some(&bad) = y.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(RegressionError::OutcomeOutOfRange { value: bad });
        }
        let first = y[0];
        if y.iter().all(|&v| v == first) {
            return Err(RegressionError::PerfectSeparation {
                detail: format!("the outcome takes the single value {first}"),
            });
        }
        Ok(())
    }
}

impl Regressor for BinomialRegressor {
    type Fitted = FittedBinomial;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        if x.nrows() != y.nrows() {
            return Err(RegressionError::DimensionMismatch {
                x_rows: x.nrows(),
                y_len: y.nrows(),
            });
        }
        let n = x.nrows();
        let n_features = x.ncols();
        let offset = usize::from(self.with_intercept);
        let p = n_features + offset;
        if n <= p {
            return Err(RegressionError::InsufficientObservations { needed: p + 1, got: n });
        }
        self.check_outcome(y)?;

        let design = with_intercept_column(x, self.with_intercept);
        let aliased = detect_aliased(&cross_product(&design), self.rank_tolerance);
        if aliased.iter().any(|&a| a) {
            let columns = aliased
                .iter()
                .enumerate()
                .filter_map(|(j, &a)| (a && j >= offset).then(|| j - offset))
                .collect();
            return Err(RegressionError::RankDeficient { columns });
        }

        // proportions cannot be separated; only screen 0/1 outcomes
        let binary = y.iter().all(|&v| v == 0.0 || v == 1.0);
        let separation = if binary {
            check_binary_separation(x, y)
        } else {
            SeparationCheck::default()
        };
        let complete = separation.complete();
        if !complete.is_empty() {
            return Err(RegressionError::PerfectSeparation {
                detail: format!("features {complete:?} separate the outcome classes"),
            });
        }
        if let Some(msg) = &separation.warning_message {
            warn!("{msg}");
        }

        let mut beta = Col::zeros(p);
        let mut converged = false;
        let mut iterations = 0;
        for iter in 1..=self.max_iterations {
            iterations = iter;
            let eta = mat_vec(&design, &beta);
            let (grad, hess) = self.newton_system(&design, y, &eta);
            let l = cholesky(&hess).map_err(|_| RegressionError::PerfectSeparation {
                detail: "the information matrix became singular".to_string(),
            })?;
            let step = cholesky_solve(&l, &grad);
            let max_step = step.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
            for j in 0..p {
                beta[j] += step[j];
            }
            if !max_step.is_finite() {
                return Err(RegressionError::NumericalError(
                    "Newton step is not finite".to_string(),
                ));
            }

            let eta = mat_vec(&design, &beta);
            let reproduced = (0..n)
                .all(|i| (self.link.probability(eta[i]) - y[i]).abs() <= SEPARATION_TOLERANCE);
            if reproduced {
                return Err(RegressionError::PerfectSeparation {
                    detail: "fitted probabilities reproduce the outcome exactly".to_string(),
                });
            }
            if max_step <= self.tolerance {
                converged = true;
                break;
            }
        }
        if !converged {
            warn!(
                "{} did not converge in {} iterations",
                self.link.name(),
                self.max_iterations
            );
        }

        let eta = mat_vec(&design, &beta);
        let (_, hess) = self.newton_system(&design, y, &eta);
        let vcov = invert_spd(&hess)?;
        let se = CoefficientInference::standard_errors(&vcov);

        let log_likelihood = self.log_likelihood(y, &eta);
        let y_bar = y.iter().sum::<f64>() / n as f64;
        let p0 = if self.with_intercept { y_bar } else { 0.5 };
        let null_log_likelihood: f64 = y
            .iter()
            .map(|&yi| {
                let mut ll = 0.0;
                if yi > 0.0 {
                    ll += yi * p0.ln();
                }
                if yi < 1.0 {
                    ll += (1.0 - yi) * (1.0 - p0).ln();
                }
                ll
            })
            .sum();
        let pseudo_r_squared = 1.0 - log_likelihood / null_log_likelihood;
        let lr_statistic = 2.0 * (log_likelihood - null_log_likelihood);
        let lr_pvalue = chi_squared_pvalue(lr_statistic, n_features);

        let probabilities = Col::from_fn(n, |i| self.link.probability(eta[i]));
        let mut result = RegressionResult::empty(n_features, n);
        result.set_parameters(&beta, self.with_intercept);
        result.n_parameters = p;
        result.set_inference(&se, ReferenceDistribution::Normal, self.confidence_level);
        result.r_squared = pseudo_r_squared;
        result.log_likelihood = log_likelihood;
        result.aic = -2.0 * log_likelihood + 2.0 * p as f64;
        result.bic = -2.0 * log_likelihood + p as f64 * (n as f64).ln();
        result.residuals = Col::from_fn(n, |i| y[i] - probabilities[i]);
        result.fitted_values = probabilities;

        debug!(
            "{} fit: n={}, iterations={}, log-likelihood={:.6}",
            self.link.name(),
            n,
            iterations,
            log_likelihood
        );

        Ok(FittedBinomial {
            result,
            link: self.link,
            iterations,
            converged,
            deviance: -2.0 * log_likelihood,
            null_deviance: -2.0 * null_log_likelihood,
            log_likelihood,
            null_log_likelihood,
            pseudo_r_squared,
            lr_statistic,
            lr_pvalue,
            separation,
            vcov,
        })
    }
}

/// A fitted probit or logit model.
#[derive(Debug, Clone)]
pub struct FittedBinomial {
    result: RegressionResult,
    pub link: BinomialLink,
    pub iterations: usize,
    pub converged: bool,
    pub deviance: f64,
    pub null_deviance: f64,
    pub log_likelihood: f64,
    pub null_log_likelihood: f64,
    /// McFadden's 1 - LL / LL₀.
    pub pseudo_r_squared: f64,
    /// Likelihood-ratio statistic against the intercept-only model.
    pub lr_statistic: f64,
    pub lr_pvalue: f64,
    pub separation: SeparationCheck,
    /// Inverse observed information, intercept first.
    pub vcov: Mat<f64>,
}

impl FittedBinomial {
    /// Linear predictor `intercept + xβ`.
    pub fn predict_linear(&self, x: &Mat<f64>) -> Col<f64> {
        linear_prediction(&self.result, x)
    }

    /// Predictors flagged as quasi-separating or monotonic.
    pub fn separation_warnings(&self) -> Vec<usize> {
        self.separation
            .separation_types
            .iter()
            .enumerate()
            .filter_map(|(j, t)| (*t != SeparationType::None).then_some(j))
            .collect()
    }
}

impl FittedRegressor for FittedBinomial {
    /// Success probabilities.
    fn predict(&self, x: &Mat<f64>) -> Col<f64> {
        let eta = self.predict_linear(x);
        Col::from_fn(eta.nrows(), |i| self.link.probability(eta[i]))
    }

    fn result(&self) -> &RegressionResult {
        &self.result
    }
}

/// Builder for [`BinomialRegressor`].
#[derive(Debug, Clone)]
pub struct BinomialRegressorBuilder {
    link: BinomialLink,
    with_intercept: bool,
    max_iterations: usize,
    tolerance: f64,
    rank_tolerance: f64,
    confidence_level: f64,
}

impl Default for BinomialRegressorBuilder {
    fn default() -> Self {
        Self {
            link: BinomialLink::Logit,
            with_intercept: true,
            max_iterations: 35,
            tolerance: 1e-8,
            rank_tolerance: DEFAULT_RANK_TOLERANCE,
            confidence_level: 0.95,
        }
    }
}

impl BinomialRegressorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(mut self, link: BinomialLink) -> Self {
        self.link = link;
        self
    }

    pub fn with_intercept(mut self, include: bool) -> Self {
        self.with_intercept = include;
        self
    }

    /// Newton iteration cap. Default 35.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Convergence threshold on the largest coefficient step. Default 1e-8.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn rank_tolerance(mut self, tolerance: f64) -> Self {
        self.rank_tolerance = tolerance;
        self
    }

    pub fn confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    pub fn build(self) -> BinomialRegressor {
        BinomialRegressor {
            link: self.link,
            with_intercept: self.with_intercept,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            rank_tolerance: self.rank_tolerance,
            confidence_level: self.confidence_level,
        }
    }
}
