//! Estimator traits and the estimation error type.

use faer::{Col, Mat};
use thiserror::Error;

use crate::core::RegressionResult;

/// Errors raised while fitting a model.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegressionError {
    #[error("dimension mismatch: x has {x_rows} rows but y has {y_len} elements")]
    DimensionMismatch { x_rows: usize, y_len: usize },

    #[error("insufficient observations: need at least {needed}, got {got}")]
    InsufficientObservations { needed: usize, got: usize },

    #[error("design matrix is rank deficient; collinear columns {columns:?}")]
    RankDeficient { columns: Vec<usize> },

    #[error("matrix is singular")]
    SingularMatrix,

    #[error("underidentified: {instruments} independent instruments for {regressors} regressors")]
    Underidentified { instruments: usize, regressors: usize },

    #[error("regressors {columns:?} are fully absorbed by the fixed effects")]
    AbsorbedRegressors { columns: Vec<usize> },

    #[error("binary outcome must lie in [0, 1], found {value}")]
    OutcomeOutOfRange { value: f64 },

    #[error("perfect separation detected: {detail}")]
    PerfectSeparation { detail: String },

    #[error("matrix decomposition failed: {0}")]
    DecompositionFailed(String),

    #[error("numerical error: {0}")]
    NumericalError(String),
}

/// An unfitted estimator over a plain feature matrix.
pub trait Regressor {
    type Fitted: FittedRegressor;

    /// Fit the model. `x` excludes the intercept column.
    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError>;
}

/// A fitted model.
pub trait FittedRegressor {
    /// Predict the response for new rows laid out like the training features.
    fn predict(&self, x: &Mat<f64>) -> Col<f64>;

    fn result(&self) -> &RegressionResult;

    fn coefficients(&self) -> &Col<f64> {
        &self.result().coefficients
    }

    fn intercept(&self) -> Option<f64> {
        self.result().intercept
    }
}

/// Linear prediction `intercept + x β`, skipping aliased coefficients.
pub(crate) fn linear_prediction(result: &RegressionResult, x: &Mat<f64>) -> Col<f64> {
    let intercept = result.intercept.unwrap_or(0.0);
    Col::from_fn(x.nrows(), |i| {
        let mut pred = intercept;
        for j in 0..x.ncols().min(result.coefficients.nrows()) {
            if !result.aliased[j] {
                pred += x[(i, j)] * result.coefficients[j];
            }
        }
        pred
    })
}
