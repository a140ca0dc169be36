//! Econometric analyses over CSV datasets.
//!
//! The crate covers the estimators behind a small analysis service:
//! linear regression with absorbed effects, one- and two-way fixed-effects
//! panel regression, probit and logit, and two-stage least squares, plus
//! descriptive statistics and correlation matrices. Each analysis reads a
//! CSV file, applies an optional row filter, expands categorical columns into
//! indicators and writes its results as CSV (and HTML for model summaries).
//!
//! # Example
//!
//! ```rust,ignore
//! use anofox_econometrics::prelude::*;
//!
//! let request = AnalysisRequest::from_json(r#"{
//!     "analysis": "fixed_effects",
//!     "file_path": "panel.csv",
//!     "y_var": "wage",
//!     "x_var_list": ["hours"],
//!     "fix1": "firm",
//!     "fix2": "year"
//! }"#)?;
//! let outcome = run_analysis(request, Config::load(None)?);
//! println!("{}", serde_json::to_string_pretty(&outcome)?);
//! ```
//!
//! The estimators can also be used directly:
//!
//! ```rust,ignore
//! let fitted = PanelRegressor::builder()
//!     .time_effects(true)
//!     .covariance(CovarianceType::Hc1)
//!     .build()
//!     .fit(&x, &y, &PanelIndex::from_keys(&firms, &years)?)?;
//! println!("within R² = {}", fitted.result().r_squared);
//! ```

pub mod analysis;
pub mod config;
pub mod core;
pub mod data;
pub mod diagnostics;
pub mod inference;
pub mod report;
pub mod solvers;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::analysis::{
        run_analysis, AnalysisError, AnalysisOutcome, AnalysisRequest, AnalysisSession,
        FailureReason,
    };
    pub use crate::config::{Config, EstimationConfig, OutputConfig};
    pub use crate::core::{BinomialLink, NaInfo, RegressionResult};
    pub use crate::data::{expand_dummies, read_csv, Column, Dataset, DummyExpansion, Value};
    pub use crate::diagnostics::{
        check_binary_separation, condition_diagnostic, ConditionDiagnostic, SeparationCheck,
    };
    pub use crate::inference::CovarianceType;
    pub use crate::report::{ModelSummary, Table};
    pub use crate::solvers::{
        BinomialRegressor, FittedBinomial, FittedIv, FittedPanel, FittedRegressor, GroupIndex,
        PanelIndex, PanelRegressor, RegressionError, Regressor, TwoStageLeastSquares,
    };
}

pub use crate::analysis::{
    run_analysis, AnalysisOutcome, AnalysisRequest, AnalysisSession, FailureReason,
};
pub use crate::config::Config;
pub use crate::core::{BinomialLink, NaInfo, RegressionResult};
pub use crate::solvers::{
    BinomialRegressor, FittedBinomial, FittedIv, FittedPanel, FittedRegressor, PanelRegressor,
    RegressionError, Regressor, TwoStageLeastSquares,
};
