//! Regression diagnostics.
//!
//! - **Condition number**: conditioning of the design matrix; an SVD that
//!   fails to converge is surfaced as an estimation failure
//! - **Separation**: predictors that split a binary outcome perfectly
//! - **Leverage**: hat-matrix diagonal used by the HC2/HC3 covariance

mod condition_number;
mod leverage;
mod quasi_separation;

pub use condition_number::{
    condition_diagnostic, condition_number, ConditionDiagnostic, LARGE_CONDITION_NUMBER,
    SMALL_EIGENVALUE,
};
pub use leverage::compute_leverage;
pub use quasi_separation::{check_binary_separation, SeparationCheck, SeparationType};
