//! Statistical inference (standard errors, p-values, confidence intervals).

mod coefficient;
mod robust_covariance;
mod tests_of_fit;

pub use coefficient::{CoefficientInference, ReferenceDistribution};
pub use robust_covariance::{coefficient_covariance, sandwich, CovarianceType, HcType};
pub use tests_of_fit::{chi_squared_pvalue, wald_test, WaldTest};
