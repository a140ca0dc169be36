//! Conditioning of a design matrix.
//!
//! κ(X) = σ_max / σ_min from the singular values of the design, intercept
//! column included. Model summaries report κ as "Cond. No." and attach a note
//! when the design is close to singular.

use faer::Mat;

use crate::solvers::{with_intercept_column, RegressionError};

/// κ above which the summary warns about multicollinearity.
pub const LARGE_CONDITION_NUMBER: f64 = 1000.0;

/// Smallest eigenvalue of X'X below which the design counts as singular.
pub const SMALL_EIGENVALUE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionDiagnostic {
    /// `f64::INFINITY` when the smallest singular value is numerically zero.
    pub condition_number: f64,
    /// Singular values of the design, descending.
    pub singular_values: Vec<f64>,
    /// σ_min², the smallest eigenvalue of X'X.
    pub smallest_eigenvalue: f64,
    /// Summary note, when the design is badly conditioned.
    pub warning: Option<String>,
}

impl ConditionDiagnostic {
    pub fn is_singular(&self) -> bool {
        self.smallest_eigenvalue < SMALL_EIGENVALUE || self.condition_number.is_infinite()
    }

    pub fn is_large(&self) -> bool {
        self.condition_number > LARGE_CONDITION_NUMBER
    }
}

/// κ(X) alone.
pub fn condition_number(x: &Mat<f64>, with_intercept: bool) -> Result<f64, RegressionError> {
    Ok(condition_diagnostic(x, with_intercept)?.condition_number)
}

/// Singular values, κ and the summary note for a design.
///
/// Non-finite cells or an SVD that does not converge are reported as
/// [`RegressionError::DecompositionFailed`].
pub fn condition_diagnostic(
    x: &Mat<f64>,
    with_intercept: bool,
) -> Result<ConditionDiagnostic, RegressionError> {
    let design = with_intercept_column(x, with_intercept);
    if design.nrows() == 0 || design.ncols() == 0 {
        return Ok(ConditionDiagnostic {
            condition_number: f64::INFINITY,
            singular_values: vec![],
            smallest_eigenvalue: 0.0,
            warning: Some("The design matrix is empty.".to_string()),
        });
    }
    let finite =
        (0..design.ncols()).all(|j| (0..design.nrows()).all(|i| design[(i, j)].is_finite()));
    if !finite {
        return Err(RegressionError::DecompositionFailed(
            "design matrix contains non-finite values".to_string(),
        ));
    }

    let svd = design
        .svd()
        .map_err(|e| RegressionError::DecompositionFailed(format!("SVD did not converge: {e:?}")))?;
    let s = svd.S().column_vector();
    let mut singular_values: Vec<f64> = (0..s.nrows()).map(|i| s[i]).collect();
    singular_values.sort_by(|a, b| b.total_cmp(a));
    // a wide design has fewer singular values than columns
    if design.nrows() < design.ncols() {
        singular_values.resize(design.ncols(), 0.0);
    }

    let s_max = singular_values[0];
    let s_min = singular_values[singular_values.len() - 1];
    let floor = s_max * f64::EPSILON * design.nrows().max(design.ncols()) as f64;
    let condition_number = if s_min > floor { s_max / s_min } else { f64::INFINITY };
    let smallest_eigenvalue = s_min * s_min;

    let mut diagnostic = ConditionDiagnostic {
        condition_number,
        singular_values,
        smallest_eigenvalue,
        warning: None,
    };
    diagnostic.warning = if diagnostic.is_singular() {
        Some(format!(
            "The smallest eigenvalue is {smallest_eigenvalue:.3e}. This might indicate strong \
             multicollinearity or a singular design matrix."
        ))
    } else if diagnostic.is_large() {
        Some(format!(
            "The condition number is large, {condition_number:.3e}. This might indicate strong \
             multicollinearity or other numerical problems."
        ))
    } else {
        None
    };
    Ok(diagnostic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_columns_are_well_conditioned() {
        let x = Mat::from_fn(100, 2, |i, j| if j == 0 { i as f64 } else { 100.0 - i as f64 });
        let diag = condition_diagnostic(&x, false).unwrap();
        assert!(diag.condition_number < 10.0, "{}", diag.condition_number);
        assert!(diag.warning.is_none());
        assert_eq!(diag.singular_values.len(), 2);
    }

    #[test]
    fn test_near_duplicate_column_is_large() {
        let x = Mat::from_fn(100, 2, |i, j| i as f64 + if j == 1 { 0.001 } else { 0.0 });
        let diag = condition_diagnostic(&x, false).unwrap();
        assert!(diag.is_large());
        assert!(diag.warning.is_some());
    }

    #[test]
    fn test_dummy_trap_is_singular() {
        // two indicators summing to the intercept
        let x = Mat::from_fn(10, 2, |i, j| if (i % 2 == 0) == (j == 0) { 1.0 } else { 0.0 });
        let diag = condition_diagnostic(&x, true).unwrap();
        assert!(diag.is_singular());
        assert!(diag.condition_number.is_infinite());
        assert!(diag.warning.unwrap().starts_with("The smallest eigenvalue"));
    }

    #[test]
    fn test_intercept_is_part_of_the_design() {
        let x = Mat::from_fn(20, 1, |i, _| (i % 5) as f64);
        let with = condition_diagnostic(&x, true).unwrap();
        let without = condition_diagnostic(&x, false).unwrap();
        assert_eq!(with.singular_values.len(), 2);
        assert_eq!(without.condition_number, 1.0);
        assert!(with.condition_number > 1.0);
    }

    #[test]
    fn test_non_finite_input_is_decomposition_failure() {
        let x = Mat::from_fn(3, 1, |i, _| if i == 1 { f64::NAN } else { 1.0 });
        assert!(matches!(
            condition_diagnostic(&x, false),
            Err(RegressionError::DecompositionFailed(_))
        ));
    }
}
