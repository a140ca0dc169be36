//! Separation detection for binary-outcome models.
//!
//! Separation occurs when a predictor (or combination of predictors) perfectly
//! or nearly perfectly separates the response categories. This causes coefficient
//! estimates to diverge to infinity.
//!
//! - **Complete separation**: a threshold on the predictor puts every y=0 on
//!   one side and every y=1 on the other.
//! - **Quasi-separation**: the classes overlap only in one or two observations.
//! - **Monotonic response**: a discrete predictor where every level is
//!   all-zero or all-one.
//!
//! Only single predictors are screened here. Separation by a combination of
//! predictors shows up during Newton iterations as fitted probabilities that
//! reproduce the outcome exactly.
//!
//! # References
//!
//! - Albert, A. and Anderson, J.A. (1984). On the Existence of Maximum Likelihood
//!   Estimates in Logistic Regression Models.
//! - Heinze, G. and Schemper, M. (2002). A solution to the problem of separation
//!   in logistic regression.

use faer::{Col, Mat};

/// Result of separation screening.
#[derive(Debug, Clone, Default)]
pub struct SeparationCheck {
    /// True if separation was detected.
    pub has_separation: bool,
    /// Indices of predictors involved in separation (0-based, excludes intercept).
    pub separated_predictors: Vec<usize>,
    /// Separation type per predictor, aligned with the columns of `x`.
    pub separation_types: Vec<SeparationType>,
    /// Warning message for the user.
    pub warning_message: Option<String>,
}

impl SeparationCheck {
    /// Predictors that separate the classes completely.
    pub fn complete(&self) -> Vec<usize> {
        self.separation_types
            .iter()
            .enumerate()
            .filter_map(|(j, t)| (*t == SeparationType::Complete).then_some(j))
            .collect()
    }
}

/// Type of separation detected for a predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparationType {
    /// No separation detected.
    None,
    /// Complete separation: predictor perfectly divides the classes.
    Complete,
    /// Quasi-separation: predictor nearly perfectly divides the classes.
    Quasi,
    /// All responses in one class for each predictor level.
    MonotonicResponse,
}

/// Screen every predictor of a binary response for separation.
///
/// # Arguments
///
/// * `x` - Design matrix (n_samples x n_features), excluding intercept
/// * `y` - Binary response vector (values in {0, 1})
pub fn check_binary_separation(x: &Mat<f64>, y: &Col<f64>) -> SeparationCheck {
    let n_samples = x.nrows();
    let n_features = x.ncols();

    if n_samples == 0 || n_features == 0 {
        return SeparationCheck::default();
    }

    let mut result = SeparationCheck::default();
    let mut warnings = Vec::new();

    let y_vec: Vec<f64> = (0..n_samples).map(|i| y[i]).collect();

    for j in 0..n_features {
        let x_col: Vec<f64> = (0..n_samples).map(|i| x[(i, j)]).collect();
        let sep_type = check_predictor_separation(&x_col, &y_vec);

        result.separation_types.push(sep_type);

        let msg = match sep_type {
            SeparationType::None => continue,
            SeparationType::Complete => format!("feature {} shows complete separation", j),
            SeparationType::Quasi => format!("feature {} shows quasi-separation", j),
            SeparationType::MonotonicResponse => {
                format!("feature {} has all responses in one class for every value", j)
            }
        };
        result.has_separation = true;
        result.separated_predictors.push(j);
        warnings.push(msg);
    }

    if !warnings.is_empty() {
        result.warning_message = Some(format!(
            "Separation detected: {}. Coefficients may be unstable.",
            warnings.join("; ")
        ));
    }

    result
}

/// Check a single predictor for separation patterns.
fn check_predictor_separation(x: &[f64], y: &[f64]) -> SeparationType {
    let n = x.len();
    if n == 0 {
        return SeparationType::None;
    }

    let total_1s = y.iter().filter(|&&yi| yi >= 0.5).count();
    let total_0s = n - total_1s;
    if total_1s == 0 || total_0s == 0 {
        // single-class outcome is not a property of the predictor
        return SeparationType::None;
    }

    let (x_min, x_max) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if (x_max - x_min).abs() <= 1e-10 * x_max.abs().max(1.0) {
        // constant columns cannot separate
        return SeparationType::None;
    }

    let class_range = |class_one: bool| {
        x.iter()
            .zip(y)
            .filter(|(_, &yi)| (yi >= 0.5) == class_one)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (&v, _)| {
                (lo.min(v), hi.max(v))
            })
    };
    let (min0, max0) = class_range(false);
    let (min1, max1) = class_range(true);

    if max0 < min1 || max1 < min0 {
        return SeparationType::Complete;
    }

    // Overlap region: observations lying inside both class ranges.
    let lo = min0.max(min1);
    let hi = max0.min(max1);
    let overlap = x.iter().filter(|&&v| v >= lo && v <= hi).count();
    if overlap <= 2 && (overlap as f64) / (n as f64) < 0.1 {
        return SeparationType::Quasi;
    }

    // Discrete predictors: every level pure, with at least one repeated level.
    let mut pairs: Vec<(f64, bool)> = x.iter().zip(y).map(|(&xi, &yi)| (xi, yi >= 0.5)).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut all_pure = true;
    let mut repeated = false;
    let mut start = 0;
    while start < pairs.len() {
        let mut end = start + 1;
        while end < pairs.len() && (pairs[end].0 - pairs[start].0).abs() <= 1e-10 {
            end += 1;
        }
        let group = &pairs[start..end];
        if group.len() > 1 {
            repeated = true;
        }
        if group.iter().any(|p| p.1) && group.iter().any(|p| !p.1) {
            all_pure = false;
            break;
        }
        start = end;
    }
    if all_pure && repeated {
        return SeparationType::MonotonicResponse;
    }

    SeparationType::None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_separation() {
        // all 0s for x < 5, all 1s for x >= 5
        let x = Mat::from_fn(10, 1, |i, _| i as f64);
        let y = Col::from_fn(10, |i| if i < 5 { 0.0 } else { 1.0 });

        let result = check_binary_separation(&x, &y);
        assert!(result.has_separation);
        assert!(result.separated_predictors.contains(&0));
        assert_eq!(result.separation_types[0], SeparationType::Complete);
        assert_eq!(result.complete(), vec![0]);
    }

    #[test]
    fn test_reverse_separation_with_ties() {
        // 1s on the low side, tied values inside each class
        let xs = [1.0, 1.0, 2.0, 5.0, 5.0, 6.0];
        let ys = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let x = Mat::from_fn(6, 1, |i, _| xs[i]);
        let y = Col::from_fn(6, |i| ys[i]);
        assert_eq!(
            check_binary_separation(&x, &y).separation_types[0],
            SeparationType::Complete
        );
    }

    #[test]
    fn test_no_separation() {
        let x = Mat::from_fn(10, 1, |i, _| i as f64);
        let y_vals = [0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let y = Col::from_fn(10, |i| y_vals[i]);

        let result = check_binary_separation(&x, &y);
        assert!(!result.has_separation);
        assert!(result.warning_message.is_none());
    }

    #[test]
    fn test_constant_column_is_not_separating() {
        let x = Mat::from_fn(6, 1, |_, _| 3.0);
        let y = Col::from_fn(6, |i| (i % 2) as f64);
        assert_eq!(
            check_binary_separation(&x, &y).separation_types[0],
            SeparationType::None
        );
    }

    #[test]
    fn test_quasi_separation() {
        // classes touch at a single shared value
        let xs: Vec<f64> = (0..30)
            .map(|i| if i < 15 { i as f64 } else { (i - 1) as f64 })
            .collect();
        let x = Mat::from_fn(30, 1, |i, _| xs[i]);
        let y = Col::from_fn(30, |i| if i < 15 { 0.0 } else { 1.0 });
        assert_eq!(
            check_binary_separation(&x, &y).separation_types[0],
            SeparationType::Quasi
        );
    }
}
