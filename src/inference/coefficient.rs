//! Per-coefficient test statistics, p-values and confidence intervals.

use faer::Col;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Reference distribution for coefficient tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceDistribution {
    /// Student's t with the given residual degrees of freedom.
    StudentT(f64),
    /// Standard normal (likelihood-based models).
    Normal,
}

impl ReferenceDistribution {
    /// Column label for the test statistic.
    pub fn statistic_label(&self) -> &'static str {
        match self {
            Self::StudentT(_) => "t",
            Self::Normal => "z",
        }
    }

    /// Two-sided p-value of a statistic.
    pub fn two_sided_p(&self, stat: f64) -> f64 {
        if !stat.is_finite() {
            return f64::NAN;
        }
        match self {
            Self::StudentT(df) => StudentsT::new(0.0, 1.0, *df)
                .ok()
                .map_or(f64::NAN, |d| 2.0 * (1.0 - d.cdf(stat.abs()))),
            Self::Normal => Normal::new(0.0, 1.0)
                .ok()
                .map_or(f64::NAN, |d| 2.0 * (1.0 - d.cdf(stat.abs()))),
        }
    }

    /// Two-sided critical value at `confidence_level`.
    pub fn critical_value(&self, confidence_level: f64) -> f64 {
        let q = 1.0 - (1.0 - confidence_level) / 2.0;
        match self {
            Self::StudentT(df) => StudentsT::new(0.0, 1.0, *df)
                .ok()
                .map_or(f64::NAN, |d| d.inverse_cdf(q)),
            Self::Normal => Normal::new(0.0, 1.0)
                .ok()
                .map_or(f64::NAN, |d| d.inverse_cdf(q)),
        }
    }
}

/// Utilities for coefficient-level inference.
pub struct CoefficientInference;

impl CoefficientInference {
    /// Standard errors from the diagonal of a covariance matrix.
    ///
    /// Negative variances (numerical noise) become NaN.
    pub fn standard_errors(vcov: &faer::Mat<f64>) -> Col<f64> {
        Col::from_fn(vcov.nrows(), |i| {
            let v = vcov[(i, i)];
            if v >= 0.0 {
                v.sqrt()
            } else {
                f64::NAN
            }
        })
    }

    /// Ratio of estimate to standard error; NaN when the error is zero or missing.
    pub fn t_statistics(coefficients: &Col<f64>, std_errors: &Col<f64>) -> Col<f64> {
        Col::from_fn(coefficients.nrows(), |i| {
            let se = std_errors[i];
            if se > 0.0 && se.is_finite() {
                coefficients[i] / se
            } else {
                f64::NAN
            }
        })
    }

    pub fn p_values(statistics: &Col<f64>, distribution: ReferenceDistribution) -> Col<f64> {
        Col::from_fn(statistics.nrows(), |i| distribution.two_sided_p(statistics[i]))
    }

    pub fn confidence_intervals(
        coefficients: &Col<f64>,
        std_errors: &Col<f64>,
        distribution: ReferenceDistribution,
        confidence_level: f64,
    ) -> (Col<f64>, Col<f64>) {
        let crit = distribution.critical_value(confidence_level);
        let n = coefficients.nrows();
        let lower = Col::from_fn(n, |i| coefficients[i] - crit * std_errors[i]);
        let upper = Col::from_fn(n, |i| coefficients[i] + crit * std_errors[i]);
        (lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_reference() {
        let d = ReferenceDistribution::Normal;
        assert_relative_eq!(d.critical_value(0.95), 1.959964, epsilon = 1e-5);
        assert_relative_eq!(d.two_sided_p(1.959964), 0.05, epsilon = 1e-5);
        assert_eq!(d.statistic_label(), "z");
    }

    #[test]
    fn test_t_reference_is_wider() {
        let t = ReferenceDistribution::StudentT(5.0);
        assert_relative_eq!(t.critical_value(0.95), 2.570582, epsilon = 1e-5);
        assert!(t.two_sided_p(2.0) > ReferenceDistribution::Normal.two_sided_p(2.0));
    }

    #[test]
    fn test_zero_standard_error_gives_nan() {
        let coef = Col::from_fn(2, |i| [1.0, 2.0][i]);
        let se = Col::from_fn(2, |i| [0.5, 0.0][i]);
        let t = CoefficientInference::t_statistics(&coef, &se);
        assert_relative_eq!(t[0], 2.0);
        assert!(t[1].is_nan());
        let p = CoefficientInference::p_values(&t, ReferenceDistribution::Normal);
        assert!(p[1].is_nan());
    }
}
