//! Joint significance tests.

use faer::{Col, Mat};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};

use crate::solvers::{cholesky, cholesky_solve};

/// Wald test that a block of coefficients is jointly zero, in F form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaldTest {
    pub f_statistic: f64,
    pub df_num: usize,
    pub df_den: usize,
    pub p_value: f64,
}

impl WaldTest {
    fn undefined(df_num: usize, df_den: usize) -> Self {
        Self {
            f_statistic: f64::NAN,
            df_num,
            df_den,
            p_value: f64::NAN,
        }
    }
}

/// F = β' V⁻¹ β / k with an F(k, df_den) reference distribution.
///
/// Returns NaN statistics when the block is empty or its covariance is not
/// positive definite.
pub fn wald_test(beta: &Col<f64>, vcov: &Mat<f64>, df_den: usize) -> WaldTest {
    let k = beta.nrows();
    if k == 0 || df_den == 0 {
        return WaldTest::undefined(k, df_den);
    }
    let Ok(l) = cholesky(vcov) else {
        return WaldTest::undefined(k, df_den);
    };
    let v_inv_beta = cholesky_solve(&l, beta);
    let quad: f64 = (0..k).map(|i| beta[i] * v_inv_beta[i]).sum();
    let f = quad / k as f64;

    let p_value = FisherSnedecor::new(k as f64, df_den as f64)
        .ok()
        .map_or(f64::NAN, |d| 1.0 - d.cdf(f));

    WaldTest {
        f_statistic: f,
        df_num: k,
        df_den,
        p_value,
    }
}

/// Upper-tail probability of a chi-squared statistic.
pub fn chi_squared_pvalue(statistic: f64, df: usize) -> f64 {
    if df == 0 || !statistic.is_finite() {
        return f64::NAN;
    }
    ChiSquared::new(df as f64)
        .ok()
        .map_or(f64::NAN, |d| 1.0 - d.cdf(statistic.max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_coefficient_is_t_squared() {
        let beta = Col::from_fn(1, |_| 2.0);
        let vcov = Mat::from_fn(1, 1, |_, _| 0.25);
        let w = wald_test(&beta, &vcov, 20);
        assert_relative_eq!(w.f_statistic, 16.0);
        assert!(w.p_value < 0.001);
    }

    #[test]
    fn test_empty_block() {
        let w = wald_test(&Col::zeros(0), &Mat::zeros(0, 0), 10);
        assert!(w.f_statistic.is_nan());
    }

    #[test]
    fn test_chi_squared_tail() {
        assert_relative_eq!(chi_squared_pvalue(3.841459, 1), 0.05, epsilon = 1e-5);
        assert!(chi_squared_pvalue(1.0, 0).is_nan());
    }
}
