//! Link functions for binary-outcome models.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Link between the linear predictor η and the success probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinomialLink {
    /// Logistic: p = 1 / (1 + exp(-η))
    #[default]
    Logit,
    /// Standard normal CDF: p = Φ(η)
    Probit,
}

/// Score and Hessian weight of one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonTerms {
    /// ∂ℓ/∂η
    pub score: f64,
    /// -∂²ℓ/∂η² (observed information)
    pub weight: f64,
}

impl BinomialLink {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Logit => "logit",
            Self::Probit => "probit",
        }
    }

    /// Success probability for a linear predictor.
    pub fn probability(&self, eta: f64) -> f64 {
        match self {
            Self::Logit => 1.0 / (1.0 + (-eta).exp()),
            Self::Probit => std_normal().map_or(f64::NAN, |n| n.cdf(eta)),
        }
    }

    /// Log-likelihood contribution of an outcome `y` (0 or 1).
    pub fn log_likelihood(&self, y: f64, eta: f64) -> f64 {
        match self {
            // ln p = -softplus(-η), ln(1-p) = -softplus(η)
            Self::Logit => -y * softplus(-eta) - (1.0 - y) * softplus(eta),
            Self::Probit => {
                let mut ll = 0.0;
                if y > 0.0 {
                    ll += y * log_normal_cdf(eta);
                }
                if y < 1.0 {
                    ll += (1.0 - y) * log_normal_cdf(-eta);
                }
                ll
            }
        }
    }

    /// Newton–Raphson terms for one observation.
    ///
    /// Probit uses the exact observed information. For a 0/1 outcome with
    /// q = 2y - 1 this is λ = q φ(qη) / Φ(qη), score = λ, weight = λ(λ + η);
    /// fractional outcomes mix the two branches with weights y and 1 - y.
    pub fn newton_terms(&self, y: f64, eta: f64) -> NewtonTerms {
        match self {
            Self::Logit => {
                let p = self.probability(eta);
                NewtonTerms {
                    score: y - p,
                    weight: p * (1.0 - p),
                }
            }
            Self::Probit => {
                let mut terms = NewtonTerms { score: 0.0, weight: 0.0 };
                for (share, q) in [(y, 1.0), (1.0 - y, -1.0)] {
                    if share > 0.0 {
                        let lambda = q * mills_ratio(q * eta);
                        terms.score += share * lambda;
                        terms.weight += share * lambda * (lambda + eta);
                    }
                }
                terms
            }
        }
    }
}

fn std_normal() -> Option<Normal> {
    Normal::new(0.0, 1.0).ok()
}

fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

/// φ(t) / Φ(t), switching to the asymptote -t deep in the lower tail.
fn mills_ratio(t: f64) -> f64 {
    let Some(n) = std_normal() else {
        return f64::NAN;
    };
    let cdf = n.cdf(t);
    if cdf > 1e-300 {
        n.pdf(t) / cdf
    } else {
        -t
    }
}

/// ln Φ(t) with an asymptotic tail for very negative t.
fn log_normal_cdf(t: f64) -> f64 {
    let Some(n) = std_normal() else {
        return f64::NAN;
    };
    let cdf = n.cdf(t);
    if cdf > 1e-300 {
        cdf.ln()
    } else {
        n.ln_pdf(t) - (-t).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_probabilities_at_zero() {
        assert_relative_eq!(BinomialLink::Logit.probability(0.0), 0.5);
        assert_relative_eq!(BinomialLink::Probit.probability(0.0), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_log_likelihood_matches_probability() {
        for link in [BinomialLink::Logit, BinomialLink::Probit] {
            for eta in [-2.0, -0.3, 0.0, 1.1, 3.0] {
                let p = link.probability(eta);
                assert_relative_eq!(link.log_likelihood(1.0, eta), p.ln(), epsilon = 1e-10);
                assert_relative_eq!(
                    link.log_likelihood(0.0, eta),
                    (1.0 - p).ln(),
                    epsilon = 1e-10
                );
            }
        }
    }

    #[test]
    fn test_probit_score_is_derivative() {
        let link = BinomialLink::Probit;
        let h = 1e-6;
        for (y, eta) in [(1.0, 0.4), (0.0, -1.2), (1.0, -2.5), (0.3, 0.7)] {
            let numeric =
                (link.log_likelihood(y, eta + h) - link.log_likelihood(y, eta - h)) / (2.0 * h);
            assert_relative_eq!(link.newton_terms(y, eta).score, numeric, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_extreme_tails_stay_finite() {
        let link = BinomialLink::Probit;
        assert!(link.log_likelihood(1.0, -45.0).is_finite());
        assert!(link.newton_terms(1.0, -45.0).weight.is_finite());
        assert!(BinomialLink::Logit.log_likelihood(0.0, 800.0).is_finite());
    }
}
