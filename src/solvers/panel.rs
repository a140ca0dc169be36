//! Fixed-effects (within) panel regression.
//!
//! Entity effects are always absorbed; time effects optionally. One-way
//! effects are removed exactly, two-way effects by alternating projections.
//! When an intercept is requested the grand means are added back after
//! demeaning, so the constant is the average effect and the slopes are
//! unchanged.
//!
//! Groups with a single observation carry no within variation and are dropped
//! (repeatedly, since dropping a row can create new singletons in the other
//! dimension). Regressors that do not vary within groups are absorbed by the
//! effects and dropped.

use faer::{Col, Mat};
use log::{debug, warn};

use super::least_squares::{
    least_squares, select_block, select_columns, select_rows, with_intercept_column,
    DEFAULT_RANK_TOLERANCE,
};
use super::traits::{linear_prediction, FittedRegressor, RegressionError};
use super::within::{demean_col, demean_matrix, DemeanOptions, GroupIndex};
use crate::core::RegressionResult;
use crate::inference::{
    coefficient_covariance, wald_test, CoefficientInference, CovarianceType, ReferenceDistribution,
};

/// Relative within-variation below which a regressor counts as absorbed.
const ABSORBED_TOLERANCE: f64 = 1e-8;

/// Two-level row index: entity first, then time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelIndex {
    entity: GroupIndex,
    time: GroupIndex,
}

impl PanelIndex {
    pub fn new(entity: GroupIndex, time: GroupIndex) -> Result<Self, RegressionError> {
        if entity.len() != time.len() {
            return Err(RegressionError::DimensionMismatch {
                x_rows: entity.len(),
                y_len: time.len(),
            });
        }
        Ok(Self { entity, time })
    }

    /// Entity index with a constant time dimension.
    pub fn entity_only(entity: GroupIndex) -> Self {
        let time = GroupIndex::constant(entity.len());
        Self { entity, time }
    }

    pub fn from_keys<E: Ord + Clone, T: Ord + Clone>(
        entities: &[E],
        times: &[T],
    ) -> Result<Self, RegressionError> {
        Self::new(GroupIndex::from_keys(entities), GroupIndex::from_keys(times))
    }

    pub fn len(&self) -> usize {
        self.entity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity.is_empty()
    }

    pub fn entity(&self) -> &GroupIndex {
        &self.entity
    }

    pub fn time(&self) -> &GroupIndex {
        &self.time
    }

    fn subset(&self, rows: &[usize]) -> Self {
        Self {
            entity: self.entity.subset(rows),
            time: self.time.subset(rows),
        }
    }
}

/// Within estimator with entity effects and optional time effects.
///
/// # Example
///
/// ```rust,ignore
/// use anofox_econometrics::solvers::{PanelIndex, PanelRegressor};
///
/// let index = PanelIndex::from_keys(&firm, &year)?;
/// let fitted = PanelRegressor::builder()
///     .time_effects(true)
///     .build()
///     .fit(&x, &y, &index)?;
/// println!("within R² = {}", fitted.result().r_squared);
/// ```
#[derive(Debug, Clone)]
pub struct PanelRegressor {
    with_intercept: bool,
    time_effects: bool,
    drop_singletons: bool,
    drop_absorbed: bool,
    covariance: CovarianceType,
    confidence_level: f64,
    rank_tolerance: f64,
    demean: DemeanOptions,
}

impl Default for PanelRegressor {
    fn default() -> Self {
        PanelRegressorBuilder::default().build()
    }
}

impl PanelRegressor {
    pub fn builder() -> PanelRegressorBuilder {
        PanelRegressorBuilder::default()
    }

    pub fn fit(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        index: &PanelIndex,
    ) -> Result<FittedPanel, RegressionError> {
        if x.nrows() != y.nrows() {
            return Err(RegressionError::DimensionMismatch {
                x_rows: x.nrows(),
                y_len: y.nrows(),
            });
        }
        if index.len() != y.nrows() {
            return Err(RegressionError::DimensionMismatch {
                x_rows: index.len(),
                y_len: y.nrows(),
            });
        }

        let n_features = x.ncols();
        let keep = if self.drop_singletons {
            self.non_singleton_rows(index)
        } else {
            (0..index.len()).collect()
        };
        let mut is_kept = vec![false; index.len()];
        for &r in &keep {
            is_kept[r] = true;
        }
        let dropped_singletons: Vec<usize> = (0..index.len()).filter(|&i| !is_kept[i]).collect();
        if !dropped_singletons.is_empty() {
            warn!("dropped {} singleton observations", dropped_singletons.len());
        }

        let index = index.subset(&keep);
        let x = select_rows(x, &keep);
        let y = Col::from_fn(keep.len(), |r| y[keep[r]]);
        let n = keep.len();
        if n == 0 {
            return Err(RegressionError::InsufficientObservations { needed: 1, got: 0 });
        }

        let groups: Vec<&GroupIndex> = if self.time_effects {
            vec![&index.entity, &index.time]
        } else {
            vec![&index.entity]
        };
        let y_dm = demean_col(&y, &groups, self.demean);
        let x_dm = demean_matrix(&x, &groups, self.demean);

        // Regressors with no variation left after demeaning.
        let absorbed: Vec<usize> = (0..n_features)
            .filter(|&j| {
                let ss_dm: f64 = (0..n).map(|i| x_dm[(i, j)].powi(2)).sum();
                let ss_raw: f64 = (0..n).map(|i| x[(i, j)].powi(2)).sum();
                ss_dm <= ABSORBED_TOLERANCE * ss_raw
            })
            .collect();
        if !absorbed.is_empty() {
            if !self.drop_absorbed {
                return Err(RegressionError::AbsorbedRegressors { columns: absorbed });
            }
            warn!("dropping absorbed regressors {:?}", absorbed);
        }
        let kept_features: Vec<usize> = (0..n_features).filter(|j| !absorbed.contains(j)).collect();

        // Add the grand means back so the intercept is identified.
        let (y_fit, x_fit) = if self.with_intercept {
            let y_bar = y.iter().sum::<f64>() / n as f64;
            let x_bar: Vec<f64> = (0..n_features)
                .map(|j| (0..n).map(|i| x[(i, j)]).sum::<f64>() / n as f64)
                .collect();
            (
                Col::from_fn(n, |i| y_dm[i] + y_bar),
                Mat::from_fn(n, n_features, |i, j| x_dm[(i, j)] + x_bar[j]),
            )
        } else {
            (y_dm.clone(), x_dm.clone())
        };
        let design =
            with_intercept_column(&select_columns(&x_fit, &kept_features), self.with_intercept);
        let ls = least_squares(&design, &y_fit, self.rank_tolerance)?;

        let offset = usize::from(self.with_intercept);
        // position of each feature in the design, if it entered
        let design_pos: Vec<Option<usize>> = (0..n_features)
            .map(|j| kept_features.iter().position(|&k| k == j).map(|p| p + offset))
            .collect();
        let aliased: Vec<bool> = design_pos
            .iter()
            .map(|pos| pos.map_or(true, |p| ls.aliased[p]))
            .collect();
        let collinear: Vec<usize> = (0..n_features)
            .filter(|&j| aliased[j] && !absorbed.contains(&j))
            .collect();
        if !collinear.is_empty() {
            warn!("dropping collinear regressors {:?}", collinear);
        }

        let n_entities = index.entity.n_groups();
        let n_time = index.time.n_groups();
        let time_absorbed = if self.time_effects { n_time.saturating_sub(1) } else { 0 };
        let df_absorbed = (n_entities + time_absorbed)
            .saturating_sub(offset);
        let n_params = ls.rank();
        if n <= n_params + df_absorbed {
            return Err(RegressionError::InsufficientObservations {
                needed: n_params + df_absorbed + 1,
                got: n,
            });
        }
        let residual_df = n - n_params - df_absorbed;

        let design_active = select_columns(&design, &ls.active);
        let vcov = coefficient_covariance(
            &design_active,
            &ls.xtx_inv,
            &ls.residuals,
            residual_df,
            self.covariance,
        )?;
        let se_active = CoefficientInference::standard_errors(&vcov);

        let full_len = offset + n_features;
        let to_full = |design_values: &dyn Fn(usize) -> f64| {
            Col::from_fn(full_len, |i| {
                if i < offset {
                    design_values(0)
                } else {
                    match design_pos[i - offset] {
                        Some(p) if !ls.aliased[p] => design_values(p),
                        _ => f64::NAN,
                    }
                }
            })
        };
        let params = to_full(&|p| ls.params[p]);
        let std_errors = to_full(&|p| {
            ls.active
                .iter()
                .position(|&a| a == p)
                .map_or(f64::NAN, |k| se_active[k])
        });

        let ssr = ls.ssr;
        let y_dm_mean = y_dm.iter().sum::<f64>() / n as f64;
        let tss_within: f64 = y_dm.iter().map(|v| (v - y_dm_mean).powi(2)).sum();
        let r_squared = if tss_within > 0.0 { 1.0 - ssr / tss_within } else { f64::NAN };

        let mut result = RegressionResult::empty(n_features, n);
        result.set_parameters(&params, self.with_intercept);
        result.aliased = aliased;
        result.n_parameters = n_params;
        result.df_absorbed = df_absorbed;
        result.set_inference(
            &std_errors,
            ReferenceDistribution::StudentT(residual_df as f64),
            self.confidence_level,
        );
        result.residuals = ls.residuals.clone();
        result.fitted_values = Col::from_fn(n, |i| y[i] - ls.residuals[i]);
        result.r_squared = r_squared;
        result.adj_r_squared =
            1.0 - (1.0 - r_squared) * (n as f64 - offset as f64) / residual_df as f64;
        result.mse = ssr / residual_df as f64;
        result.rmse = result.mse.sqrt();
        result.set_gaussian_information(ssr);

        // Joint test of the slopes (intercept excluded).
        let slope_k: Vec<usize> =
            (0..ls.active.len()).filter(|&k| ls.active[k] >= offset).collect();
        let active_params = ls.active_params();
        let slopes = Col::from_fn(slope_k.len(), |i| active_params[slope_k[i]]);
        let wald = wald_test(&slopes, &select_block(&vcov, &slope_k), residual_df);
        result.f_statistic = wald.f_statistic;
        result.f_pvalue = wald.p_value;

        let overall_pred = linear_prediction(&result, &x);
        let y_bar = y.iter().sum::<f64>() / n as f64;
        let tss: f64 = y.iter().map(|v| (v - y_bar).powi(2)).sum();
        let ssr_overall: f64 = (0..n).map(|i| (y[i] - overall_pred[i]).powi(2)).sum();
        let r_squared_overall = if tss > 0.0 { 1.0 - ssr_overall / tss } else { f64::NAN };

        debug!(
            "panel fit: n={}, entities={}, periods={}, rank={}, df_absorbed={}",
            n, n_entities, n_time, n_params, df_absorbed
        );

        Ok(FittedPanel {
            result,
            n_entities,
            n_time_periods: n_time,
            time_effects: self.time_effects,
            dropped_singletons,
            absorbed,
            r_squared_overall,
            covariance: self.covariance,
            vcov,
        })
    }

    /// Rows left after iteratively removing singleton groups.
    fn non_singleton_rows(&self, index: &PanelIndex) -> Vec<usize> {
        let mut rows: Vec<usize> = (0..index.len()).collect();
        loop {
            let current = index.subset(&rows);
            let keep: Vec<usize> = (0..rows.len())
                .filter(|&r| {
                    current.entity.group_size(r) > 1
                        && (!self.time_effects || current.time.group_size(r) > 1)
                })
                .collect();
            if keep.len() == rows.len() {
                return rows;
            }
            rows = keep.into_iter().map(|r| rows[r]).collect();
        }
    }
}

/// A fitted within estimator.
#[derive(Debug, Clone)]
pub struct FittedPanel {
    result: RegressionResult,
    pub n_entities: usize,
    pub n_time_periods: usize,
    pub time_effects: bool,
    /// Input rows removed as singletons.
    pub dropped_singletons: Vec<usize>,
    /// Feature columns absorbed by the effects.
    pub absorbed: Vec<usize>,
    /// 1 - SSR/TSS of the levels prediction `intercept + xβ`.
    pub r_squared_overall: f64,
    pub covariance: CovarianceType,
    /// Covariance of the estimated (non-aliased) parameters.
    pub vcov: Mat<f64>,
}

impl FittedRegressor for FittedPanel {
    /// Prediction without the group effects.
    fn predict(&self, x: &Mat<f64>) -> Col<f64> {
        linear_prediction(&self.result, x)
    }

    fn result(&self) -> &RegressionResult {
        &self.result
    }
}

/// Builder for [`PanelRegressor`].
#[derive(Debug, Clone)]
pub struct PanelRegressorBuilder {
    with_intercept: bool,
    time_effects: bool,
    drop_singletons: bool,
    drop_absorbed: bool,
    covariance: CovarianceType,
    confidence_level: f64,
    rank_tolerance: f64,
    demean: DemeanOptions,
}

impl Default for PanelRegressorBuilder {
    fn default() -> Self {
        Self {
            with_intercept: true,
            time_effects: false,
            drop_singletons: true,
            drop_absorbed: true,
            covariance: CovarianceType::Unadjusted,
            confidence_level: 0.95,
            rank_tolerance: DEFAULT_RANK_TOLERANCE,
            demean: DemeanOptions::default(),
        }
    }
}

impl PanelRegressorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include a constant (grand mean) term. Default true.
    pub fn with_intercept(mut self, include: bool) -> Self {
        self.with_intercept = include;
        self
    }

    /// Absorb the second index level as well. Default false.
    pub fn time_effects(mut self, enabled: bool) -> Self {
        self.time_effects = enabled;
        self
    }

    /// Default true.
    pub fn drop_singletons(mut self, drop: bool) -> Self {
        self.drop_singletons = drop;
        self
    }

    /// Drop regressors absorbed by the effects instead of failing. Default true.
    pub fn drop_absorbed(mut self, drop: bool) -> Self {
        self.drop_absorbed = drop;
        self
    }

    pub fn covariance(mut self, covariance: CovarianceType) -> Self {
        self.covariance = covariance;
        self
    }

    pub fn confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    pub fn rank_tolerance(mut self, tolerance: f64) -> Self {
        self.rank_tolerance = tolerance;
        self
    }

    pub fn demean_options(mut self, options: DemeanOptions) -> Self {
        self.demean = options;
        self
    }

    pub fn build(self) -> PanelRegressor {
        PanelRegressor {
            with_intercept: self.with_intercept,
            time_effects: self.time_effects,
            drop_singletons: self.drop_singletons,
            drop_absorbed: self.drop_absorbed,
            covariance: self.covariance,
            confidence_level: self.confidence_level,
            rank_tolerance: self.rank_tolerance,
            demean: self.demean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// y = 2 x + α_e with α = (10, -5, 3), two regressors.
    fn one_way_data() -> (Mat<f64>, Col<f64>, PanelIndex) {
        let entity = [0, 0, 0, 1, 1, 1, 2, 2, 2, 2];
        let alpha = [10.0, -5.0, 3.0];
        let x1 = [1.0, 2.0, 4.0, 0.5, 1.5, 3.5, 2.0, 2.5, 6.0, 1.0];
        let x2 = [0.3, -0.2, 0.1, 0.7, 0.0, -0.4, 0.2, 0.9, -0.1, 0.5];
        let noise = [0.05, -0.03, 0.01, -0.02, 0.04, -0.01, 0.02, -0.05, 0.03, 0.0];
        let x = Mat::from_fn(10, 2, |i, j| if j == 0 { x1[i] } else { x2[i] });
        let y = Col::from_fn(10, |i| 2.0 * x1[i] - 1.0 * x2[i] + alpha[entity[i]] + noise[i]);
        (x, y, PanelIndex::entity_only(GroupIndex::from_keys(&entity)))
    }

    #[test]
    fn test_one_way_recovers_slopes() {
        let (x, y, index) = one_way_data();
        let fitted = PanelRegressor::default().fit(&x, &y, &index).unwrap();
        let r = fitted.result();
        assert_relative_eq!(r.coefficients[0], 2.0, epsilon = 0.05);
        assert_relative_eq!(r.coefficients[1], -1.0, epsilon = 0.2);
        assert_eq!(fitted.n_entities, 3);
        // 3 entities minus the intercept
        assert_eq!(r.df_absorbed, 2);
        assert_eq!(r.residual_df(), 10 - 3 - 2);
        assert!(r.r_squared > 0.99);
    }

    #[test]
    fn test_intercept_is_average_effect() {
        let (x, y, index) = one_way_data();
        let with = PanelRegressor::default().fit(&x, &y, &index).unwrap();
        let without = PanelRegressor::builder()
            .with_intercept(false)
            .build()
            .fit(&x, &y, &index)
            .unwrap();
        // same slopes either way
        for j in 0..2 {
            assert_relative_eq!(
                with.result().coefficients[j],
                without.result().coefficients[j],
                epsilon = 1e-10
            );
        }
        // intercept = ȳ - x̄β
        let n = 10.0;
        let y_bar = y.iter().sum::<f64>() / n;
        let xb: f64 = (0..2)
            .map(|j| (0..10).map(|i| x[(i, j)]).sum::<f64>() / n * with.result().coefficients[j])
            .sum();
        assert_relative_eq!(with.result().intercept.unwrap(), y_bar - xb, epsilon = 1e-10);
        assert_eq!(without.result().df_absorbed, 3);
    }

    #[test]
    fn test_singletons_dropped() {
        let entity = [0, 0, 0, 1, 2, 2];
        let x = Mat::from_fn(6, 1, |i, _| [1.0, 2.0, 3.0, 9.0, 1.0, 4.0][i]);
        let y = Col::from_fn(6, |i| 2.0 * x[(i, 0)] + [0.1, -0.1, 0.05, 0.0, 0.2, -0.2][i]);
        let index = PanelIndex::entity_only(GroupIndex::from_keys(&entity));

        let fitted = PanelRegressor::default().fit(&x, &y, &index).unwrap();
        assert_eq!(fitted.dropped_singletons, vec![3]);
        assert_eq!(fitted.result().n_observations, 5);

        let kept = PanelRegressor::builder()
            .drop_singletons(false)
            .build()
            .fit(&x, &y, &index)
            .unwrap();
        assert_eq!(kept.result().n_observations, 6);
        // a singleton carries no within information
        assert_relative_eq!(
            kept.result().coefficients[0],
            fitted.result().coefficients[0],
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_absorbed_regressor_dropped_or_rejected() {
        let (x, y, index) = one_way_data();
        let codes = index.entity().codes().to_vec();
        // third column is constant within entity
        let x3 = Mat::from_fn(10, 3, |i, j| if j < 2 { x[(i, j)] } else { codes[i] as f64 * 1.5 });

        let fitted = PanelRegressor::default().fit(&x3, &y, &index).unwrap();
        assert_eq!(fitted.absorbed, vec![2]);
        assert!(fitted.result().aliased[2]);
        assert!(fitted.result().coefficients[2].is_nan());
        assert!(fitted.result().std_errors.as_ref().unwrap()[2].is_nan());
        assert_relative_eq!(fitted.result().coefficients[0], 2.0, epsilon = 0.05);

        let err = PanelRegressor::builder()
            .drop_absorbed(false)
            .build()
            .fit(&x3, &y, &index)
            .unwrap_err();
        assert_eq!(err, RegressionError::AbsorbedRegressors { columns: vec![2] });
    }

    #[test]
    fn test_single_group_does_not_crash() {
        let x = Mat::from_fn(6, 1, |i, _| i as f64);
        let y = Col::from_fn(6, |i| 1.0 + 0.5 * i as f64 + [0.1, -0.1, 0.0, 0.2, -0.2, 0.0][i]);
        let index = PanelIndex::entity_only(GroupIndex::from_keys(&[7; 6]));
        let fitted = PanelRegressor::default().fit(&x, &y, &index).unwrap();
        assert_eq!(fitted.result().df_absorbed, 0);
        assert_relative_eq!(fitted.result().coefficients[0], 0.5, epsilon = 0.1);
    }

    #[test]
    fn test_two_way_matches_dummy_regression() {
        // balanced 4 x 3 panel: additive entity and time effects
        let n = 12;
        let e: Vec<usize> = (0..n).map(|i| i / 3).collect();
        let t: Vec<usize> = (0..n).map(|i| i % 3).collect();
        let x = Mat::from_fn(n, 1, |i, _| ((i * 5) % 7) as f64 + 0.3 * t[i] as f64);
        let y = Col::from_fn(n, |i| {
            1.5 * x[(i, 0)]
                + [1.0, 4.0, -2.0, 0.5][e[i]]
                + [0.0, 2.0, -1.0][t[i]]
                + [0.1, -0.1][i % 2]
        });
        let index = PanelIndex::from_keys(&e, &t).unwrap();
        let fitted = PanelRegressor::builder()
            .time_effects(true)
            .build()
            .fit(&x, &y, &index)
            .unwrap();

        // reference: explicit dummies for entities 1..3 and periods 1..2
        let dummies = Mat::from_fn(n, 6, |i, j| match j {
            0 => x[(i, 0)],
            1..=3 => f64::from(u8::from(e[i] == j)),
            _ => f64::from(u8::from(t[i] == j - 3)),
        });
        let design = with_intercept_column(&dummies, true);
        let reference = least_squares(&design, &y, DEFAULT_RANK_TOLERANCE).unwrap();
        assert_relative_eq!(fitted.result().coefficients[0], reference.params[1], epsilon = 1e-8);
        // 4 entities + 2 extra periods
        assert_eq!(fitted.result().df_absorbed, 5);
        assert_relative_eq!(
            fitted.result().residuals.iter().map(|r| r * r).sum::<f64>(),
            reference.ssr,
            epsilon = 1e-8
        );
    }

    #[test]
    fn test_dimension_checks() {
        let (x, y, _) = one_way_data();
        let short = PanelIndex::entity_only(GroupIndex::from_keys(&[0, 1]));
        assert!(matches!(
            PanelRegressor::default().fit(&x, &y, &short),
            Err(RegressionError::DimensionMismatch { .. })
        ));
    }
}
