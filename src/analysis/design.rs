//! Design matrices for each regression variant.

use faer::{Col, Mat};

use super::error::AnalysisError;
use crate::data::Dataset;
use crate::solvers::{demean_by_cells, GroupIndex, PanelIndex};

/// Label of the constant column in summaries and instrument lists.
pub const INTERCEPT: &str = "intercept";

/// Numeric columns stacked into a matrix.
pub fn numeric_matrix<S: AsRef<str>>(
    dataset: &Dataset,
    names: &[S],
) -> Result<Mat<f64>, AnalysisError> {
    let columns = names
        .iter()
        .map(|n| dataset.numeric_values(n.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Mat::from_fn(dataset.n_rows(), columns.len(), |i, j| columns[j][i]))
}

/// Response and regressors of a linear model. The intercept is left to the estimator.
#[derive(Debug, Clone)]
pub struct LinearDesign {
    pub y: Col<f64>,
    pub x: Mat<f64>,
    pub names: Vec<String>,
}

pub fn linear_design<S: AsRef<str>>(
    dataset: &Dataset,
    y_var: &str,
    x_vars: &[S],
) -> Result<LinearDesign, AnalysisError> {
    Ok(LinearDesign {
        y: dataset.numeric_column(y_var)?,
        x: numeric_matrix(dataset, x_vars)?,
        names: x_vars.iter().map(|s| s.as_ref().to_string()).collect(),
    })
}

/// Group index over the distinct values of a column.
pub fn group_index(dataset: &Dataset, column: &str) -> Result<GroupIndex, AnalysisError> {
    Ok(GroupIndex::from_keys(&dataset.column(column)?.values))
}

/// Entity/time index. Without a time column every row shares one period.
pub fn panel_index(
    dataset: &Dataset,
    entity: &str,
    time: Option<&str>,
) -> Result<PanelIndex, AnalysisError> {
    let entity = group_index(dataset, entity)?;
    match time {
        Some(t) => Ok(PanelIndex::new(entity, group_index(dataset, t)?)?),
        None => Ok(PanelIndex::entity_only(entity)),
    }
}

/// Structural equation and instrument set of a two-stage regression.
#[derive(Debug, Clone)]
pub struct IvDesign {
    pub y: Col<f64>,
    /// `[endogenous, controls...]`
    pub x: Mat<f64>,
    /// `[controls..., excluded instruments...]`
    pub z: Mat<f64>,
    pub endogenous: String,
    pub controls: Vec<String>,
    pub instruments: Vec<String>,
    pub with_intercept: bool,
}

impl IvDesign {
    /// Regressor names in estimation order, intercept first when present.
    pub fn regressor_set(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        if self.with_intercept {
            names.push(INTERCEPT.to_string());
        }
        names.push(self.endogenous.clone());
        names.extend(self.controls.iter().cloned());
        names
    }

    /// Instrument names passed to the estimator. The endogenous regressor is never one.
    pub fn instrument_set(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        if self.with_intercept {
            names.push(INTERCEPT.to_string());
        }
        names.extend(self.controls.iter().cloned());
        names.extend(self.instruments.iter().cloned());
        names
    }

    /// Feature names aligned with the columns of `x`.
    pub fn feature_names(&self) -> Vec<String> {
        std::iter::once(self.endogenous.clone())
            .chain(self.controls.iter().cloned())
            .collect()
    }
}

/// Assemble a two-stage design.
///
/// Excluded instruments that repeat a control or name the endogenous
/// regressor are dropped.
pub fn iv_design<S: AsRef<str>>(
    dataset: &Dataset,
    y_var: &str,
    endogenous: &str,
    controls: &[S],
    instruments: &[S],
    with_intercept: bool,
) -> Result<IvDesign, AnalysisError> {
    let controls: Vec<String> = controls
        .iter()
        .map(|s| s.as_ref().to_string())
        .filter(|c| c != endogenous)
        .collect();
    let mut excluded: Vec<String> = Vec::new();
    for name in instruments.iter().map(|s| s.as_ref()) {
        if name != endogenous
            && !controls.iter().any(|c| c == name)
            && !excluded.iter().any(|e| e == name)
        {
            excluded.push(name.to_string());
        }
    }

    let mut design = IvDesign {
        y: dataset.numeric_column(y_var)?,
        x: Mat::zeros(0, 0),
        z: Mat::zeros(0, 0),
        endogenous: endogenous.to_string(),
        controls,
        instruments: excluded,
        with_intercept,
    };
    design.x = numeric_matrix(dataset, &design.feature_names())?;
    let z_names: Vec<String> = design.controls.iter().chain(&design.instruments).cloned().collect();
    design.z = numeric_matrix(dataset, &z_names)?;
    Ok(design)
}

/// Subtract cell means from the response, the regressors and the instruments.
///
/// Cells are the distinct combinations of the grouping columns.
pub fn demean_iv_design(design: &mut IvDesign, groups: &[GroupIndex]) {
    let refs: Vec<&GroupIndex> = groups.iter().collect();
    let y = Mat::from_fn(design.y.nrows(), 1, |i, _| design.y[i]);
    let y_dm = demean_by_cells(&y, &refs);
    design.y = Col::from_fn(y_dm.nrows(), |i| y_dm[(i, 0)]);
    design.x = demean_by_cells(&design.x, &refs);
    design.z = demean_by_cells(&design.z, &refs);
}
