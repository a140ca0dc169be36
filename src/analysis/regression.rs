//! Regression analyses: dummy expansion, design, estimation and summary.

use log::{info, warn};

use super::design::{
    demean_iv_design, group_index, iv_design, linear_design, panel_index, IvDesign, INTERCEPT,
};
use super::error::AnalysisError;
use super::request::{
    AbsorbedRequest, BinaryRequest, FixedEffectsRequest, TwoStageFixedEffectsRequest,
    TwoStageRequest,
};
use crate::config::EstimationConfig;
use crate::core::BinomialLink;
use crate::data::{expand_dummies, Dataset};
use crate::diagnostics::{condition_diagnostic, ConditionDiagnostic};
use crate::report::ModelSummary;
use crate::solvers::{
    BinomialRegressor, FittedBinomial, FittedIv, FittedPanel, FittedRegressor, PanelIndex,
    PanelRegressor, Regressor, TwoStageLeastSquares,
};

/// Append indicator columns and return the full regressor list.
fn with_dummies(
    dataset: &mut Dataset,
    x_vars: &[String],
    dummies: &[String],
) -> Result<Vec<String>, AnalysisError> {
    let expansion = expand_dummies(dataset, dummies)?;
    let mut names = x_vars.to_vec();
    for name in expansion.regressor_names() {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

fn add_condition_note(summary: &mut ModelSummary, condition: &ConditionDiagnostic) {
    summary.push_stat("Cond. No.", condition.condition_number);
    if let Some(warning) = &condition.warning {
        summary.push_note(warning.clone());
    }
}

fn names_of(indices: &[usize], names: &[String]) -> String {
    indices
        .iter()
        .filter_map(|&j| names.get(j).map(String::as_str))
        .collect::<Vec<_>>()
        .join(", ")
}

/// OLS with indicator columns and one absorbed grouping column.
pub fn absorbed_regression(
    request: &AbsorbedRequest,
    mut dataset: Dataset,
    config: &EstimationConfig,
) -> Result<ModelSummary, AnalysisError> {
    let x_vars = with_dummies(&mut dataset, &request.x_var_list, &request.dummies_var_list)?;
    let design = linear_design(&dataset, &request.y_var, &x_vars)?;
    let index = panel_index(&dataset, &request.absorb_var, None)?;
    let condition = condition_diagnostic(&design.x, request.add_intercept)?;

    info!(
        "absorbing '{}' over {} rows with {} regressors",
        request.absorb_var,
        dataset.n_rows(),
        x_vars.len()
    );
    let fitted =
        panel_regressor(config, request.add_intercept, false).fit(&design.x, &design.y, &index)?;

    let mut summary = panel_summary(
        "OLS Regression With Absorbed Effects",
        &fitted,
        &design.names,
        &request.y_var,
        request.source.accuracy,
    );
    summary.push_header("Absorbed", &request.absorb_var);
    add_condition_note(&mut summary, &condition);
    Ok(summary)
}

/// Within regression with one or two fixed effects.
pub fn fixed_effects(
    request: &FixedEffectsRequest,
    dataset: Dataset,
    config: &EstimationConfig,
) -> Result<ModelSummary, AnalysisError> {
    let design = linear_design(&dataset, &request.y_var, &request.x_var_list)?;
    let index: PanelIndex = panel_index(&dataset, &request.fix1, request.fix2.as_deref())?;
    let time_effects = request.fix2.is_some();
    let condition = condition_diagnostic(&design.x, request.add_intercept)?;

    info!(
        "fitting {} fixed effects over {} rows",
        if time_effects { "two-way" } else { "one-way" },
        dataset.n_rows()
    );
    let fitted = panel_regressor(config, request.add_intercept, time_effects).fit(
        &design.x,
        &design.y,
        &index,
    )?;

    let mut summary = panel_summary(
        "PanelOLS Estimation Summary",
        &fitted,
        &design.names,
        &request.y_var,
        request.source.accuracy,
    );
    let effects = match &request.fix2 {
        Some(fix2) => format!("{}, {}", request.fix1, fix2),
        None => request.fix1.clone(),
    };
    summary.push_header("Effects", effects);
    add_condition_note(&mut summary, &condition);
    Ok(summary)
}

fn panel_regressor(
    config: &EstimationConfig,
    with_intercept: bool,
    time_effects: bool,
) -> PanelRegressor {
    PanelRegressor::builder()
        .with_intercept(with_intercept)
        .time_effects(time_effects)
        .drop_singletons(config.drop_singletons)
        .drop_absorbed(config.drop_absorbed)
        .covariance(config.covariance)
        .confidence_level(config.confidence_level)
        .rank_tolerance(config.rank_tolerance)
        .build()
}

fn panel_summary(
    title: &str,
    fitted: &FittedPanel,
    names: &[String],
    y_var: &str,
    accuracy: usize,
) -> ModelSummary {
    let result = fitted.result();
    let mut summary = ModelSummary::from_result(title, result, names, INTERCEPT);
    summary.accuracy = accuracy;
    summary.header.insert(0, ("Dep. Variable".to_string(), y_var.to_string()));
    summary.push_header("Estimator", "PanelOLS");
    summary.push_header("Entities", fitted.n_entities);
    if fitted.time_effects {
        summary.push_header("Time periods", fitted.n_time_periods);
    }
    summary.push_stat("R-squared (Within)", result.r_squared);
    summary.push_stat("R-squared (Overall)", fitted.r_squared_overall);
    summary.push_stat("Adj. R-squared", result.adj_r_squared);
    summary.push_stat("F-statistic", result.f_statistic);
    summary.push_stat("P-value (F-stat)", result.f_pvalue);
    summary.push_header("Cov. Estimator", fitted.covariance.label());
    summary.push_header("Singletons dropped", fitted.dropped_singletons.len());

    if !fitted.absorbed.is_empty() {
        summary.push_note(format!(
            "Variables absorbed by the fixed effects were dropped: {}",
            names_of(&fitted.absorbed, names)
        ));
    }
    let collinear: Vec<usize> = result
        .aliased_columns()
        .into_iter()
        .filter(|j| !fitted.absorbed.contains(j))
        .collect();
    if !collinear.is_empty() {
        summary.push_note(format!(
            "Collinear variables were dropped: {}",
            names_of(&collinear, names)
        ));
    }
    summary
}

/// Probit or logit regression with indicator columns.
pub fn binary_regression(
    request: &BinaryRequest,
    link: BinomialLink,
    mut dataset: Dataset,
    config: &EstimationConfig,
) -> Result<ModelSummary, AnalysisError> {
    let x_vars = with_dummies(&mut dataset, &request.x_var_list, &request.dummies_var_list)?;
    let design = linear_design(&dataset, &request.y_var, &x_vars)?;
    let condition = condition_diagnostic(&design.x, request.add_intercept)?;

    info!("fitting {} model over {} rows", link.name(), dataset.n_rows());
    let fitted = BinomialRegressor::builder()
        .link(link)
        .with_intercept(request.add_intercept)
        .max_iterations(config.max_iterations)
        .tolerance(config.tolerance)
        .rank_tolerance(config.rank_tolerance)
        .confidence_level(config.confidence_level)
        .build()
        .fit(&design.x, &design.y)?;

    let title = match link {
        BinomialLink::Probit => "Probit Regression Results",
        BinomialLink::Logit => "Logit Regression Results",
    };
    let mut summary = binary_summary(
        title,
        &fitted,
        &design.names,
        &request.y_var,
        request.source.accuracy,
    );
    add_condition_note(&mut summary, &condition);
    Ok(summary)
}

fn binary_summary(
    title: &str,
    fitted: &FittedBinomial,
    names: &[String],
    y_var: &str,
    accuracy: usize,
) -> ModelSummary {
    let result = fitted.result();
    let mut summary = ModelSummary::from_result(title, result, names, INTERCEPT);
    summary.accuracy = accuracy;
    summary.header.insert(0, ("Dep. Variable".to_string(), y_var.to_string()));
    summary.push_header("Model", fitted.link.name());
    summary.push_header("Method", "MLE");
    summary.push_header("Converged", fitted.converged);
    summary.push_header("Iterations", fitted.iterations);
    summary.push_stat("Pseudo R-squ.", fitted.pseudo_r_squared);
    summary.push_stat("Log-Likelihood", fitted.log_likelihood);
    summary.push_stat("LL-Null", fitted.null_log_likelihood);
    summary.push_stat("LLR p-value", fitted.lr_pvalue);
    summary.push_stat("AIC", result.aic);
    summary.push_stat("BIC", result.bic);

    if !fitted.converged {
        summary.push_note(format!(
            "Maximum number of iterations ({}) exceeded.",
            fitted.iterations
        ));
    }
    if let Some(message) = &fitted.separation.warning_message {
        summary.push_note(message.clone());
    }
    let flagged = fitted.separation_warnings();
    if !flagged.is_empty() {
        summary.push_note(format!(
            "Possible quasi-separation in: {}",
            names_of(&flagged, names)
        ));
    }
    summary
}

/// Two-stage least squares with indicator columns among the controls.
pub fn two_stage(
    request: &TwoStageRequest,
    mut dataset: Dataset,
    config: &EstimationConfig,
) -> Result<ModelSummary, AnalysisError> {
    let controls = with_dummies(&mut dataset, &request.x_var_list, &request.dummies_var_list)?;
    let design = iv_design(
        &dataset,
        &request.y_var,
        &request.first_y,
        &controls,
        &request.iv_list,
        request.add_intercept,
    )?;
    let fitted = fit_iv(&design, config)?;
    let mut summary = iv_summary(
        "IV-2SLS Estimation Summary",
        &fitted,
        &design,
        &request.y_var,
        request.source.accuracy,
    );
    add_condition_note(&mut summary, &condition_diagnostic(&design.x, design.with_intercept)?);
    Ok(summary)
}

/// Two-stage least squares on data demeaned within fixed-effect cells.
pub fn two_stage_fixed_effects(
    request: &TwoStageFixedEffectsRequest,
    dataset: Dataset,
    config: &EstimationConfig,
) -> Result<ModelSummary, AnalysisError> {
    let mut design = iv_design(
        &dataset,
        &request.y_var,
        &request.first_y,
        &request.x_var_list,
        &request.iv_list,
        false,
    )?;
    let mut groups = vec![group_index(&dataset, &request.fix1)?];
    if let Some(fix2) = &request.fix2 {
        groups.push(group_index(&dataset, fix2)?);
    }
    demean_iv_design(&mut design, &groups);

    let fitted = fit_iv(&design, config)?;
    let mut summary = iv_summary(
        "IV-2SLS Fixed Effects Estimation Summary",
        &fitted,
        &design,
        &request.y_var,
        request.source.accuracy,
    );
    let effects = std::iter::once(request.fix1.as_str())
        .chain(request.fix2.as_deref())
        .collect::<Vec<_>>()
        .join(", ");
    summary.push_header("Effects", effects);
    summary.push_note(
        "Variables were demeaned within fixed-effect cells; degrees of freedom are not adjusted.",
    );
    Ok(summary)
}

fn fit_iv(design: &IvDesign, config: &EstimationConfig) -> Result<FittedIv, AnalysisError> {
    info!(
        "fitting 2SLS for '{}' with instruments [{}]",
        design.endogenous,
        design.instrument_set().join(", ")
    );
    let fitted = TwoStageLeastSquares::builder()
        .with_intercept(design.with_intercept)
        .covariance(config.covariance)
        .confidence_level(config.confidence_level)
        .rank_tolerance(config.rank_tolerance)
        .endogenous(&[0])
        .build()
        .fit(&design.x, &design.y, &design.z)?;
    if let Some(r2) = fitted.first_stage_r_squared.first() {
        if *r2 < 0.1 {
            warn!("weak first stage for '{}': R² = {:.4}", design.endogenous, r2);
        }
    }
    Ok(fitted)
}

fn iv_summary(
    title: &str,
    fitted: &FittedIv,
    design: &IvDesign,
    y_var: &str,
    accuracy: usize,
) -> ModelSummary {
    let result = fitted.result();
    let names = design.feature_names();
    let mut summary = ModelSummary::from_result(title, result, &names, INTERCEPT);
    summary.accuracy = accuracy;
    summary.header.insert(0, ("Dep. Variable".to_string(), y_var.to_string()));
    summary.push_header("Estimator", "IV-2SLS");
    summary.push_stat("R-squared", result.r_squared);
    summary.push_stat("Adj. R-squared", result.adj_r_squared);
    summary.push_stat("F-statistic", result.f_statistic);
    summary.push_stat("P-value (F-stat)", result.f_pvalue);
    summary.push_header("Cov. Estimator", fitted.covariance.label());
    summary.push_header("Endogenous", &design.endogenous);
    summary.push_header("Instruments", design.instrument_set().join(", "));
    if let Some(r2) = fitted.first_stage_r_squared.first() {
        summary.push_stat("First-stage R-squared", *r2);
    }
    let collinear = result.aliased_columns();
    if !collinear.is_empty() {
        summary.push_note(format!(
            "Collinear variables were dropped: {}",
            names_of(&collinear, &names)
        ));
    }
    summary
}
