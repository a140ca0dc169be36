//! Analysis requests as received from callers.
//!
//! Requests are tagged by an `"analysis"` field:
//!
//! ```json
//! {
//!   "analysis": "fixed_effects",
//!   "file_path": "panel.csv",
//!   "y_var": "wage",
//!   "x_var_list": ["hours", "tenure"],
//!   "fix1": "firm",
//!   "fix2": "year"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::AnalysisError;

fn default_accuracy() -> usize {
    3
}

fn default_true() -> bool {
    true
}

/// Input file and row selection shared by every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub file_path: PathBuf,
    #[serde(default)]
    pub where_string: Option<String>,
    /// Decimal places in the written results.
    #[serde(default = "default_accuracy")]
    pub accuracy: usize,
}

impl DataSource {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            where_string: None,
            accuracy: default_accuracy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveRequest {
    #[serde(flatten)]
    pub source: DataSource,
    /// Variables to describe; empty means every numeric column.
    #[serde(default)]
    pub var_list: Vec<String>,
    #[serde(default)]
    pub group_list: Vec<String>,
}

/// Correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    Pearson,
    Kendall,
    Spearman,
}

impl CorrelationMethod {
    pub const ALL: [CorrelationMethod; 3] = [Self::Pearson, Self::Kendall, Self::Spearman];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pearson => "pearson",
            Self::Kendall => "kendall",
            Self::Spearman => "spearman",
        }
    }
}

fn all_methods() -> Vec<CorrelationMethod> {
    CorrelationMethod::ALL.to_vec()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRequest {
    #[serde(flatten)]
    pub source: DataSource,
    #[serde(default)]
    pub var_list: Vec<String>,
    #[serde(default)]
    pub group_list: Vec<String>,
    #[serde(default = "all_methods")]
    pub methods: Vec<CorrelationMethod>,
}

/// Linear regression with one absorbed grouping column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsorbedRequest {
    #[serde(flatten)]
    pub source: DataSource,
    pub y_var: String,
    pub x_var_list: Vec<String>,
    pub absorb_var: String,
    #[serde(default)]
    pub dummies_var_list: Vec<String>,
    #[serde(default = "default_true")]
    pub add_intercept: bool,
}

/// Within regression with one or two fixed effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedEffectsRequest {
    #[serde(flatten)]
    pub source: DataSource,
    pub y_var: String,
    pub x_var_list: Vec<String>,
    pub fix1: String,
    #[serde(default)]
    pub fix2: Option<String>,
    #[serde(default = "default_true")]
    pub add_intercept: bool,
}

/// Probit or logit regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryRequest {
    #[serde(flatten)]
    pub source: DataSource,
    pub y_var: String,
    pub x_var_list: Vec<String>,
    #[serde(default)]
    pub dummies_var_list: Vec<String>,
    #[serde(default = "default_true")]
    pub add_intercept: bool,
}

/// Two-stage least squares with optional dummies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoStageRequest {
    #[serde(flatten)]
    pub source: DataSource,
    pub y_var: String,
    /// Exogenous regressors.
    pub x_var_list: Vec<String>,
    /// Endogenous regressor.
    pub first_y: String,
    #[serde(alias = "IV_list")]
    pub iv_list: Vec<String>,
    #[serde(default)]
    pub dummies_var_list: Vec<String>,
    #[serde(default = "default_true")]
    pub add_intercept: bool,
}

/// Two-stage least squares on data demeaned within fixed-effect cells.
///
/// There is no intercept: demeaning removes the level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoStageFixedEffectsRequest {
    #[serde(flatten)]
    pub source: DataSource,
    pub y_var: String,
    pub x_var_list: Vec<String>,
    pub first_y: String,
    #[serde(alias = "IV_list")]
    pub iv_list: Vec<String>,
    pub fix1: String,
    #[serde(default)]
    pub fix2: Option<String>,
}

/// Every supported analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "analysis", rename_all = "snake_case")]
pub enum AnalysisRequest {
    DescriptiveStatistics(DescriptiveRequest),
    Correlation(CorrelationRequest),
    AbsorbedRegression(AbsorbedRequest),
    FixedEffects(FixedEffectsRequest),
    Probit(BinaryRequest),
    Logit(BinaryRequest),
    TwoStageLeastSquares(TwoStageRequest),
    TwoStageFixedEffects(TwoStageFixedEffectsRequest),
}

impl AnalysisRequest {
    pub fn source(&self) -> &DataSource {
        match self {
            Self::DescriptiveStatistics(r) => &r.source,
            Self::Correlation(r) => &r.source,
            Self::AbsorbedRegression(r) => &r.source,
            Self::FixedEffects(r) => &r.source,
            Self::Probit(r) | Self::Logit(r) => &r.source,
            Self::TwoStageLeastSquares(r) => &r.source,
            Self::TwoStageFixedEffects(r) => &r.source,
        }
    }

    /// Short name used for output directories and file suffixes.
    pub fn analysis_name(&self) -> &'static str {
        match self {
            Self::DescriptiveStatistics(_) => "ts_stat",
            Self::Correlation(_) => "ts_corr",
            Self::AbsorbedRegression(_) => "ols_reg_with_dum",
            Self::FixedEffects(_) => "lin_fix_eff",
            Self::Probit(_) => "probit_with_dum",
            Self::Logit(_) => "logit_with_dum",
            Self::TwoStageLeastSquares(_) => "ts_lin_reg_with_dum",
            Self::TwoStageFixedEffects(_) => "ts_fix_eff",
        }
    }

    /// Display title.
    pub fn show_name(&self) -> &'static str {
        match self {
            Self::DescriptiveStatistics(_) => "Descriptive Statistics",
            Self::Correlation(_) => "Correlation Coefficient Analysis",
            Self::AbsorbedRegression(_) => "OLS Regression With Dummies",
            Self::FixedEffects(_) => "Linear Fixed Effect Model",
            Self::Probit(_) => "Probit Model With Dummies",
            Self::Logit(_) => "Logit Model With Dummies",
            Self::TwoStageLeastSquares(_) => "Two Stage Linear Regressions With Dummies",
            Self::TwoStageFixedEffects(_) => "Two Stage Fixed Effect Model",
        }
    }

    /// Columns the analysis reads, in request order.
    ///
    /// For the regressions these are the columns checked for being entirely
    /// missing and used for complete-case filtering.
    pub fn required_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        match self {
            Self::DescriptiveStatistics(r) => {
                fields.extend(r.group_list.iter().cloned());
                fields.extend(r.var_list.iter().cloned());
            }
            Self::Correlation(r) => {
                fields.extend(r.group_list.iter().cloned());
                fields.extend(r.var_list.iter().cloned());
            }
            Self::AbsorbedRegression(r) => {
                fields.push(r.y_var.clone());
                fields.extend(r.x_var_list.iter().cloned());
                fields.push(r.absorb_var.clone());
                fields.extend(r.dummies_var_list.iter().cloned());
            }
            Self::FixedEffects(r) => {
                fields.push(r.y_var.clone());
                fields.extend(r.x_var_list.iter().cloned());
                fields.push(r.fix1.clone());
                fields.extend(r.fix2.iter().cloned());
            }
            Self::Probit(r) | Self::Logit(r) => {
                fields.push(r.y_var.clone());
                fields.extend(r.x_var_list.iter().cloned());
                fields.extend(r.dummies_var_list.iter().cloned());
            }
            Self::TwoStageLeastSquares(r) => {
                fields.push(r.y_var.clone());
                fields.extend(r.x_var_list.iter().cloned());
                fields.push(r.first_y.clone());
                fields.extend(r.iv_list.iter().cloned());
                fields.extend(r.dummies_var_list.iter().cloned());
            }
            Self::TwoStageFixedEffects(r) => {
                fields.push(r.y_var.clone());
                fields.extend(r.x_var_list.iter().cloned());
                fields.push(r.first_y.clone());
                fields.extend(r.iv_list.iter().cloned());
                fields.push(r.fix1.clone());
                fields.extend(r.fix2.iter().cloned());
            }
        }
        fields
    }

    /// Parse a request from JSON text.
    pub fn from_json(text: &str) -> Result<Self, AnalysisError> {
        serde_json::from_str(text).map_err(|e| AnalysisError::InvalidRequest(e.to_string()))
    }

    /// Parse a request from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, AnalysisError> {
        toml::from_str(text).map_err(|e| AnalysisError::InvalidRequest(e.to_string()))
    }

    /// Read a request file; `.toml` files are TOML, anything else JSON.
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let text = fs::read_to_string(path)
            .map_err(|e| AnalysisError::InvalidRequest(format!("{}: {e}", path.display())))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&text),
            _ => Self::from_json(&text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_json() {
        let req = AnalysisRequest::from_json(
            r#"{"analysis": "fixed_effects", "file_path": "p.csv", "y_var": "y",
                "x_var_list": ["x1"], "fix1": "firm", "fix2": "year"}"#,
        )
        .unwrap();
        assert_eq!(req.analysis_name(), "lin_fix_eff");
        assert_eq!(req.required_fields(), vec!["y", "x1", "firm", "year"]);
        assert_eq!(req.source().accuracy, 3);
        let AnalysisRequest::FixedEffects(fe) = req else {
            panic!("wrong variant");
        };
        assert!(fe.add_intercept);
    }

    #[test]
    fn test_two_stage_fields_and_alias() {
        let req = AnalysisRequest::from_json(
            r#"{"analysis": "two_stage_least_squares", "file_path": "d.csv",
                "y_var": "y", "x_var_list": ["x1"], "first_y": "x_end",
                "IV_list": ["z1"], "dummies_var_list": ["year"]}"#,
        )
        .unwrap();
        assert_eq!(req.required_fields(), vec!["y", "x1", "x_end", "z1", "year"]);
    }

    #[test]
    fn test_parse_toml_with_filter() {
        let req = AnalysisRequest::from_toml(
            r#"
analysis = "probit"
file_path = "d.csv"
where_string = "year >= 2019"
y_var = "default"
x_var_list = ["leverage"]
"#,
        )
        .unwrap();
        assert_eq!(req.source().where_string.as_deref(), Some("year >= 2019"));
        assert_eq!(req.show_name(), "Probit Model With Dummies");
    }

    #[test]
    fn test_correlation_defaults_to_all_methods() {
        let req = AnalysisRequest::from_json(
            r#"{"analysis": "correlation", "file_path": "d.csv", "var_list": ["a", "b"]}"#,
        )
        .unwrap();
        let AnalysisRequest::Correlation(c) = req else {
            panic!("wrong variant");
        };
        assert_eq!(c.methods, CorrelationMethod::ALL.to_vec());
    }

    #[test]
    fn test_unknown_analysis_is_invalid_request() {
        let json = r#"{"analysis": "tobit", "file_path": "d.csv"}"#;
        let err = AnalysisRequest::from_json(json).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRequest(_)));
    }
}
