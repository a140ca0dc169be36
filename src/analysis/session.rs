//! One analysis run, from request to result files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::{error, info};
use serde::{Deserialize, Serialize};

use super::correlation::correlate;
use super::descriptive::describe;
use super::error::{AnalysisError, FailureReason};
use super::output::OutputLocation;
use super::prepare::{load_filtered, prepare};
use super::regression::{
    absorbed_regression, binary_regression, fixed_effects, two_stage, two_stage_fixed_effects,
};
use super::request::AnalysisRequest;
use crate::config::Config;
use crate::core::BinomialLink;
use crate::report::{write_summary_csv, ModelSummary, Table};

/// Files produced by a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutput {
    /// Summary CSV.
    pub out_file: PathBuf,
    pub out_file_name: String,
    /// Sub-result files by label.
    pub files: BTreeMap<String, PathBuf>,
    /// Rendered model summary, for regressions.
    pub res_html_table: Option<String>,
}

/// Caller-facing result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Success {
        analysis: String,
        #[serde(flatten)]
        output: SessionOutput,
    },
    Failure {
        analysis: String,
        code: FailureReason,
        message: String,
        detail: String,
    },
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure category, if the run failed.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { code, .. } => Some(*code),
        }
    }
}

/// A request bound to a configuration.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    request: AnalysisRequest,
    config: Config,
}

impl AnalysisSession {
    pub fn new(request: AnalysisRequest, config: Config) -> Self {
        Self { request, config }
    }

    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    /// Run the analysis and write its result files.
    pub fn run(&self) -> Result<SessionOutput, AnalysisError> {
        let name = self.request.analysis_name();
        let show_name = self.request.show_name();
        let location = OutputLocation::create(&self.config.output.root_dir, name)?;
        info!(
            "running {} on {} (output prefix {})",
            name,
            self.request.source().file_path.display(),
            location.prefix
        );

        let estimation = &self.config.estimation;
        let fields = self.request.required_fields();
        match &self.request {
            AnalysisRequest::DescriptiveStatistics(r) => {
                let dataset = load_filtered(&r.source)?;
                let tables = describe(r, &dataset, show_name)?;
                write_tables(&location, tables, r.source.accuracy, show_name)
            }
            AnalysisRequest::Correlation(r) => {
                let dataset = load_filtered(&r.source)?;
                let tables = correlate(r, &dataset)?;
                write_tables(&location, tables, r.source.accuracy, show_name)
            }
            AnalysisRequest::AbsorbedRegression(r) => {
                let prepared = prepare(&r.source, &fields)?;
                write_model(&location, absorbed_regression(r, prepared.dataset, estimation)?)
            }
            AnalysisRequest::FixedEffects(r) => {
                let prepared = prepare(&r.source, &fields)?;
                write_model(&location, fixed_effects(r, prepared.dataset, estimation)?)
            }
            AnalysisRequest::Probit(r) => {
                let prepared = prepare(&r.source, &fields)?;
                write_model(
                    &location,
                    binary_regression(r, BinomialLink::Probit, prepared.dataset, estimation)?,
                )
            }
            AnalysisRequest::Logit(r) => {
                let prepared = prepare(&r.source, &fields)?;
                write_model(
                    &location,
                    binary_regression(r, BinomialLink::Logit, prepared.dataset, estimation)?,
                )
            }
            AnalysisRequest::TwoStageLeastSquares(r) => {
                let prepared = prepare(&r.source, &fields)?;
                write_model(&location, two_stage(r, prepared.dataset, estimation)?)
            }
            AnalysisRequest::TwoStageFixedEffects(r) => {
                let prepared = prepare(&r.source, &fields)?;
                write_model(&location, two_stage_fixed_effects(r, prepared.dataset, estimation)?)
            }
        }
    }

    /// Run and classify the result. Failures are logged.
    pub fn outcome(&self) -> AnalysisOutcome {
        let analysis = self.request.analysis_name().to_string();
        match self.run() {
            Ok(output) => {
                info!("{} finished, results in {}", analysis, output.out_file.display());
                AnalysisOutcome::Success { analysis, output }
            }
            Err(e) => {
                let code = e.reason();
                error!("{} failed ({}): {}", analysis, code, e);
                AnalysisOutcome::Failure {
                    analysis,
                    code,
                    message: code.message().to_string(),
                    detail: e.to_string(),
                }
            }
        }
    }
}

/// Run a request with the given configuration.
pub fn run_analysis(request: AnalysisRequest, config: Config) -> AnalysisOutcome {
    AnalysisSession::new(request, config).outcome()
}

/// Sub-result CSVs first, then the summary CSV.
fn write_tables(
    location: &OutputLocation,
    mut tables: Vec<Table>,
    accuracy: usize,
    show_name: &str,
) -> Result<SessionOutput, AnalysisError> {
    let mut files = BTreeMap::new();
    for table in &mut tables {
        table.round(accuracy);
        let path = location.sub_file(&table.label);
        table.write_csv(&path)?;
        files.insert(table.label.clone(), path);
    }
    let out_file = location.out_file();
    write_summary_csv(&out_file, &tables, show_name)?;
    Ok(SessionOutput {
        out_file,
        out_file_name: location.file_name(),
        files,
        res_html_table: None,
    })
}

fn write_model(
    location: &OutputLocation,
    summary: ModelSummary,
) -> Result<SessionOutput, AnalysisError> {
    let html = summary.as_html();
    let html_file = location.html_file();
    summary.write_html(&html_file)?;
    let out_file = location.out_file();
    summary.write_csv(&out_file)?;
    Ok(SessionOutput {
        out_file,
        out_file_name: location.file_name(),
        files: BTreeMap::from([("res_html_table".to_string(), html_file)]),
        res_html_table: Some(html),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::request::{DataSource, DescriptiveRequest};

    fn config(root: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.output.root_dir = root.to_path_buf();
        config
    }

    #[test]
    fn test_missing_file_outcome() {
        let root = tempfile::tempdir().unwrap();
        let request = AnalysisRequest::DescriptiveStatistics(DescriptiveRequest {
            source: DataSource::new(root.path().join("missing.csv")),
            var_list: vec![],
            group_list: vec![],
        });
        let outcome = run_analysis(request, config(root.path()));
        assert_eq!(outcome.failure_reason(), Some(FailureReason::ReadFileFail));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["code"], "READ_FILE_FAIL");
    }

    #[test]
    fn test_descriptive_writes_files() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("data.csv");
        std::fs::write(&data, "a,b\n1,2\n2,4\n3,7\n").unwrap();
        let request = AnalysisRequest::DescriptiveStatistics(DescriptiveRequest {
            source: DataSource::new(&data),
            var_list: vec!["a".into(), "b".into()],
            group_list: vec![],
        });
        let output = AnalysisSession::new(request, config(root.path())).run().unwrap();
        assert!(output.out_file.exists());
        assert!(output.out_file_name.ends_with("_ts_stat.csv"));
        assert_eq!(output.files.len(), 1);
        let text = std::fs::read_to_string(&output.out_file).unwrap();
        assert!(text.starts_with("Parameters,count,mean,std"));
        assert!(text.contains("a,3,2,1,1,1.5,2,2.5,3,0"));
    }
}
