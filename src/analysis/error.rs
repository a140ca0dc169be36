//! Analysis failures and their caller-facing reason codes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{DataError, FilterError};
use crate::report::ReportError;
use crate::solvers::RegressionError;

/// Anything that can stop an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("invalid filter expression: {0}")]
    Filter(#[from] FilterError),

    #[error("estimation failed: {0}")]
    Regression(#[from] RegressionError),

    #[error("no rows left after filtering")]
    EmptyDataset,

    #[error("column '{0}' has no non-missing values")]
    NullColumn(String),

    #[error("grouping column '{0}' has no non-missing values")]
    NullGroupColumn(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to write results: {0}")]
    Output(#[from] ReportError),

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Stable failure categories reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    ReadFileFail,
    DatasetCanNotBeEmpty,
    ColumnCanNotBeNull,
    GroupVarCanNotBeNull,
    DatasetMustBeFullRank,
    PerfectSeparation,
    EigenvaluesDidNotConverge,
    CanNotMakeResultFile,
    AnalyseError,
}

impl FailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadFileFail => "READ_FILE_FAIL",
            Self::DatasetCanNotBeEmpty => "DATASET_CAN_NOT_BE_EMPTY",
            Self::ColumnCanNotBeNull => "COLUMN_CAN_NOT_BE_NULL",
            Self::GroupVarCanNotBeNull => "GROUP_VAR_CAN_NOT_BE_NULL",
            Self::DatasetMustBeFullRank => "DATASET_MUST_BE_FULL_RANK",
            Self::PerfectSeparation => "PERFECT_SEPARATION",
            Self::EigenvaluesDidNotConverge => "EIGENVALUES_DID_NOT_CONVERGE",
            Self::CanNotMakeResultFile => "CAN_NOT_MAKE_RESULT_FILE",
            Self::AnalyseError => "ANALYSE_ERROR",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::ReadFileFail => "The data file does not exist or could not be read.",
            Self::DatasetCanNotBeEmpty => "No rows match the filter condition.",
            Self::ColumnCanNotBeNull => "A selected column has no values.",
            Self::GroupVarCanNotBeNull => "A grouping column has no values.",
            Self::DatasetMustBeFullRank => "The data must be of full rank.",
            Self::PerfectSeparation => "The outcome is perfectly separated by the regressors.",
            Self::EigenvaluesDidNotConverge => "Eigenvalues did not converge.",
            Self::CanNotMakeResultFile => "The result file could not be written.",
            Self::AnalyseError => "The analysis failed.",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl AnalysisError {
    /// Category reported to the caller.
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Data(DataError::FileNotFound(_) | DataError::Csv { .. }) => {
                FailureReason::ReadFileFail
            }
            Self::Data(_) | Self::Filter(_) | Self::InvalidRequest(_) => {
                FailureReason::AnalyseError
            }
            Self::EmptyDataset => FailureReason::DatasetCanNotBeEmpty,
            Self::NullColumn(_) => FailureReason::ColumnCanNotBeNull,
            Self::NullGroupColumn(_) => FailureReason::GroupVarCanNotBeNull,
            Self::Regression(e) => regression_reason(e),
            Self::Output(_) | Self::OutputDir { .. } => FailureReason::CanNotMakeResultFile,
        }
    }
}

fn regression_reason(error: &RegressionError) -> FailureReason {
    match error {
        RegressionError::RankDeficient { .. }
        | RegressionError::SingularMatrix
        | RegressionError::Underidentified { .. }
        | RegressionError::AbsorbedRegressors { .. }
        | RegressionError::InsufficientObservations { .. }
        | RegressionError::OutcomeOutOfRange { .. }
        | RegressionError::DimensionMismatch { .. } => FailureReason::DatasetMustBeFullRank,
        RegressionError::PerfectSeparation { .. } => FailureReason::PerfectSeparation,
        RegressionError::DecompositionFailed(_) => FailureReason::EigenvaluesDidNotConverge,
        RegressionError::NumericalError(_) => FailureReason::AnalyseError,
    }
}
