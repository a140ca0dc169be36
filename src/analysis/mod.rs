//! Request-driven analyses over CSV files.
//!
//! A run loads and filters the data, checks and selects the requested
//! fields, builds the design for the requested model, fits it and writes the
//! result files under a per-analysis, per-date directory.

mod correlation;
mod descriptive;
mod design;
mod error;
mod output;
mod prepare;
mod regression;
mod request;
mod session;

pub use correlation::{
    average_ranks, correlate, correlation, correlation_matrix, kendall_tau_b, pearson, spearman,
};
pub use descriptive::{describe, describe_values, quantile_sorted, STAT_COLUMNS};
pub use design::{
    demean_iv_design, group_index, iv_design, linear_design, numeric_matrix, panel_index, IvDesign,
    LinearDesign, INTERCEPT,
};
pub use error::{AnalysisError, FailureReason};
pub use output::OutputLocation;
pub use prepare::{
    check_columns_not_null, check_groups_not_null, group_rows, load_filtered, numeric_column_names,
    prepare, unique_fields, PreparedData,
};
pub use regression::{
    absorbed_regression, binary_regression, fixed_effects, two_stage, two_stage_fixed_effects,
};
pub use request::{
    AbsorbedRequest, AnalysisRequest, BinaryRequest, CorrelationMethod, CorrelationRequest,
    DataSource, DescriptiveRequest, FixedEffectsRequest, TwoStageFixedEffectsRequest,
    TwoStageRequest,
};
pub use session::{run_analysis, AnalysisOutcome, AnalysisSession, SessionOutput};
