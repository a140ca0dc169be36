//! Estimators and the numerical kernels they share.

mod binomial;
mod iv;
mod least_squares;
mod panel;
mod traits;
mod within;

pub use binomial::{BinomialRegressor, BinomialRegressorBuilder, FittedBinomial};
pub use iv::{FittedIv, TwoStageLeastSquares, TwoStageLeastSquaresBuilder};
pub use least_squares::{
    cholesky, cholesky_inverse, cholesky_solve, cross_product, cross_product_vec, detect_aliased,
    expand_active, invert_spd, least_squares, mat_mul, mat_vec, select_block, select_columns,
    select_rows, with_intercept_column, LeastSquares, DEFAULT_RANK_TOLERANCE,
};
pub use panel::{FittedPanel, PanelIndex, PanelRegressor, PanelRegressorBuilder};
pub use traits::{FittedRegressor, RegressionError, Regressor};
pub use within::{demean, demean_by_cells, demean_col, demean_matrix, DemeanOptions, GroupIndex};
