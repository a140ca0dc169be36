//! Core types for regression analysis.

mod link;
mod na_action;
mod result;

pub use link::{BinomialLink, NewtonTerms};
pub use na_action::NaInfo;
pub use result::RegressionResult;
