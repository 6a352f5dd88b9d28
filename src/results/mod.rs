//! Result Extractor
//!
//! Turns a finished solve into per-component time series. Solver outcomes
//! are read only through [`crate::optimizer::SolveOutcome`]; anything
//! unusable becomes a failed [`DispatchResult`] instead of an error.

pub mod extract;
pub mod series;

pub use extract::ResultExtractor;
pub use series::{
    BalanceResidual, BusSlackSeries, ComponentSeries, DispatchResult, ResultStatus, ResultSummary,
};
