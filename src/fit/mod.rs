//! Fragility curve fitting.
//!
//! Responsibilities:
//!
//! - threshold analysis results into exceedance counts
//! - pick a starting point from the empirical rates
//! - maximize the binomial likelihood of a lognormal curve

pub mod counts;
pub mod fitter;
pub mod initial;
pub mod likelihood;

pub use counts::*;
pub use fitter::*;
pub use initial::*;
pub use likelihood::*;
