//! Synthetic inputs: ground-motion records and exceedance counts.

pub mod ground_motion;
pub mod synthetic;

pub use ground_motion::*;
pub use synthetic::*;
