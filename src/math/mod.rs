//! Mathematical utilities: normal CDF, shear-building matrices, dense solves.

pub mod normal;
pub mod shear;
pub mod solve;

pub use normal::*;
pub use shear::*;
pub use solve::*;
