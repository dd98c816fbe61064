//! Structural time-history analysis.
//!
//! Layout:
//!
//! - `newmark`: integration constants and state updates
//! - `hysteresis`: bilinear story force model with explicit committed state
//! - `drift`: drift history and PIDR post-processing
//! - `integrator`: the linear / nonlinear time loops

pub mod drift;
pub mod hysteresis;
pub mod integrator;
pub mod newmark;

pub use drift::*;
pub use hysteresis::*;
pub use integrator::*;
pub use newmark::*;
