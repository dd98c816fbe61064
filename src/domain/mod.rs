//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - analysis configuration enums (`ModelType`, `Parameterization`)
//! - integrator inputs/outputs (`TimeHistoryInput`, `TimeHistoryResult`)
//! - fragility inputs/outputs (`FragilityData`, `FragilityFit`)
//! - structured warnings (`Diagnostic`)

pub mod types;

pub use types::*;
