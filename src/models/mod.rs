//! Closed-form model evaluation.
//!
//! Models are implemented as small, pure functions so that fitting and
//! reporting code can stay generic.

pub mod fragility;

pub use fragility::*;
