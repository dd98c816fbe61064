//! `seismic-fragility` library crate.
//!
//! Nonlinear time-history analysis of shear buildings (Newmark-Beta with
//! Newton-Raphson on a bilinear hysteretic story model) and maximum-likelihood
//! fitting of lognormal fragility curves to exceedance counts.
//!
//! The binary (`frag`) is a thin wrapper around this library so that the
//! integrator and the fitter are testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod dynamics;
pub mod error;
pub mod fit;
pub mod logging;
pub mod math;
pub mod models;
pub mod report;
