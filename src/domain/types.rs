//! Shared domain types.
//!
//! These types are intentionally kept plain so they can be:
//!
//! - passed between the integrator, the fitter and the study pipeline
//! - serialized for `--json` output
//! - asserted on directly in tests

use std::str::FromStr;

use clap::ValueEnum;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::dynamics::HystereticState;
use crate::error::AppError;

/// Gravitational acceleration used to convert ground motion from g to m/s².
pub const GRAVITY: f64 = 9.81;

/// Which restoring-force model the integrator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Constant stiffness; `K_eff` is factorized once.
    Linear,
    /// Bilinear degrading hysteresis per story, Newton-Raphson per step.
    Nonlinear,
}

impl ModelType {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelType::Linear => "linear",
            ModelType::Nonlinear => "nonlinear",
        }
    }
}

impl FromStr for ModelType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(ModelType::Linear),
            "nonlinear" => Ok(ModelType::Nonlinear),
            other => Err(AppError::config(format!(
                "model_type must be 'linear' or 'nonlinear' (got '{other}')."
            ))),
        }
    }
}

/// How the fragility likelihood is parameterized during optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Parameterization {
    /// Optimize over `(ln θ, ln β)`; positivity holds by construction.
    LogTransform,
    /// Optimize over `(θ, β)` directly with an infinite-cost barrier at the bounds.
    Direct,
}

/// Category of a recoverable, advisory event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Linear run with `β_K != 0` but no explicit `K_init`; `K` used for damping.
    DampingFallback,
    /// `K_init` off-diagonal does not match the shear-building pattern.
    ShearBuildingMismatch,
    /// Newton-Raphson hit the iteration cap; last iterate accepted.
    NonConvergence,
    /// NaN/Inf or a singular tangent system inside a Newton-Raphson step.
    NumericalDegeneracy,
    /// All-zero or all-total exceedance counts; no fit attempted.
    DegenerateDataset,
    /// The likelihood optimizer did not report success.
    OptimizerFailure,
    /// A study analysis produced a non-finite `max_pidr` and was excluded.
    ExcludedAnalysis,
}

/// A structured warning attached to a result.
///
/// Every diagnostic is also emitted through the `log` facade when it is
/// created, so callers get both an assertable record and a live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Time-step index (integrator) or dataset index, when one applies.
    pub step: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    /// Build a diagnostic and log it at `warn` level.
    pub fn warn(kind: DiagnosticKind, step: Option<usize>, message: impl Into<String>) -> Self {
        let message = message.into();
        match step {
            Some(step) => log::warn!("[{kind:?} @ step {step}] {message}"),
            None => log::warn!("[{kind:?}] {message}"),
        }
        Self {
            kind,
            step,
            message,
        }
    }
}

/// Count diagnostics of a given kind.
pub fn count_kind(diagnostics: &[Diagnostic], kind: DiagnosticKind) -> usize {
    diagnostics.iter().filter(|d| d.kind == kind).count()
}

/// Everything `run_time_history` needs for one analysis.
///
/// The stiffness input is interpreted according to `model_type`, mirroring the
/// usual "K or Fy" calling convention:
///
/// - `Linear`: full stiffness matrix `K` (DOF × DOF)
/// - `Nonlinear`: yield-force vector `Fy` as a DOF × 1 or 1 × DOF matrix
#[derive(Debug, Clone, Copy)]
pub struct TimeHistoryInput<'a> {
    pub model_type: ModelType,
    pub mass: &'a DMatrix<f64>,
    pub stiffness_input: &'a DMatrix<f64>,
    /// Time step of the ground-motion record (s).
    pub dt: f64,
    /// Ground acceleration in g, as a column or row vector.
    pub ground_accel_g: &'a DMatrix<f64>,
    /// Story heights (m), used only to normalize drift.
    pub story_heights: &'a DVector<f64>,
    /// Mass-proportional Rayleigh coefficient.
    pub alpha_m: f64,
    /// Initial-stiffness-proportional Rayleigh coefficient.
    pub beta_k: f64,
    /// Initial stiffness; mandatory for `Nonlinear`, optional damping basis for `Linear`.
    pub k_init: Option<&'a DMatrix<f64>>,
    /// Post-yield stiffness ratio; mandatory for `Nonlinear`.
    pub post_yield_ratio: Option<f64>,
}

/// Output of a single time-history analysis.
#[derive(Debug, Clone)]
pub struct TimeHistoryResult {
    pub model_type: ModelType,
    /// Time vector (s), `time[i] = i * dt`.
    pub time: Vec<f64>,
    /// Relative displacement history (m), `n_steps × DOF`.
    pub disp: DMatrix<f64>,
    /// Relative velocity history (m/s), `n_steps × DOF`.
    pub vel: DMatrix<f64>,
    /// Acceleration history (m/s²), `n_steps × DOF`.
    pub acc: DMatrix<f64>,
    /// Interstory drift history (m), `n_steps × DOF`.
    pub drift: DMatrix<f64>,
    /// Peak absolute interstory drift per story (m).
    pub peak_drift: DVector<f64>,
    /// Peak interstory drift ratio per story.
    pub pidr: DVector<f64>,
    /// Maximum PIDR across stories (NaN if every story is non-numeric).
    pub max_pidr: f64,
    pub diagnostics: Vec<Diagnostic>,
    /// Final hysteretic memory (nonlinear runs only).
    pub story_state: Option<HystereticState>,
}

impl TimeHistoryResult {
    pub fn n_steps(&self) -> usize {
        self.time.len()
    }

    pub fn dof(&self) -> usize {
        self.disp.ncols()
    }

    /// Steps at which Newton-Raphson did not converge.
    pub fn unconverged_steps(&self) -> Vec<usize> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::NonConvergence)
            .filter_map(|d| d.step)
            .collect()
    }
}

/// Exceedance counts observed at discrete intensity-measure levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragilityData {
    pub im_levels: Vec<f64>,
    pub num_exceed: Vec<u32>,
    pub num_trials: Vec<u32>,
}

impl FragilityData {
    pub fn new(im_levels: Vec<f64>, num_exceed: Vec<u32>, num_trials: Vec<u32>) -> Self {
        Self {
            im_levels,
            num_exceed,
            num_trials,
        }
    }

    pub fn len(&self) -> usize {
        self.im_levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.im_levels.is_empty()
    }

    /// Check shape and count invariants. Violations are configuration errors.
    pub fn validate(&self) -> Result<(), AppError> {
        let n = self.im_levels.len();
        if self.num_exceed.len() != n || self.num_trials.len() != n {
            return Err(AppError::config(format!(
                "Input arrays must have the same length (im_levels={}, num_exceed={}, num_trials={}).",
                n,
                self.num_exceed.len(),
                self.num_trials.len()
            )));
        }
        if n == 0 {
            return Err(AppError::config("Fragility dataset is empty."));
        }
        for i in 0..n {
            if !self.im_levels[i].is_finite() {
                return Err(AppError::config(format!(
                    "IM level at index {i} is not finite ({}).",
                    self.im_levels[i]
                )));
            }
            if self.num_trials[i] == 0 {
                return Err(AppError::config(format!(
                    "num_trials must be > 0 (index {i})."
                )));
            }
            if self.num_exceed[i] > self.num_trials[i] {
                return Err(AppError::config(format!(
                    "num_exceed cannot be greater than num_trials (index {i}: {} > {}).",
                    self.num_exceed[i], self.num_trials[i]
                )));
            }
        }
        Ok(())
    }

    /// Empirical exceedance rate per level.
    pub fn empirical_rates(&self) -> Vec<f64> {
        self.num_exceed
            .iter()
            .zip(self.num_trials.iter())
            .map(|(&k, &n)| k as f64 / n as f64)
            .collect()
    }

    pub fn all_zero(&self) -> bool {
        self.num_exceed.iter().all(|&k| k == 0)
    }

    pub fn all_exceeded(&self) -> bool {
        self.num_exceed
            .iter()
            .zip(self.num_trials.iter())
            .all(|(&k, &n)| k == n)
    }
}

/// Optimizer details retained alongside the fitted parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitDiagnostics {
    /// Solver termination message (or the reason no fit was attempted).
    pub message: String,
    pub iterations: u64,
    /// Negative log-likelihood at the returned estimate (NaN when unavailable).
    pub neg_log_likelihood: f64,
    pub initial_theta: f64,
    pub initial_beta: f64,
    pub parameterization: Parameterization,
    pub warnings: Vec<Diagnostic>,
}

/// Lognormal fragility parameters.
///
/// When `success` is false both parameters are NaN; callers must check the
/// flag before trusting `theta` / `beta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragilityFit {
    /// Median capacity θ.
    pub theta: f64,
    /// Logarithmic standard deviation β.
    pub beta: f64,
    pub success: bool,
    pub diagnostics: FitDiagnostics,
}

impl FragilityFit {
    /// NaN-sentinel result.
    pub fn failed(diagnostics: FitDiagnostics) -> Self {
        Self {
            theta: f64::NAN,
            beta: f64::NAN,
            success: false,
            diagnostics,
        }
    }

    /// Probability of exceedance at `im` under the fitted curve.
    pub fn probability(&self, im: f64) -> f64 {
        if !self.success {
            return f64::NAN;
        }
        crate::models::exceedance_probability(im, self.theta, self.beta)
    }
}

/// Per-level outcome of a study.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelSummary {
    pub im: f64,
    pub num_exceed: u32,
    pub num_trials: u32,
    /// Analyses excluded because their `max_pidr` was not finite.
    pub excluded: u32,
    pub max_pidr: Vec<f64>,
}

/// Structural model used by the study pipeline and the `frag` binary.
#[derive(Debug, Clone)]
pub struct StructuralModel {
    pub mass: DMatrix<f64>,
    /// Initial (elastic) stiffness; also `K` for linear runs.
    pub k_init: DMatrix<f64>,
    pub yield_forces: DVector<f64>,
    pub post_yield_ratio: f64,
    pub story_heights: DVector<f64>,
    pub alpha_m: f64,
    pub beta_k: f64,
}

impl StructuralModel {
    pub fn dof(&self) -> usize {
        self.mass.nrows()
    }
}

/// A full study's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct StudyConfig {
    pub model_type: ModelType,
    pub model: StructuralModel,
    /// IM levels (PGA in g) to sweep.
    pub im_levels: Vec<f64>,
    pub records_per_level: usize,
    /// Damage-state drift-ratio threshold compared against `max_pidr`.
    pub drift_threshold: f64,
    pub seed: u64,
    pub record: crate::data::RecordSpec,
    pub integrator: crate::dynamics::IntegratorOptions,
    pub fit: crate::fit::FitOptions,
}
