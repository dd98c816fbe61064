//! Command-line parsing for the `frag` seismic fragility tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the dynamics/fitting code. Vector-valued options take
//! comma-separated lists (`--masses 2e5,2e5,1.5e5`).

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{ModelType, Parameterization};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "frag", version, about = "Seismic time-history analysis and fragility fitting")]
pub struct Cli {
    /// Print machine-readable JSON instead of the text report.
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one time history of a synthetic (or sine) record scaled to a PGA.
    Run(RunArgs),
    /// Fit a lognormal fragility curve to exceedance counts.
    Fit(FitArgs),
    /// Sweep IM levels over a synthetic record suite and fit the resulting counts.
    Study(StudyArgs),
}

/// Shear-building definition shared by `run` and `study`.
///
/// Defaults describe a three-story frame with a fundamental period of
/// roughly half a second and a base-shear yield coefficient near 0.3.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Restoring-force model.
    #[arg(long, value_enum, default_value_t = ModelType::Nonlinear)]
    pub model_type: ModelType,

    /// Floor masses (kg), bottom to top.
    #[arg(long, value_delimiter = ',', default_value = "2.0e5,2.0e5,1.5e5")]
    pub masses: Vec<f64>,

    /// Story stiffnesses (N/m), bottom to top.
    #[arg(long, value_delimiter = ',', default_value = "1.2e8,1.0e8,0.7e8")]
    pub story_k: Vec<f64>,

    /// Story yield forces (N), bottom to top.
    #[arg(long, value_delimiter = ',', default_value = "1.6e6,1.4e6,1.0e6")]
    pub yield_forces: Vec<f64>,

    /// Story heights (m), bottom to top.
    #[arg(long, value_delimiter = ',', default_value = "4.0,3.5,3.5")]
    pub heights: Vec<f64>,

    /// Post-yield stiffness ratio α.
    #[arg(long, default_value_t = 0.05)]
    pub post_yield_ratio: f64,

    /// Mass-proportional Rayleigh coefficient.
    #[arg(long, default_value_t = 0.5)]
    pub alpha_m: f64,

    /// Stiffness-proportional Rayleigh coefficient.
    #[arg(long, default_value_t = 0.004)]
    pub beta_k: f64,

    /// Newton-Raphson residual tolerance (N).
    #[arg(long, default_value_t = 1e-5)]
    pub tolerance: f64,

    /// Newton-Raphson iteration cap per step.
    #[arg(long, default_value_t = 50)]
    pub max_iterations: usize,
}

/// Synthetic record options.
#[derive(Debug, Args, Clone)]
pub struct RecordArgs {
    /// Time step (s).
    #[arg(long, default_value_t = 0.01)]
    pub dt: f64,

    /// Record duration (s).
    #[arg(long, default_value_t = 20.0)]
    pub duration: f64,

    /// Random seed for record generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Likelihood optimizer options.
#[derive(Debug, Args, Clone)]
pub struct OptimizerArgs {
    /// Search space for (θ, β).
    #[arg(long, value_enum, default_value_t = Parameterization::LogTransform)]
    pub parameterization: Parameterization,

    /// Nelder-Mead iteration cap.
    #[arg(long, default_value_t = 2000)]
    pub max_iters: u64,

    /// Starting β.
    #[arg(long, default_value_t = 0.5)]
    pub initial_beta: f64,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub record: RecordArgs,

    /// Target PGA (g).
    #[arg(long, default_value_t = 0.3)]
    pub pga: f64,

    /// Use a sine record with this period (s) instead of a synthetic record.
    #[arg(long)]
    pub sine_period: Option<f64>,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// IM levels.
    #[arg(long, value_delimiter = ',', required = true)]
    pub im: Vec<f64>,

    /// Exceedance counts per level.
    #[arg(long, value_delimiter = ',', required = true)]
    pub exceed: Vec<u32>,

    /// Trial counts per level.
    #[arg(long, value_delimiter = ',', required = true)]
    pub trials: Vec<u32>,

    #[command(flatten)]
    pub optimizer: OptimizerArgs,
}

#[derive(Debug, Args, Clone)]
pub struct StudyArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub record: RecordArgs,

    #[command(flatten)]
    pub optimizer: OptimizerArgs,

    /// IM levels (PGA in g) to sweep.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "0.1,0.2,0.3,0.4,0.5,0.6,0.8,1.0,1.2,1.5"
    )]
    pub im_levels: Vec<f64>,

    /// Records per IM level.
    #[arg(long, default_value_t = 10)]
    pub records: usize,

    /// Damage-state drift-ratio threshold on max PIDR.
    #[arg(long, default_value_t = 0.01)]
    pub threshold: f64,
}
