//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs the logger
//! - turns flags into model / study configuration
//! - runs the requested analysis
//! - prints the text report or JSON

use clap::Parser;
use nalgebra::DVector;
use serde::Serialize;

use crate::cli::{Cli, Command, FitArgs, ModelArgs, OptimizerArgs, RecordArgs, RunArgs, StudyArgs};
use crate::data::{RecordSpec, scale_to_pga, sine_record, synthetic_record};
use crate::domain::{FragilityData, StructuralModel, StudyConfig};
use crate::dynamics::IntegratorOptions;
use crate::error::AppError;
use crate::fit::{FitOptions, fit_fragility_curve_with};
use crate::math::{assemble_stiffness, lumped_mass};
use crate::report::{FitReport, RunReport};

pub mod pipeline;

/// Entry point for the `frag` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(&args, cli.json),
        Command::Fit(args) => handle_fit(&args, cli.json),
        Command::Study(args) => handle_study(&args, cli.json),
    }
}

fn handle_run(args: &RunArgs, json: bool) -> Result<(), AppError> {
    let model = structural_model_from_args(&args.model)?;
    let spec = record_spec_from_args(&args.record);

    let record = match args.sine_period {
        Some(period) => sine_record(spec.dt, spec.duration, period, args.pga),
        None => scale_to_pga(&synthetic_record(&spec, args.record.seed)?, args.pga)?,
    };

    let res = pipeline::run_record(
        &model,
        args.model.model_type,
        &record,
        spec.dt,
        &integrator_options_from_args(&args.model),
    )?;
    let report = RunReport::new(&res, args.pga);

    if json {
        print_json(&report)
    } else {
        println!("{}", crate::report::format_run(&report));
        Ok(())
    }
}

fn handle_fit(args: &FitArgs, json: bool) -> Result<(), AppError> {
    let data = FragilityData::new(args.im.clone(), args.exceed.clone(), args.trials.clone());
    let fit = fit_fragility_curve_with(&data, &fit_options_from_args(&args.optimizer))?;
    let report = FitReport::new(&data, &fit);

    if json {
        print_json(&report)
    } else {
        println!("{}", crate::report::format_fit(&report));
        Ok(())
    }
}

fn handle_study(args: &StudyArgs, json: bool) -> Result<(), AppError> {
    let config = study_config_from_args(args)?;
    let out = pipeline::run_study(&config)?;

    if json {
        print_json(&out)
    } else {
        println!("{}", crate::report::format_study(&out, config.drift_threshold));
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(1, format!("JSON serialization failed: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Build the shear-building model described by the CLI flags.
pub fn structural_model_from_args(args: &ModelArgs) -> Result<StructuralModel, AppError> {
    let n = args.masses.len();
    if n == 0 {
        return Err(AppError::config("At least one floor mass is required."));
    }
    for (name, len) in [
        ("story-k", args.story_k.len()),
        ("yield-forces", args.yield_forces.len()),
        ("heights", args.heights.len()),
    ] {
        if len != n {
            return Err(AppError::config(format!(
                "--{name} has {len} values but --masses has {n}."
            )));
        }
    }
    for (name, values) in [("masses", &args.masses), ("story-k", &args.story_k)] {
        if let Some(x) = values.iter().find(|x| !(x.is_finite() && **x > 0.0)) {
            return Err(AppError::config(format!(
                "--{name} values must be finite and > 0 (got {x})."
            )));
        }
    }

    Ok(StructuralModel {
        mass: lumped_mass(&args.masses),
        k_init: assemble_stiffness(&args.story_k),
        yield_forces: DVector::from_column_slice(&args.yield_forces),
        post_yield_ratio: args.post_yield_ratio,
        story_heights: DVector::from_column_slice(&args.heights),
        alpha_m: args.alpha_m,
        beta_k: args.beta_k,
    })
}

pub fn integrator_options_from_args(args: &ModelArgs) -> IntegratorOptions {
    IntegratorOptions {
        tolerance: args.tolerance,
        max_iterations: args.max_iterations,
    }
}

pub fn record_spec_from_args(args: &RecordArgs) -> RecordSpec {
    RecordSpec {
        dt: args.dt,
        duration: args.duration,
        ..RecordSpec::default()
    }
}

pub fn fit_options_from_args(args: &OptimizerArgs) -> FitOptions {
    FitOptions {
        parameterization: args.parameterization,
        max_iters: args.max_iters,
        initial_beta: args.initial_beta,
        ..FitOptions::default()
    }
}

pub fn study_config_from_args(args: &StudyArgs) -> Result<StudyConfig, AppError> {
    Ok(StudyConfig {
        model_type: args.model.model_type,
        model: structural_model_from_args(&args.model)?,
        im_levels: args.im_levels.clone(),
        records_per_level: args.records,
        drift_threshold: args.threshold,
        seed: args.record.seed,
        record: record_spec_from_args(&args.record),
        integrator: integrator_options_from_args(&args.model),
        fit: fit_options_from_args(&args.optimizer),
    })
}
