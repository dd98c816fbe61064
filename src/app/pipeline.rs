//! Shared study pipeline used by the `frag` subcommands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! synthetic records -> IM scaling -> time histories -> exceedance counts -> MLE fit
//!
//! The CLI handlers can then focus on presentation (text vs JSON).

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::Serialize;

use crate::data::{scale_to_pga, synthetic_record};
use crate::domain::{
    Diagnostic, DiagnosticKind, FragilityData, FragilityFit, LevelSummary, ModelType,
    StructuralModel, StudyConfig, TimeHistoryInput, TimeHistoryResult,
};
use crate::dynamics::{IntegratorOptions, run_time_history_with};
use crate::error::AppError;
use crate::fit::{exceedance_counts, fit_fragility_curve_with};

/// All computed outputs of a single `frag study` run.
#[derive(Debug, Clone, Serialize)]
pub struct StudyOutput {
    pub levels: Vec<LevelSummary>,
    pub fit: FragilityFit,
    /// Total Newton-Raphson non-convergence events over all analyses.
    pub unconverged_steps: usize,
    pub warnings: Vec<Diagnostic>,
}

/// Run one ground-motion record (in g) through the structural model.
pub fn run_record(
    model: &StructuralModel,
    model_type: ModelType,
    record_g: &[f64],
    dt: f64,
    opts: &IntegratorOptions,
) -> Result<TimeHistoryResult, AppError> {
    let ag = DMatrix::from_column_slice(record_g.len(), 1, record_g);
    let fy = DMatrix::from_column_slice(model.yield_forces.len(), 1, model.yield_forces.as_slice());
    let stiffness_input = match model_type {
        ModelType::Linear => &model.k_init,
        ModelType::Nonlinear => &fy,
    };
    let input = TimeHistoryInput {
        model_type,
        mass: &model.mass,
        stiffness_input,
        dt,
        ground_accel_g: &ag,
        story_heights: &model.story_heights,
        alpha_m: model.alpha_m,
        beta_k: model.beta_k,
        k_init: Some(&model.k_init),
        post_yield_ratio: Some(model.post_yield_ratio),
    };
    run_time_history_with(&input, opts)
}

/// Execute the full study and return the computed outputs.
pub fn run_study(config: &StudyConfig) -> Result<StudyOutput, AppError> {
    validate_study(config)?;

    // 1) Generate the record suite once; every IM level reuses the same shapes.
    let records = (0..config.records_per_level)
        .map(|r| synthetic_record(&config.record, config.seed.wrapping_add(r as u64)))
        .collect::<Result<Vec<_>, _>>()?;

    // 2) Run every (level, record) analysis in parallel. Results come back in
    //    job order, so the output is deterministic for a given seed.
    let jobs: Vec<(usize, usize)> = (0..config.im_levels.len())
        .flat_map(|l| (0..records.len()).map(move |r| (l, r)))
        .collect();

    let outcomes = jobs
        .par_iter()
        .map(|&(l, r)| {
            let scaled = scale_to_pga(&records[r], config.im_levels[l])?;
            let res = run_record(
                &config.model,
                config.model_type,
                &scaled,
                config.record.dt,
                &config.integrator,
            )?;
            Ok((res.max_pidr, res.unconverged_steps().len()))
        })
        .collect::<Result<Vec<(f64, usize)>, AppError>>()?;

    // 3) Threshold into exceedance counts per level.
    let mut warnings = Vec::new();
    let mut levels = Vec::with_capacity(config.im_levels.len());
    let unconverged_steps = outcomes.iter().map(|&(_, n)| n).sum();
    for (l, chunk) in outcomes.chunks(records.len()).enumerate() {
        let max_pidr: Vec<f64> = chunk.iter().map(|&(m, _)| m).collect();
        let counts = exceedance_counts(&max_pidr, config.drift_threshold);
        if counts.excluded > 0 {
            warnings.push(Diagnostic::warn(
                DiagnosticKind::ExcludedAnalysis,
                Some(l),
                format!(
                    "{} of {} analyses at IM {:.4} produced a non-finite max PIDR and were excluded.",
                    counts.excluded,
                    max_pidr.len(),
                    config.im_levels[l]
                ),
            ));
        }
        levels.push(LevelSummary {
            im: config.im_levels[l],
            num_exceed: counts.num_exceed,
            num_trials: counts.num_trials,
            excluded: counts.excluded,
            max_pidr,
        });
    }

    // 4) Fit on the levels that kept at least one analysis.
    let usable: Vec<&LevelSummary> = levels.iter().filter(|l| l.num_trials > 0).collect();
    if usable.is_empty() {
        return Err(AppError::insufficient_data(
            "Every analysis was excluded; no exceedance data to fit.",
        ));
    }
    let data = FragilityData::new(
        usable.iter().map(|l| l.im).collect(),
        usable.iter().map(|l| l.num_exceed).collect(),
        usable.iter().map(|l| l.num_trials).collect(),
    );
    let fit = fit_fragility_curve_with(&data, &config.fit)?;

    Ok(StudyOutput {
        levels,
        fit,
        unconverged_steps,
        warnings,
    })
}

fn validate_study(config: &StudyConfig) -> Result<(), AppError> {
    if config.im_levels.is_empty() {
        return Err(AppError::config("At least one IM level is required."));
    }
    if let Some(x) = config
        .im_levels
        .iter()
        .find(|x| !(x.is_finite() && **x >= 0.0))
    {
        return Err(AppError::config(format!(
            "IM levels must be finite and >= 0 (got {x})."
        )));
    }
    if config.records_per_level == 0 {
        return Err(AppError::config("records_per_level must be > 0."));
    }
    if !(config.drift_threshold.is_finite() && config.drift_threshold > 0.0) {
        return Err(AppError::config(format!(
            "Drift threshold must be finite and > 0 (got {}).",
            config.drift_threshold
        )));
    }
    Ok(())
}
