//! Reporting: serializable summaries and formatted terminal output.

use serde::Serialize;

use crate::domain::{
    Diagnostic, FragilityData, FragilityFit, ModelType, TimeHistoryResult,
};
use crate::dynamics::HystereticState;

pub mod format;

pub use format::*;

/// Compact view of a time-history result (the full histories are not printed).
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub model_type: ModelType,
    pub n_steps: usize,
    pub duration: f64,
    pub pga_g: f64,
    pub peak_drift: Vec<f64>,
    pub pidr: Vec<f64>,
    pub max_pidr: f64,
    pub unconverged_steps: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
    pub story_state: Option<HystereticState>,
}

impl RunReport {
    pub fn new(res: &TimeHistoryResult, pga_g: f64) -> Self {
        Self {
            model_type: res.model_type,
            n_steps: res.n_steps(),
            duration: res.time.last().copied().unwrap_or(0.0),
            pga_g,
            peak_drift: res.peak_drift.iter().copied().collect(),
            pidr: res.pidr.iter().copied().collect(),
            max_pidr: res.max_pidr,
            unconverged_steps: res.unconverged_steps(),
            diagnostics: res.diagnostics.clone(),
            story_state: res.story_state.clone(),
        }
    }
}

/// Observed vs fitted exceedance at one IM level.
#[derive(Debug, Clone, Serialize)]
pub struct LevelComparison {
    pub im: f64,
    pub num_exceed: u32,
    pub num_trials: u32,
    pub empirical: f64,
    /// NaN when the fit failed.
    pub fitted: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    pub fit: FragilityFit,
    pub levels: Vec<LevelComparison>,
}

impl FitReport {
    pub fn new(data: &FragilityData, fit: &FragilityFit) -> Self {
        let levels = (0..data.len())
            .map(|i| {
                let im = data.im_levels[i];
                LevelComparison {
                    im,
                    num_exceed: data.num_exceed[i],
                    num_trials: data.num_trials[i],
                    empirical: data.num_exceed[i] as f64 / data.num_trials[i] as f64,
                    fitted: fit.probability(im),
                }
            })
            .collect();
        Self {
            fit: fit.clone(),
            levels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fit_fragility_curve;

    #[test]
    fn fit_report_compares_levels() {
        let data = FragilityData::new(vec![0.2, 0.4, 0.8], vec![1, 5, 9], vec![10, 10, 10]);
        let fit = fit_fragility_curve(&data.im_levels, &data.num_exceed, &data.num_trials).unwrap();
        let report = FitReport::new(&data, &fit);
        assert_eq!(report.levels.len(), 3);
        assert!((report.levels[1].empirical - 0.5).abs() < 1e-15);
        assert!(report.levels[0].fitted < report.levels[2].fitted);
    }
}
