//! Turning analysis outcomes into exceedance counts.

use serde::Serialize;

/// Outcome of thresholding one IM level's `max_pidr` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExceedanceCount {
    pub num_exceed: u32,
    /// Analyses with a finite `max_pidr`.
    pub num_trials: u32,
    /// Analyses dropped because `max_pidr` was NaN or infinite.
    pub excluded: u32,
}

/// Count `max_pidr ≥ threshold`, excluding non-finite responses from the trials.
pub fn exceedance_counts(max_pidr: &[f64], threshold: f64) -> ExceedanceCount {
    let mut count = ExceedanceCount {
        num_exceed: 0,
        num_trials: 0,
        excluded: 0,
    };
    for &x in max_pidr {
        if !x.is_finite() {
            count.excluded += 1;
            continue;
        }
        count.num_trials += 1;
        if x >= threshold {
            count.num_exceed += 1;
        }
    }
    count
}
