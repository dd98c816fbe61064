//! Interstory drift post-processing.

use nalgebra::{DMatrix, DVector};

use crate::math::drift_transform;

/// Story heights at or below this magnitude are treated as missing.
pub const MIN_STORY_HEIGHT: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct DriftSummary {
    /// `n_steps × DOF` drift history (m).
    pub drift: DMatrix<f64>,
    /// Peak absolute drift per story, ignoring NaN samples.
    pub peak_drift: DVector<f64>,
    /// `peak_drift / H`, NaN where `H` is unusable.
    pub pidr: DVector<f64>,
    /// Largest non-NaN PIDR (+inf when a story diverged), NaN if none.
    pub max_pidr: f64,
}

/// Drift history and peak drift ratios from a displacement history.
pub fn summarize_drift(disp: &DMatrix<f64>, story_heights: &DVector<f64>) -> DriftSummary {
    let dof = disp.ncols();
    let t = drift_transform(dof);
    let drift = disp * t.transpose();

    let peak_drift = DVector::from_iterator(
        dof,
        (0..dof).map(|i| nan_max_abs(drift.column(i).iter().copied())),
    );

    let pidr = DVector::from_iterator(
        dof,
        (0..dof).map(|i| {
            let h = story_heights.get(i).copied().unwrap_or(f64::NAN);
            if h.is_finite() && h.abs() > MIN_STORY_HEIGHT {
                peak_drift[i] / h
            } else {
                f64::NAN
            }
        }),
    );

    let max_pidr = pidr
        .iter()
        .copied()
        .filter(|x| !x.is_nan())
        .fold(f64::NAN, f64::max);

    DriftSummary {
        drift,
        peak_drift,
        pidr,
        max_pidr,
    }
}

/// Max of `|x|` over non-NaN samples; NaN when there are none.
fn nan_max_abs(values: impl Iterator<Item = f64>) -> f64 {
    values
        .filter(|x| !x.is_nan())
        .map(f64::abs)
        .fold(f64::NAN, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_story_peaks_and_ratios() {
        let disp = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 0.01, 0.03, -0.02, -0.025]);
        let h = DVector::from_column_slice(&[4.0, 3.0]);
        let s = summarize_drift(&disp, &h);

        // Story 1 drifts: 0, 0.01, -0.02; story 2: 0, 0.02, -0.005.
        assert!((s.peak_drift[0] - 0.02).abs() < 1e-15);
        assert!((s.peak_drift[1] - 0.02).abs() < 1e-15);
        assert!((s.pidr[0] - 0.005).abs() < 1e-15);
        assert!((s.pidr[1] - 0.02 / 3.0).abs() < 1e-15);
        assert!((s.max_pidr - 0.02 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn zero_height_story_is_nan_and_skipped() {
        let disp = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.01, 0.05]);
        let h = DVector::from_column_slice(&[2.0, 0.0]);
        let s = summarize_drift(&disp, &h);
        assert!(s.pidr[1].is_nan());
        assert!((s.max_pidr - 0.005).abs() < 1e-15);
    }

    #[test]
    fn nan_samples_are_ignored_and_all_nan_gives_nan() {
        let disp = DMatrix::from_row_slice(3, 1, &[0.0, f64::NAN, 0.04]);
        let h = DVector::from_column_slice(&[4.0]);
        let s = summarize_drift(&disp, &h);
        assert!((s.peak_drift[0] - 0.04).abs() < 1e-15);

        let all_nan = DMatrix::from_element(2, 1, f64::NAN);
        let s = summarize_drift(&all_nan, &h);
        assert!(s.peak_drift[0].is_nan());
        assert!(s.max_pidr.is_nan());
    }

    #[test]
    fn diverged_story_dominates_max_pidr() {
        // Opposite floor displacements at the f64 limit overflow story 2's drift to +inf.
        let disp = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, -f64::MAX, f64::MAX]);
        let h = DVector::from_column_slice(&[4.0, 3.0]);
        let s = summarize_drift(&disp, &h);
        assert!(s.pidr[0].is_finite());
        assert_eq!(s.pidr[1], f64::INFINITY);
        assert_eq!(s.max_pidr, f64::INFINITY);
    }
}
