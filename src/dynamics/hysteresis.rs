//! Bilinear degrading hysteresis for shear-building stories.
//!
//! Each story carries a small amount of path memory between time steps:
//!
//! - the force at the last accepted step
//! - the largest positive drift reached so far
//! - the largest negative drift reached so far
//!
//! Newton-Raphson iterations *evaluate* trial drifts against that memory
//! without touching it; only an accepted step *commits* new values. This keeps
//! the iteration state disposable and the committed state path-consistent.
//!
//! Rule for a trial drift `δ` (previous accepted drift `δp`, force `fp`):
//!
//! - beyond the recorded envelope (`δ > peak_pos` or `δ < peak_neg`): loading
//!   on the backbone, tangent `α·k`, force = backbone(δ)
//! - otherwise: unloading / reloading, tangent `k`, trial force
//!   `fp + k (δ − δp)` clamped by the backbone in the loading direction
//!   (`min` when `δ > δp`, `max` when `δ < δp`, `fp` when unchanged)

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::drift_transform;

/// Immutable per-story properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoryProperties {
    /// Initial (elastic) stiffness `k`.
    pub k_init: f64,
    /// Yield force `Fy`.
    pub yield_force: f64,
    /// Yield drift `Fy / k`.
    pub yield_drift: f64,
    /// Post-yield stiffness ratio `α`.
    pub post_yield_ratio: f64,
}

impl StoryProperties {
    pub fn post_yield_stiffness(&self) -> f64 {
        self.post_yield_ratio * self.k_init
    }

    /// Force on the bilinear backbone at `drift`.
    pub fn backbone(&self, drift: f64) -> f64 {
        let k_post = self.post_yield_stiffness();
        if drift.abs() <= self.yield_drift {
            self.k_init * drift
        } else if drift > self.yield_drift {
            self.yield_force + k_post * (drift - self.yield_drift)
        } else {
            -self.yield_force + k_post * (drift + self.yield_drift)
        }
    }
}

/// Committed memory of one story.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryState {
    pub force: f64,
    pub peak_pos_drift: f64,
    pub peak_neg_drift: f64,
}

/// Force and tangent of one story at a trial drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoryResponse {
    pub force: f64,
    pub tangent: f64,
}

/// Evaluate one story at a trial drift without mutating its memory.
pub fn story_response(
    props: &StoryProperties,
    state: &StoryState,
    drift: f64,
    prev_drift: f64,
) -> StoryResponse {
    let on_backbone = drift > state.peak_pos_drift || drift < state.peak_neg_drift;
    let tangent = if on_backbone {
        props.post_yield_stiffness()
    } else {
        props.k_init
    };

    let f_backbone = props.backbone(drift);
    let force = if on_backbone {
        f_backbone
    } else {
        let trial = state.force + tangent * (drift - prev_drift);
        if drift > prev_drift {
            trial.min(f_backbone)
        } else if drift < prev_drift {
            trial.max(f_backbone)
        } else {
            state.force
        }
    };

    StoryResponse { force, tangent }
}

/// Story forces and tangents for a full trial drift vector.
#[derive(Debug, Clone)]
pub struct TrialResponse {
    pub forces: DVector<f64>,
    pub tangents: Vec<f64>,
}

/// The immutable hysteretic description of a shear building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HystereticModel {
    pub stories: Vec<StoryProperties>,
}

impl HystereticModel {
    /// Build from story stiffnesses, yield forces and the post-yield ratio.
    pub fn new(story_k: &[f64], yield_forces: &[f64], post_yield_ratio: f64) -> Result<Self, AppError> {
        if story_k.len() != yield_forces.len() {
            return Err(AppError::config(format!(
                "Fy vector shape mismatch (expected {}, got {}).",
                story_k.len(),
                yield_forces.len()
            )));
        }
        if !(post_yield_ratio.is_finite() && post_yield_ratio >= 0.0) {
            return Err(AppError::config(format!(
                "Post-yield stiffness ratio must be finite and >= 0 (got {post_yield_ratio})."
            )));
        }
        let mut stories = Vec::with_capacity(story_k.len());
        for (i, (&k, &fy)) in story_k.iter().zip(yield_forces.iter()).enumerate() {
            // `Fy = +inf` is allowed: the story then never yields.
            if fy.is_nan() || fy < 0.0 {
                return Err(AppError::config(format!(
                    "Yield force of story {i} must be >= 0 (got {fy})."
                )));
            }
            stories.push(StoryProperties {
                k_init: k,
                yield_force: fy,
                yield_drift: fy / k,
                post_yield_ratio,
            });
        }
        Ok(Self { stories })
    }

    /// Evaluate every story at `drift` (previous accepted drift `prev_drift`).
    pub fn evaluate(
        &self,
        state: &HystereticState,
        drift: &DVector<f64>,
        prev_drift: &DVector<f64>,
    ) -> TrialResponse {
        let n = self.stories.len();
        let mut forces = DVector::<f64>::zeros(n);
        let mut tangents = vec![0.0; n];
        for i in 0..n {
            let r = story_response(&self.stories[i], &state.stories[i], drift[i], prev_drift[i]);
            forces[i] = r.force;
            tangents[i] = r.tangent;
        }
        TrialResponse { forces, tangents }
    }

    /// Rebuild the committed state by replaying an accepted displacement history.
    ///
    /// Row 0 is taken as the (at-rest) initial condition; each later row is
    /// evaluated against the previous one and committed, exactly as the
    /// integrator does after every accepted step.
    pub fn replay(&self, disp: &DMatrix<f64>) -> HystereticState {
        let n = self.stories.len();
        let t = drift_transform(n);
        let mut state = HystereticState::new(n);
        if disp.nrows() == 0 {
            return state;
        }
        let mut prev_drift = &t * disp.row(0).transpose();
        for j in 1..disp.nrows() {
            let drift = &t * disp.row(j).transpose();
            let trial = self.evaluate(&state, &drift, &prev_drift);
            state.commit(&trial.forces, &drift);
            prev_drift = drift;
        }
        state
    }
}

/// Committed hysteretic memory for all stories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HystereticState {
    pub stories: Vec<StoryState>,
}

impl HystereticState {
    /// At-rest state: zero force, zero drift envelope.
    pub fn new(n_stories: usize) -> Self {
        Self {
            stories: vec![StoryState::default(); n_stories],
        }
    }

    /// Accept a step: store forces and widen the drift envelope.
    pub fn commit(&mut self, forces: &DVector<f64>, drift: &DVector<f64>) {
        for (i, s) in self.stories.iter_mut().enumerate() {
            s.force = forces[i];
            s.peak_pos_drift = s.peak_pos_drift.max(drift[i]);
            s.peak_neg_drift = s.peak_neg_drift.min(drift[i]);
        }
    }

    pub fn forces(&self) -> Vec<f64> {
        self.stories.iter().map(|s| s.force).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story() -> StoryProperties {
        // k = 1000, Fy = 10 => yield drift 0.01, post-yield slope 50.
        StoryProperties {
            k_init: 1000.0,
            yield_force: 10.0,
            yield_drift: 0.01,
            post_yield_ratio: 0.05,
        }
    }

    #[test]
    fn backbone_is_bilinear_and_odd() {
        let s = story();
        assert!((s.backbone(0.005) - 5.0).abs() < 1e-12);
        assert!((s.backbone(0.02) - (10.0 + 50.0 * 0.01)).abs() < 1e-12);
        assert!((s.backbone(-0.02) + s.backbone(0.02)).abs() < 1e-12);
    }

    #[test]
    fn first_loading_follows_backbone_with_post_yield_tangent() {
        let s = story();
        let r = story_response(&s, &StoryState::default(), 0.02, 0.0);
        assert!((r.tangent - 50.0).abs() < 1e-12);
        assert!((r.force - 10.5).abs() < 1e-12);
    }

    #[test]
    fn unloading_after_yield_is_held_at_the_backbone() {
        let s = story();
        let state = StoryState {
            force: 10.5,
            peak_pos_drift: 0.02,
            peak_neg_drift: 0.0,
        };
        let r = story_response(&s, &state, 0.015, 0.02);
        assert!((r.tangent - 1000.0).abs() < 1e-12);
        // Trial 10.5 - 5 = 5.5 is below backbone(0.015) = 10.25, and the
        // force may not drop below the backbone while loading backward.
        assert!((r.force - s.backbone(0.015)).abs() < 1e-12);
        assert!((r.force - 10.25).abs() < 1e-12);
    }

    #[test]
    fn unloading_inside_elastic_range_follows_initial_stiffness() {
        let s = story();
        let state = StoryState {
            force: 5.0,
            peak_pos_drift: 0.005,
            peak_neg_drift: 0.0,
        };
        let r = story_response(&s, &state, 0.002, 0.005);
        assert!((r.tangent - 1000.0).abs() < 1e-12);
        // Trial 5 - 3 = 2 coincides with the elastic backbone.
        assert!((r.force - 2.0).abs() < 1e-12);
    }

    #[test]
    fn reloading_is_clamped_by_backbone() {
        let s = story();
        // Residual force state well above the backbone's value at the trial drift.
        let state = StoryState {
            force: 10.4,
            peak_pos_drift: 0.02,
            peak_neg_drift: -0.001,
        };
        // Reload from 0.0100 to 0.0195: trial = 10.4 + 9.5 = 19.9 > backbone(0.0195) = 10.475.
        let r = story_response(&s, &state, 0.0195, 0.010);
        assert!((r.force - s.backbone(0.0195)).abs() < 1e-12);
    }

    #[test]
    fn unchanged_drift_keeps_committed_force() {
        let s = story();
        let state = StoryState {
            force: 3.0,
            peak_pos_drift: 0.02,
            peak_neg_drift: -0.02,
        };
        let r = story_response(&s, &state, 0.004, 0.004);
        assert_eq!(r.force, 3.0);
    }

    #[test]
    fn commit_widens_envelope_only() {
        let mut state = HystereticState::new(2);
        state.commit(
            &DVector::from_column_slice(&[1.0, -2.0]),
            &DVector::from_column_slice(&[0.01, -0.02]),
        );
        state.commit(
            &DVector::from_column_slice(&[0.5, -1.0]),
            &DVector::from_column_slice(&[0.005, -0.01]),
        );
        assert_eq!(state.stories[0].peak_pos_drift, 0.01);
        assert_eq!(state.stories[1].peak_neg_drift, -0.02);
        assert_eq!(state.forces(), vec![0.5, -1.0]);
    }

    #[test]
    fn replay_is_idempotent() {
        let model = HystereticModel::new(&[2000.0, 1000.0], &[20.0, 10.0], 0.1).unwrap();
        // A hand-made cyclic displacement history that yields both stories.
        let rows: Vec<[f64; 2]> = vec![
            [0.0, 0.0],
            [0.005, 0.01],
            [0.012, 0.03],
            [0.006, 0.012],
            [-0.004, -0.01],
            [-0.015, -0.035],
            [0.0, 0.0],
        ];
        let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        let disp = DMatrix::from_row_slice(rows.len(), 2, &flat);

        let first = model.replay(&disp);
        let second = model.replay(&disp);
        assert_eq!(first, second);
        assert!(first.stories[1].peak_pos_drift > 0.01);
        assert!(first.stories[0].peak_neg_drift < -0.01);
    }

    #[test]
    fn negative_yield_force_is_rejected() {
        let err = HystereticModel::new(&[1000.0], &[-1.0], 0.05).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
