//! Shear-building matrix helpers.
//!
//! In a shear building each story `i` connects floor `i` to floor `i - 1`
//! (floor `-1` is the ground). With per-story stiffnesses `k_i`:
//!
//! ```text
//! K[i, i]     = k_i + k_{i+1}      (k_n = 0 above the roof)
//! K[i, i+1]   = K[i+1, i] = -k_{i+1}
//! ```
//!
//! and interstory drifts are `δ = T u` with `T` lower bidiagonal
//! (`δ_0 = u_0`, `δ_i = u_i - u_{i-1}`).

use nalgebra::{DMatrix, DVector};

use crate::domain::{Diagnostic, DiagnosticKind};
use crate::error::AppError;

/// Drift transformation matrix `T` (DOF × DOF).
pub fn drift_transform(dof: usize) -> DMatrix<f64> {
    let mut t = DMatrix::<f64>::zeros(dof, dof);
    for i in 0..dof {
        t[(i, i)] = 1.0;
        if i > 0 {
            t[(i, i - 1)] = -1.0;
        }
    }
    t
}

/// Assemble the tridiagonal shear-building stiffness from per-story values.
pub fn assemble_stiffness(story_k: &[f64]) -> DMatrix<f64> {
    let n = story_k.len();
    let mut k = DMatrix::<f64>::zeros(n, n);
    if n == 0 {
        return k;
    }
    k[(n - 1, n - 1)] = story_k[n - 1];
    for i in (0..n - 1).rev() {
        k[(i, i)] = story_k[i] + story_k[i + 1];
        k[(i, i + 1)] = -story_k[i + 1];
        k[(i + 1, i)] = -story_k[i + 1];
    }
    k
}

/// Diagonal lumped-mass matrix from per-floor masses.
pub fn lumped_mass(floor_masses: &[f64]) -> DMatrix<f64> {
    DMatrix::from_diagonal(&DVector::from_column_slice(floor_masses))
}

/// Story stiffnesses recovered from a shear-building `K_init`.
#[derive(Debug, Clone)]
pub struct StoryStiffness {
    pub values: Vec<f64>,
    /// Off-diagonal mismatches found during back-substitution.
    pub warnings: Vec<Diagnostic>,
}

/// Back-substitute story stiffnesses from the top story downward.
///
/// `k[n-1] = K[n-1, n-1]`, then `k[i] = K[i, i] - k[i+1]`. Each off-diagonal
/// `K[i, i+1]` is cross-checked against `-k[i+1]`; a mismatch produces a
/// warning, not an error. Non-positive derived stiffnesses are rejected.
pub fn story_stiffnesses(k_init: &DMatrix<f64>) -> Result<StoryStiffness, AppError> {
    let n = k_init.nrows();
    if n == 0 || k_init.ncols() != n {
        return Err(AppError::config(format!(
            "K_init must be a non-empty square matrix (got {}x{}).",
            k_init.nrows(),
            k_init.ncols()
        )));
    }

    let mut values = vec![0.0; n];
    let mut warnings = Vec::new();
    values[n - 1] = k_init[(n - 1, n - 1)];
    for i in (0..n - 1).rev() {
        let expected = -values[i + 1];
        let actual = k_init[(i, i + 1)];
        if !is_close(actual, expected) {
            warnings.push(Diagnostic::warn(
                DiagnosticKind::ShearBuildingMismatch,
                None,
                format!(
                    "Off-diagonal term K_init[{i},{}] = {actual:.6e} does not match -k_{} = {expected:.6e}; \
                     K_init might not be standard shear-building form.",
                    i + 1,
                    i + 1
                ),
            ));
        }
        values[i] = k_init[(i, i)] - values[i + 1];
    }

    if let Some((i, k)) = values
        .iter()
        .enumerate()
        .find(|(_, k)| !(k.is_finite() && **k > 0.0))
    {
        return Err(AppError::config(format!(
            "Derived initial story stiffnesses must be positive (k_{i} = {k})."
        )));
    }

    Ok(StoryStiffness { values, warnings })
}

/// `numpy.isclose` semantics with its default tolerances.
fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_transform_is_lower_bidiagonal() {
        let t = drift_transform(3);
        let u = DVector::from_column_slice(&[0.01, 0.025, 0.03]);
        let d = &t * &u;
        assert!((d[0] - 0.01).abs() < 1e-15);
        assert!((d[1] - 0.015).abs() < 1e-15);
        assert!((d[2] - 0.005).abs() < 1e-15);
    }

    #[test]
    fn assembly_matches_transform_form() {
        // K = Tᵀ diag(k) T for a shear building.
        let story_k = [3.0e7, 2.0e7, 1.0e7];
        let k = assemble_stiffness(&story_k);
        let t = drift_transform(3);
        let diag = DMatrix::from_diagonal(&DVector::from_column_slice(&story_k));
        let expected = t.transpose() * diag * &t;
        assert!((k - expected).abs().max() < 1e-6);
    }

    #[test]
    fn back_substitution_recovers_story_values() {
        let story_k = [4.0e7, 3.0e7, 2.0e7];
        let k = assemble_stiffness(&story_k);
        let recovered = story_stiffnesses(&k).unwrap();
        assert!(recovered.warnings.is_empty());
        for (a, b) in recovered.values.iter().zip(story_k.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn off_diagonal_mismatch_warns_but_succeeds() {
        let mut k = assemble_stiffness(&[4.0e7, 3.0e7]);
        k[(0, 1)] = -1.0e7;
        let recovered = story_stiffnesses(&k).unwrap();
        assert_eq!(recovered.warnings.len(), 1);
        assert_eq!(recovered.warnings[0].kind, DiagnosticKind::ShearBuildingMismatch);
    }

    #[test]
    fn non_positive_story_stiffness_is_rejected() {
        // Diagonal too small for the story above.
        let k = DMatrix::from_row_slice(2, 2, &[1.0e7, -2.0e7, -2.0e7, 2.0e7]);
        let err = story_stiffnesses(&k).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn single_story_uses_the_lone_diagonal() {
        let k = DMatrix::from_element(1, 1, 5.0e6);
        let recovered = story_stiffnesses(&k).unwrap();
        assert_eq!(recovered.values, vec![5.0e6]);
    }
}
