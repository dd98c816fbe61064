//! Dense linear solves for the integrator.
//!
//! We solve small `DOF × DOF` systems:
//!
//! - once per run for the linear branch (`K_eff` factorized once, reused every step)
//! - once per Newton-Raphson iteration for the nonlinear branch (tangent changes)
//!
//! Implementation choices:
//! - LU with partial pivoting: `K_eff` is symmetric positive definite for any
//!   physical model, but LU also copes with the indefinite inputs a caller
//!   can still pass in, and reports singularity instead of panicking.
//! - Every solve result is checked for finiteness; a non-finite solution is
//!   reported as `None` exactly like a singular matrix.

use nalgebra::linalg::LU;
use nalgebra::{DMatrix, DVector, Dyn};

use crate::error::AppError;

/// A factorization that is reused across many right-hand sides.
pub struct Factorized {
    lu: LU<f64, Dyn, Dyn>,
}

impl Factorized {
    /// Factorize `a`, rejecting non-finite or singular matrices.
    pub fn new(a: &DMatrix<f64>, what: &str) -> Result<Self, AppError> {
        if !all_finite_matrix(a) {
            return Err(AppError::numerical(format!(
                "{what} contains NaN or Inf entries."
            )));
        }
        let lu = a.clone().lu();
        if !lu.is_invertible() {
            return Err(AppError::numerical(format!("{what} is singular.")));
        }
        Ok(Self { lu })
    }

    /// Solve `A x = b`; `None` if the solution is not finite.
    pub fn solve(&self, b: &DVector<f64>) -> Option<DVector<f64>> {
        let x = self.lu.solve(b)?;
        if all_finite(&x) { Some(x) } else { None }
    }
}

/// One-shot solve of `A x = b`.
///
/// Returns `None` if `A` is singular or the solution is not finite.
pub fn solve_dense(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let lu = a.clone().lu();
    if !lu.is_invertible() {
        return None;
    }
    let x = lu.solve(b)?;
    if all_finite(&x) { Some(x) } else { None }
}

pub fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

pub fn all_finite_matrix(m: &DMatrix<f64>) -> bool {
    m.iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_simple_system() {
        // 2x + y = 5, x + 3y = 10  =>  x = 1, y = 3
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_row_slice(&[5.0, 10.0]);

        let x = solve_dense(&a, &b).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);

        let f = Factorized::new(&a, "A").unwrap();
        let y = f.solve(&b).unwrap();
        assert!((&x - &y).norm() < 1e-14);
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let b = DVector::from_row_slice(&[1.0, 1.0]);
        assert!(solve_dense(&a, &b).is_none());

        let err = Factorized::new(&a, "K_eff").err().unwrap();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn non_finite_matrix_is_rejected() {
        let a = DMatrix::from_row_slice(1, 1, &[f64::NAN]);
        assert!(Factorized::new(&a, "K_eff").is_err());
    }
}
