//! Newmark-Beta integration constants.
//!
//! The displacement-based implicit form used by both branches of the
//! integrator:
//!
//! ```text
//! K_eff = K + a0·M + a7·C
//! p̂     = p + M (a0 u + a1 v + a2 a) + C (a7 u + a5 v + a6 a)
//! a'    = a0 Δu − a1 v − a2 a
//! v'    = a7 Δu − a5 v − a6 a          (≡ v + a3 a + a4 a')
//! ```
//!
//! Average acceleration (`γ = 1/2`, `β = 1/4`) is unconditionally stable and
//! conserves energy for undamped linear systems.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// Constants derived from `dt`, `γ`, `β`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NewmarkConstants {
    pub gamma: f64,
    pub beta: f64,
    pub dt: f64,
    /// `1 / (β dt²)`
    pub a0: f64,
    /// `1 / (β dt)`
    pub a1: f64,
    /// `1 / (2β) − 1`
    pub a2: f64,
    /// `dt (1 − γ)`
    pub a3: f64,
    /// `γ dt`
    pub a4: f64,
    /// `γ / β − 1`
    pub a5: f64,
    /// `dt (γ / (2β) − 1)`
    pub a6: f64,
    /// `γ / (β dt)`
    pub a7: f64,
}

impl NewmarkConstants {
    pub fn new(dt: f64, gamma: f64, beta: f64) -> Self {
        Self {
            gamma,
            beta,
            dt,
            a0: 1.0 / (beta * dt * dt),
            a1: 1.0 / (beta * dt),
            a2: 1.0 / (2.0 * beta) - 1.0,
            a3: dt * (1.0 - gamma),
            a4: gamma * dt,
            a5: gamma / beta - 1.0,
            a6: dt * (gamma / (2.0 * beta) - 1.0),
            a7: gamma / (beta * dt),
        }
    }

    /// γ = 1/2, β = 1/4.
    pub fn average_acceleration(dt: f64) -> Self {
        Self::new(dt, 0.5, 0.25)
    }

    /// Acceleration at the new step from the displacement increment.
    pub fn acceleration(&self, du: f64, v: f64, a: f64) -> f64 {
        self.a0 * du - self.a1 * v - self.a2 * a
    }

    /// Velocity at the new step from the displacement increment.
    pub fn velocity(&self, du: f64, v: f64, a: f64) -> f64 {
        self.a7 * du - self.a5 * v - self.a6 * a
    }

    /// `(v', a')` for a whole displacement increment.
    pub fn advance(
        &self,
        du: &DVector<f64>,
        v: &DVector<f64>,
        a: &DVector<f64>,
    ) -> (DVector<f64>, DVector<f64>) {
        let n = du.len();
        let v_next = DVector::from_iterator(n, (0..n).map(|i| self.velocity(du[i], v[i], a[i])));
        let a_next = DVector::from_iterator(n, (0..n).map(|i| self.acceleration(du[i], v[i], a[i])));
        (v_next, a_next)
    }

    /// `K + a0·M + a7·C`
    pub fn effective_stiffness(
        &self,
        k: &DMatrix<f64>,
        m: &DMatrix<f64>,
        c: &DMatrix<f64>,
    ) -> DMatrix<f64> {
        k + m * self.a0 + c * self.a7
    }

    /// `p + M (a0 u + a1 v + a2 a) + C (a7 u + a5 v + a6 a)`
    pub fn effective_load(
        &self,
        p: &DVector<f64>,
        m: &DMatrix<f64>,
        c: &DMatrix<f64>,
        u: &DVector<f64>,
        v: &DVector<f64>,
        a: &DVector<f64>,
    ) -> DVector<f64> {
        let inertia = u * self.a0 + v * self.a1 + a * self.a2;
        let damping = u * self.a7 + v * self.a5 + a * self.a6;
        p + m * inertia + c * damping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_acceleration_constants() {
        let dt = 0.01;
        let c = NewmarkConstants::average_acceleration(dt);
        assert!((c.a0 - 4.0 / (dt * dt)).abs() < 1e-6);
        assert!((c.a1 - 4.0 / dt).abs() < 1e-9);
        assert!((c.a2 - 1.0).abs() < 1e-15);
        assert!((c.a5 - 1.0).abs() < 1e-15);
        assert!(c.a6.abs() < 1e-15);
        assert!((c.a7 - 2.0 / dt).abs() < 1e-9);
    }

    #[test]
    fn both_velocity_forms_agree() {
        let c = NewmarkConstants::new(0.02, 0.6, 0.3);
        let (du, v, a) = (1.3e-3, -0.04, 2.1);
        let a_next = c.acceleration(du, v, a);
        let v1 = c.velocity(du, v, a);
        let v2 = v + c.a3 * a + c.a4 * a_next;
        assert!((v1 - v2).abs() < 1e-12, "{v1} vs {v2}");
    }

    #[test]
    fn effective_load_balances_a_static_state() {
        // At rest with u = v = a = 0 the effective load is just p.
        let c = NewmarkConstants::average_acceleration(0.01);
        let m = DMatrix::<f64>::identity(2, 2);
        let damp = DMatrix::<f64>::zeros(2, 2);
        let z = DVector::<f64>::zeros(2);
        let p = DVector::from_column_slice(&[1.0, -2.0]);
        let p_hat = c.effective_load(&p, &m, &damp, &z, &z, &z);
        assert_eq!(p_hat, p);
    }
}
