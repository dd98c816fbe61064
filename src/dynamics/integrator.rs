//! Newmark-Beta time-history analysis of a shear building.
//!
//! Two branches share the same constants, load vector and post-processing:
//!
//! - linear: `K_eff` is factorized once and reused for every step
//! - nonlinear: per-story bilinear hysteresis, Newton-Raphson per step on
//!   the residual `R = p − Tᵀf − C v − M a`
//!
//! Numerical trouble inside a nonlinear step never aborts the run. The step
//! is accepted at its last iterate and the event is recorded as a
//! [`Diagnostic`] on the result.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Diagnostic, DiagnosticKind, GRAVITY, ModelType, TimeHistoryInput, TimeHistoryResult,
    count_kind,
};
use crate::dynamics::drift::summarize_drift;
use crate::dynamics::hysteresis::{HystereticModel, HystereticState};
use crate::dynamics::newmark::NewmarkConstants;
use crate::error::AppError;
use crate::math::{
    Factorized, all_finite, all_finite_matrix, assemble_stiffness, drift_transform, solve_dense,
    story_stiffnesses,
};

/// Newton-Raphson controls for the nonlinear branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegratorOptions {
    /// Convergence threshold on the Euclidean norm of the residual force.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for IntegratorOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            max_iterations: 50,
        }
    }
}

/// Run one analysis with default integrator options.
pub fn run_time_history(input: &TimeHistoryInput) -> Result<TimeHistoryResult, AppError> {
    run_time_history_with(input, &IntegratorOptions::default())
}

pub fn run_time_history_with(
    input: &TimeHistoryInput,
    opts: &IntegratorOptions,
) -> Result<TimeHistoryResult, AppError> {
    if !(opts.tolerance.is_finite() && opts.tolerance > 0.0) || opts.max_iterations == 0 {
        return Err(AppError::config(format!(
            "Invalid integrator options (tolerance={}, max_iterations={}).",
            opts.tolerance, opts.max_iterations
        )));
    }

    let dof = check_square(input.mass, "Mass matrix M")?;
    if input.story_heights.len() != dof {
        return Err(AppError::config(format!(
            "story_heights length mismatch (expected {dof}, got {}).",
            input.story_heights.len()
        )));
    }
    if !(input.dt.is_finite() && input.dt > 0.0) {
        return Err(AppError::config(format!(
            "dt must be finite and > 0 (got {}).",
            input.dt
        )));
    }

    let ag = as_vector(input.ground_accel_g, "ground_accel_g")? * GRAVITY;
    let n_steps = ag.len();
    let consts = NewmarkConstants::average_acceleration(input.dt);
    let mut diagnostics = Vec::new();

    let history = match input.model_type {
        ModelType::Linear => integrate_linear(input, dof, &ag, &consts, &mut diagnostics)?,
        ModelType::Nonlinear => {
            integrate_nonlinear(input, dof, &ag, &consts, opts, &mut diagnostics)?
        }
    };

    let summary = summarize_drift(&history.disp, input.story_heights);
    log::debug!(
        "{} run: {} steps, dof={}, max_pidr={:.6}, unconverged steps={}",
        input.model_type.display_name(),
        n_steps,
        dof,
        summary.max_pidr,
        count_kind(&diagnostics, DiagnosticKind::NonConvergence)
    );

    Ok(TimeHistoryResult {
        model_type: input.model_type,
        time: (0..n_steps).map(|i| i as f64 * input.dt).collect(),
        disp: history.disp,
        vel: history.vel,
        acc: history.acc,
        drift: summary.drift,
        peak_drift: summary.peak_drift,
        pidr: summary.pidr,
        max_pidr: summary.max_pidr,
        diagnostics,
        story_state: history.story_state,
    })
}

struct History {
    disp: DMatrix<f64>,
    vel: DMatrix<f64>,
    acc: DMatrix<f64>,
    story_state: Option<HystereticState>,
}

impl History {
    /// At rest, with `acc[0] = −ι·ag[0]`.
    fn at_rest(n_steps: usize, dof: usize, ag0: f64) -> Self {
        let mut acc = DMatrix::<f64>::zeros(n_steps, dof);
        acc.row_mut(0).fill(-ag0);
        Self {
            disp: DMatrix::zeros(n_steps, dof),
            vel: DMatrix::zeros(n_steps, dof),
            acc,
            story_state: None,
        }
    }

    fn state(&self, j: usize) -> (DVector<f64>, DVector<f64>, DVector<f64>) {
        (
            self.disp.row(j).transpose(),
            self.vel.row(j).transpose(),
            self.acc.row(j).transpose(),
        )
    }

    fn store(&mut self, j: usize, u: &DVector<f64>, v: &DVector<f64>, a: &DVector<f64>) {
        self.disp.row_mut(j).copy_from(&u.transpose());
        self.vel.row_mut(j).copy_from(&v.transpose());
        self.acc.row_mut(j).copy_from(&a.transpose());
    }
}

/// Effective earthquake load `p = −M ι ag`.
fn ground_load(m: &DMatrix<f64>, ag: f64) -> DVector<f64> {
    let iota = DVector::<f64>::from_element(m.nrows(), 1.0);
    -(m * iota) * ag
}

fn rayleigh(m: &DMatrix<f64>, k: &DMatrix<f64>, alpha_m: f64, beta_k: f64) -> DMatrix<f64> {
    m * alpha_m + k * beta_k
}

fn integrate_linear(
    input: &TimeHistoryInput,
    dof: usize,
    ag: &DVector<f64>,
    consts: &NewmarkConstants,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<History, AppError> {
    let k = input.stiffness_input;
    check_dof_square(k, dof, "Stiffness matrix K")?;
    let k_damp = match input.k_init {
        Some(k_init) => {
            check_dof_square(k_init, dof, "K_init")?;
            k_init
        }
        None => {
            if input.beta_k != 0.0 {
                diagnostics.push(Diagnostic::warn(
                    DiagnosticKind::DampingFallback,
                    None,
                    "K_init not provided for linear analysis with beta_k != 0; using K for damping.",
                ));
            }
            k
        }
    };

    let m = input.mass;
    let c = rayleigh(m, k_damp, input.alpha_m, input.beta_k);
    let k_eff = Factorized::new(&consts.effective_stiffness(k, m, &c), "Effective stiffness K_eff")?;

    let n_steps = ag.len();
    let mut history = History::at_rest(n_steps, dof, ag[0]);

    for j in 0..n_steps - 1 {
        let (u, v, a) = history.state(j);
        let p = ground_load(m, ag[j + 1]);
        let p_hat = consts.effective_load(&p, m, &c, &u, &v, &a);
        let u_next = k_eff.solve(&p_hat).ok_or_else(|| {
            AppError::numerical(format!(
                "Linear solve produced a non-finite displacement at step {}.",
                j + 1
            ))
        })?;
        let (v_next, a_next) = consts.advance(&(&u_next - &u), &v, &a);
        history.store(j + 1, &u_next, &v_next, &a_next);
    }

    Ok(history)
}

fn integrate_nonlinear(
    input: &TimeHistoryInput,
    dof: usize,
    ag: &DVector<f64>,
    consts: &NewmarkConstants,
    opts: &IntegratorOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<History, AppError> {
    let k_init = input
        .k_init
        .ok_or_else(|| AppError::config("K_init must be provided for nonlinear analysis."))?;
    let post_yield_ratio = input
        .post_yield_ratio
        .ok_or_else(|| AppError::config("post_yield_ratio must be provided for nonlinear analysis."))?;
    check_dof_square(k_init, dof, "K_init")?;

    let fy = as_vector(input.stiffness_input, "Fy")?;
    if fy.len() != dof {
        return Err(AppError::config(format!(
            "Fy vector shape mismatch (expected {dof}, got {}).",
            fy.len()
        )));
    }

    let stories = story_stiffnesses(k_init)?;
    diagnostics.extend(stories.warnings);
    let model = HystereticModel::new(&stories.values, fy.as_slice(), post_yield_ratio)?;

    let m = input.mass;
    let c = rayleigh(m, k_init, input.alpha_m, input.beta_k);
    let t = drift_transform(dof);
    let t_tr = t.transpose();
    let inertia_damping = m * consts.a0 + &c * consts.a7;

    let n_steps = ag.len();
    let mut history = History::at_rest(n_steps, dof, ag[0]);
    let mut state = HystereticState::new(dof);

    for j in 0..n_steps - 1 {
        let step = j + 1;
        let (u_prev, v_prev, a_prev) = history.state(j);
        let drift_prev = &t * &u_prev;
        let p = ground_load(m, ag[step]);

        let mut u_k = u_prev.clone();
        let mut converged = false;

        for iter in 0..opts.max_iterations {
            let (v_k, a_k) = consts.advance(&(&u_k - &u_prev), &v_prev, &a_prev);
            let drift_k = &t * &u_k;
            let trial = model.evaluate(&state, &drift_k, &drift_prev);

            let residual = &p - &t_tr * &trial.forces - &c * &v_k - m * &a_k;
            if !all_finite(&residual) {
                diagnostics.push(Diagnostic::warn(
                    DiagnosticKind::NumericalDegeneracy,
                    Some(step),
                    format!("Non-finite residual at iteration {}.", iter + 1),
                ));
                break;
            }

            let norm = residual.norm();
            log::trace!("step {step} iter {}: |R| = {norm:.3e}", iter + 1);
            if norm < opts.tolerance {
                state.commit(&trial.forces, &drift_k);
                history.store(step, &u_k, &v_k, &a_k);
                converged = true;
                break;
            }

            let k_eff = assemble_stiffness(&trial.tangents) + &inertia_damping;
            match tangent_correction(&k_eff, &residual) {
                Ok(correction) => u_k += correction,
                Err(reason) => {
                    diagnostics.push(Diagnostic::warn(
                        DiagnosticKind::NumericalDegeneracy,
                        Some(step),
                        format!("{reason} at iteration {}.", iter + 1),
                    ));
                    break;
                }
            }
        }

        if !converged {
            diagnostics.push(Diagnostic::warn(
                DiagnosticKind::NonConvergence,
                Some(step),
                format!(
                    "Newton-Raphson did not converge within {} iterations; accepting last iterate.",
                    opts.max_iterations
                ),
            ));
            let (v_k, a_k) = consts.advance(&(&u_k - &u_prev), &v_prev, &a_prev);
            let drift_k = &t * &u_k;
            let trial = model.evaluate(&state, &drift_k, &drift_prev);
            state.commit(&trial.forces, &drift_k);
            history.store(step, &u_k, &v_k, &a_k);
        }
    }

    history.story_state = Some(state);
    Ok(history)
}

/// Newton-Raphson correction `Δu = K_eff⁻¹ R`, or the reason it is unusable.
fn tangent_correction(
    k_eff: &DMatrix<f64>,
    residual: &DVector<f64>,
) -> Result<DVector<f64>, &'static str> {
    if !all_finite_matrix(k_eff) {
        return Err("Non-finite tangent stiffness");
    }
    solve_dense(k_eff, residual).ok_or("Singular tangent system or non-finite correction")
}

fn check_square(m: &DMatrix<f64>, what: &str) -> Result<usize, AppError> {
    if m.nrows() == 0 || m.nrows() != m.ncols() {
        return Err(AppError::config(format!(
            "{what} must be a non-empty square matrix (got {}x{}).",
            m.nrows(),
            m.ncols()
        )));
    }
    if !all_finite_matrix(m) {
        return Err(AppError::config(format!("{what} contains NaN or Inf entries.")));
    }
    Ok(m.nrows())
}

fn check_dof_square(m: &DMatrix<f64>, dof: usize, what: &str) -> Result<(), AppError> {
    let n = check_square(m, what)?;
    if n != dof {
        return Err(AppError::config(format!(
            "{what} shape mismatch (expected {dof}x{dof}, got {n}x{n})."
        )));
    }
    Ok(())
}

/// Accept an `n × 1` or `1 × n` matrix as a vector.
pub(crate) fn as_vector(m: &DMatrix<f64>, what: &str) -> Result<DVector<f64>, AppError> {
    if m.is_empty() {
        return Err(AppError::config(format!("{what} is empty.")));
    }
    if m.ncols() == 1 {
        Ok(m.column(0).into_owned())
    } else if m.nrows() == 1 {
        Ok(m.row(0).transpose())
    } else {
        Err(AppError::config(format!(
            "{what} must be a row or column vector (got {}x{}).",
            m.nrows(),
            m.ncols()
        )))
    }
}
