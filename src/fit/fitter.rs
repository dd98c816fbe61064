//! Maximum-likelihood fit of a lognormal fragility curve.
//!
//! Given:
//! - IM levels `x_i`
//! - exceedance counts `k_i`
//! - trial counts `n_i`
//!
//! we minimize the binomial negative log-likelihood over `(θ, β)` with
//! Nelder-Mead and return the estimate together with the solver's diagnostics.
//!
//! Two parameterizations are available:
//! - `LogTransform` (default): search over `(ln θ, ln β)`, so every simplex
//!   vertex maps to positive parameters
//! - `Direct`: search over `(θ, β)` with an infinite-cost barrier at
//!   `θ, β ≤ 1e-6`
//!
//! A failed fit is not an error. It is reported as `success = false` with
//! NaN parameters, and the reason stays in `FitDiagnostics`.

use argmin::core::{CostFunction, Error, Executor, State, TerminationReason};
use argmin::solver::neldermead::NelderMead;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Diagnostic, DiagnosticKind, FitDiagnostics, FragilityData, FragilityFit, Parameterization,
};
use crate::error::AppError;
use crate::fit::initial::initial_theta;
use crate::fit::likelihood::{DEFAULT_PROB_EPSILON, neg_log_likelihood};

/// Parameters at or below this value are outside the feasible region.
pub const PARAM_BARRIER: f64 = 1e-6;

/// Optimizer settings for one fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub parameterization: Parameterization,
    /// Nelder-Mead iteration cap.
    pub max_iters: u64,
    /// Convergence threshold on the standard deviation of the simplex costs.
    pub sd_tolerance: f64,
    /// Starting β.
    pub initial_beta: f64,
    /// Probability clamp `ε` used in the likelihood.
    pub prob_epsilon: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            parameterization: Parameterization::LogTransform,
            max_iters: 2000,
            sd_tolerance: 1e-10,
            initial_beta: 0.5,
            prob_epsilon: DEFAULT_PROB_EPSILON,
        }
    }
}

/// Likelihood in the optimizer's coordinates.
struct FragilityLikelihood<'a> {
    data: &'a FragilityData,
    parameterization: Parameterization,
    epsilon: f64,
}

impl FragilityLikelihood<'_> {
    fn decode(&self, p: &[f64]) -> (f64, f64) {
        match self.parameterization {
            Parameterization::LogTransform => (p[0].exp(), p[1].exp()),
            Parameterization::Direct => (p[0], p[1]),
        }
    }

    fn encode(&self, theta: f64, beta: f64) -> Vec<f64> {
        match self.parameterization {
            Parameterization::LogTransform => vec![theta.ln(), beta.ln()],
            Parameterization::Direct => vec![theta, beta],
        }
    }

    /// Initial simplex: the start plus one offset vertex per axis.
    fn simplex(&self, theta0: f64, beta0: f64) -> Vec<Vec<f64>> {
        let x0 = self.encode(theta0, beta0);
        let (d_theta, d_beta) = match self.parameterization {
            Parameterization::LogTransform => (0.2, 0.2),
            Parameterization::Direct => (0.2 * theta0, 0.2 * beta0),
        };
        vec![
            x0.clone(),
            vec![x0[0] + d_theta, x0[1]],
            vec![x0[0], x0[1] + d_beta],
        ]
    }
}

impl CostFunction for FragilityLikelihood<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
        let (theta, beta) = self.decode(p);
        let outside = match self.parameterization {
            Parameterization::LogTransform => beta <= PARAM_BARRIER,
            Parameterization::Direct => theta <= PARAM_BARRIER || beta <= PARAM_BARRIER,
        };
        if outside {
            return Ok(f64::INFINITY);
        }
        // The simplex is ordered by cost, so NaN must never reach it.
        let nll = neg_log_likelihood(self.data, theta, beta, self.epsilon);
        Ok(if nll.is_nan() { f64::INFINITY } else { nll })
    }
}

/// Fit with default options.
pub fn fit_fragility_curve(
    im_levels: &[f64],
    num_exceed: &[u32],
    num_trials: &[u32],
) -> Result<FragilityFit, AppError> {
    let data = FragilityData::new(im_levels.to_vec(), num_exceed.to_vec(), num_trials.to_vec());
    fit_fragility_curve_with(&data, &FitOptions::default())
}

pub fn fit_fragility_curve_with(
    data: &FragilityData,
    opts: &FitOptions,
) -> Result<FragilityFit, AppError> {
    data.validate()?;
    validate_options(opts)?;

    let mut diagnostics = FitDiagnostics {
        message: String::new(),
        iterations: 0,
        neg_log_likelihood: f64::NAN,
        initial_theta: f64::NAN,
        initial_beta: f64::NAN,
        parameterization: opts.parameterization,
        warnings: Vec::new(),
    };

    if data.all_zero() || data.all_exceeded() {
        let message = if data.all_zero() {
            "All num_exceed are zero; the fragility curve is not identifiable."
        } else {
            "All trials resulted in exceedance; the fragility curve is not identifiable."
        };
        diagnostics
            .warnings
            .push(Diagnostic::warn(DiagnosticKind::DegenerateDataset, None, message));
        diagnostics.message = message.to_string();
        return Ok(FragilityFit::failed(diagnostics));
    }

    let theta0 = initial_theta(data);
    let beta0 = opts.initial_beta;
    diagnostics.initial_theta = theta0;
    diagnostics.initial_beta = beta0;
    log::debug!("MLE start: theta0={theta0:.6}, beta0={beta0:.4}");

    let problem = FragilityLikelihood {
        data,
        parameterization: opts.parameterization,
        epsilon: opts.prob_epsilon,
    };
    let simplex = problem.simplex(theta0, beta0);

    let outcome = NelderMead::new(simplex)
        .with_sd_tolerance(opts.sd_tolerance)
        .and_then(|solver| {
            Executor::new(problem, solver)
                .configure(|state| state.max_iters(opts.max_iters))
                .run()
        });

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            let message = format!("MLE optimizer error: {e}");
            diagnostics
                .warnings
                .push(Diagnostic::warn(DiagnosticKind::OptimizerFailure, None, &message));
            diagnostics.message = message;
            return Ok(FragilityFit::failed(diagnostics));
        }
    };

    let state = result.state();
    diagnostics.iterations = state.get_iter();
    diagnostics.neg_log_likelihood = state.get_best_cost();
    let converged = matches!(
        state.get_termination_reason(),
        Some(TerminationReason::SolverConverged)
    );
    diagnostics.message = match state.get_termination_reason() {
        Some(reason) => format!("{reason:?}"),
        None => "Solver did not report a termination reason".to_string(),
    };

    let estimate = state.get_best_param().map(|p| match opts.parameterization {
        Parameterization::LogTransform => (p[0].exp(), p[1].exp()),
        Parameterization::Direct => (p[0], p[1]),
    });

    match estimate {
        Some((theta, beta))
            if converged && theta.is_finite() && beta.is_finite() && theta > 0.0 && beta > 0.0 =>
        {
            log::info!(
                "MLE fit converged: theta={theta:.4}, beta={beta:.4} ({} iterations)",
                diagnostics.iterations
            );
            Ok(FragilityFit {
                theta,
                beta,
                success: true,
                diagnostics,
            })
        }
        _ => {
            let message = format!("MLE optimization failed: {}", diagnostics.message);
            diagnostics
                .warnings
                .push(Diagnostic::warn(DiagnosticKind::OptimizerFailure, None, message));
            Ok(FragilityFit::failed(diagnostics))
        }
    }
}

fn validate_options(opts: &FitOptions) -> Result<(), AppError> {
    if opts.max_iters == 0 {
        return Err(AppError::config("max_iters must be > 0."));
    }
    if !(opts.sd_tolerance.is_finite() && opts.sd_tolerance > 0.0) {
        return Err(AppError::config(format!(
            "sd_tolerance must be finite and > 0 (got {}).",
            opts.sd_tolerance
        )));
    }
    if !(opts.initial_beta.is_finite() && opts.initial_beta > PARAM_BARRIER) {
        return Err(AppError::config(format!(
            "initial_beta must be finite and > {PARAM_BARRIER} (got {}).",
            opts.initial_beta
        )));
    }
    if !(opts.prob_epsilon > 0.0 && opts.prob_epsilon < 0.5) {
        return Err(AppError::config(format!(
            "prob_epsilon must be in (0, 0.5) (got {}).",
            opts.prob_epsilon
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{expected_counts, sample_counts};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ims() -> Vec<f64> {
        (1..=10).map(|i| i as f64 * 0.1).collect()
    }

    fn rel_err(a: f64, b: f64) -> f64 {
        (a - b).abs() / b.abs()
    }

    #[test]
    fn recovers_parameters_from_expected_counts() {
        let ims = ims();
        let exceed = expected_counts(0.5, 0.4, &ims, 40);
        let fit = fit_fragility_curve(&ims, &exceed, &[40; 10]).unwrap();
        assert!(fit.success, "{}", fit.diagnostics.message);
        assert!(rel_err(fit.theta, 0.5) < 0.10, "theta = {}", fit.theta);
        assert!(rel_err(fit.beta, 0.4) < 0.10, "beta = {}", fit.beta);
        assert!(fit.diagnostics.warnings.is_empty());
        assert!(fit.diagnostics.iterations > 0);
    }

    #[test]
    fn fewer_trials_still_land_near_the_truth() {
        let ims = ims();
        let exceed = expected_counts(0.5, 0.4, &ims, 10);
        let fit = fit_fragility_curve(&ims, &exceed, &[10; 10]).unwrap();
        assert!(fit.success);
        assert!(rel_err(fit.theta, 0.5) < 0.15, "theta = {}", fit.theta);
        assert!(rel_err(fit.beta, 0.4) < 0.35, "beta = {}", fit.beta);
    }

    #[test]
    fn recovers_parameters_from_binomial_samples() {
        let ims = ims();
        let mut rng = StdRng::seed_from_u64(7);
        let exceed = sample_counts(0.5, 0.4, &ims, 40, &mut rng).unwrap();
        let fit = fit_fragility_curve(&ims, &exceed, &[40; 10]).unwrap();
        assert!(fit.success);
        assert!(rel_err(fit.theta, 0.5) < 0.2, "theta = {}", fit.theta);
        assert!(rel_err(fit.beta, 0.4) < 0.5, "beta = {}", fit.beta);
    }

    #[test]
    fn direct_parameterization_agrees_with_log_transform() {
        let ims = ims();
        let data = FragilityData::new(ims.clone(), expected_counts(0.5, 0.4, &ims, 40), vec![40; 10]);
        let log_fit = fit_fragility_curve_with(&data, &FitOptions::default()).unwrap();
        let direct = fit_fragility_curve_with(
            &data,
            &FitOptions {
                parameterization: Parameterization::Direct,
                ..FitOptions::default()
            },
        )
        .unwrap();
        assert!(direct.success);
        assert!(rel_err(direct.theta, log_fit.theta) < 1e-3);
        assert!(rel_err(direct.beta, log_fit.beta) < 1e-2);
        assert_eq!(direct.diagnostics.parameterization, Parameterization::Direct);
    }

    #[test]
    fn fitted_curve_is_usable() {
        let ims = ims();
        let exceed = expected_counts(0.5, 0.4, &ims, 40);
        let fit = fit_fragility_curve(&ims, &exceed, &[40; 10]).unwrap();
        let p = fit.probability(fit.theta);
        assert!((p - 0.5).abs() < 1e-7);
    }

    #[test]
    fn degenerate_datasets_return_nan_with_warning() {
        let all_zero = fit_fragility_curve(&[0.1, 0.2, 0.3], &[0, 0, 0], &[10, 10, 10]).unwrap();
        assert!(!all_zero.success);
        assert!(all_zero.theta.is_nan() && all_zero.beta.is_nan());
        assert_eq!(all_zero.diagnostics.warnings[0].kind, DiagnosticKind::DegenerateDataset);
        assert!(all_zero.probability(0.2).is_nan());

        let all_total = fit_fragility_curve(&[0.1, 0.2], &[10, 5], &[10, 5]).unwrap();
        assert!(!all_total.success);
        assert_eq!(all_total.diagnostics.warnings[0].kind, DiagnosticKind::DegenerateDataset);
    }

    #[test]
    fn iteration_cap_is_an_optimizer_failure() {
        let ims = ims();
        let data = FragilityData::new(ims.clone(), expected_counts(0.5, 0.4, &ims, 40), vec![40; 10]);
        let fit = fit_fragility_curve_with(
            &data,
            &FitOptions {
                max_iters: 2,
                ..FitOptions::default()
            },
        )
        .unwrap();
        assert!(!fit.success);
        assert!(fit.theta.is_nan());
        assert!(!fit.diagnostics.message.is_empty());
        assert_eq!(fit.diagnostics.warnings[0].kind, DiagnosticKind::OptimizerFailure);
    }

    #[test]
    fn invalid_inputs_are_config_errors() {
        let err = fit_fragility_curve(&[0.1, 0.2], &[3, 11], &[10, 10]).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = fit_fragility_curve(&[0.1, 0.2], &[3], &[10, 10]).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = fit_fragility_curve(&[0.1], &[0], &[0]).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = fit_fragility_curve(&[], &[], &[]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
