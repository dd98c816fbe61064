//! Binomial likelihood of a lognormal fragility curve.
//!
//! ```text
//! NLL(θ, β) = −Σ_i [ k_i ln p_i + (n_i − k_i) ln(1 − p_i) ]
//! p_i       = clamp(Φ(ln(x_i/θ)/β), ε, 1 − ε)
//! ```
//!
//! The combinatorial term is constant in `(θ, β)` and dropped.

use crate::domain::FragilityData;
use crate::models::exceedance_probability;

/// Default probability clamp `ε`.
pub const DEFAULT_PROB_EPSILON: f64 = 1e-9;

/// Negative log-likelihood; `+inf` for non-positive or non-finite parameters.
pub fn neg_log_likelihood(data: &FragilityData, theta: f64, beta: f64, epsilon: f64) -> f64 {
    if !(theta.is_finite() && beta.is_finite() && theta > 0.0 && beta > 0.0) {
        return f64::INFINITY;
    }

    let mut ll = 0.0;
    for i in 0..data.len() {
        let p = exceedance_probability(data.im_levels[i], theta, beta).clamp(epsilon, 1.0 - epsilon);
        let k = data.num_exceed[i] as f64;
        let n = data.num_trials[i] as f64;
        ll += k * p.ln() + (n - k) * (1.0 - p).ln();
    }
    -ll
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exceedance_curve;

    fn expected_data(theta: f64, beta: f64, trials: u32) -> FragilityData {
        let ims: Vec<f64> = (1..=10).map(|i| i as f64 * 0.1).collect();
        let exceed = exceedance_curve(&ims, theta, beta)
            .iter()
            .map(|p| (p * trials as f64).round() as u32)
            .collect();
        FragilityData::new(ims, exceed, vec![trials; 10])
    }

    #[test]
    fn truth_beats_nearby_parameters() {
        let data = expected_data(0.5, 0.4, 40);
        let at_truth = neg_log_likelihood(&data, 0.5, 0.4, DEFAULT_PROB_EPSILON);
        for (t, b) in [(0.4, 0.4), (0.6, 0.4), (0.5, 0.25), (0.5, 0.6)] {
            let nll = neg_log_likelihood(&data, t, b, DEFAULT_PROB_EPSILON);
            assert!(nll > at_truth, "({t}, {b}): {nll} <= {at_truth}");
        }
    }

    #[test]
    fn invalid_parameters_cost_infinity() {
        let data = expected_data(0.5, 0.4, 10);
        assert_eq!(neg_log_likelihood(&data, -1.0, 0.4, DEFAULT_PROB_EPSILON), f64::INFINITY);
        assert_eq!(neg_log_likelihood(&data, 0.5, 0.0, DEFAULT_PROB_EPSILON), f64::INFINITY);
        assert_eq!(neg_log_likelihood(&data, f64::NAN, 0.4, DEFAULT_PROB_EPSILON), f64::INFINITY);
    }

    #[test]
    fn clamp_keeps_certain_outcomes_finite() {
        // A level with zero IM has p = 0; an exceedance there would be ln(0) without the clamp.
        let data = FragilityData::new(vec![0.0, 1.0], vec![1, 5], vec![5, 5]);
        let nll = neg_log_likelihood(&data, 0.5, 0.3, DEFAULT_PROB_EPSILON);
        assert!(nll.is_finite());
        assert!(nll > 0.0);
    }
}
