//! Lognormal fragility model evaluation.
//!
//! The fitter relies on a single primitive:
//!
//! ```text
//! P(exceed | IM = x) = Φ(ln(x / θ) / β)
//! ```
//!
//! with `P = 0` for `x ≤ 0` (the log is undefined there and no shaking cannot
//! cause exceedance).

use crate::math::normal_cdf;

/// Probability of exceeding the damage state at intensity `x`.
///
/// Returns NaN for non-positive or non-finite parameters.
pub fn exceedance_probability(x: f64, theta: f64, beta: f64) -> f64 {
    if !(theta.is_finite() && beta.is_finite() && theta > 0.0 && beta > 0.0) {
        return f64::NAN;
    }
    if x.is_nan() {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    normal_cdf((x / theta).ln() / beta)
}

/// Evaluate the curve on a set of IM levels.
pub fn exceedance_curve(im_levels: &[f64], theta: f64, beta: f64) -> Vec<f64> {
    im_levels
        .iter()
        .map(|&x| exceedance_probability(x, theta, beta))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_has_half_probability() {
        let p = exceedance_probability(0.5, 0.5, 0.4);
        assert!((p - 0.5).abs() < 1e-7);
    }

    #[test]
    fn one_beta_above_median_is_about_84_percent() {
        // ln(x/θ) = β  =>  Φ(1)
        let theta = 0.5;
        let beta: f64 = 0.4;
        let x = theta * beta.exp();
        let p = exceedance_probability(x, theta, beta);
        assert!((p - 0.841_344_746).abs() < 1e-6, "got {p}");
    }

    #[test]
    fn non_positive_levels_never_exceed() {
        assert_eq!(exceedance_probability(0.0, 0.5, 0.4), 0.0);
        assert_eq!(exceedance_probability(-1.0, 0.5, 0.4), 0.0);
    }

    #[test]
    fn invalid_parameters_give_nan() {
        assert!(exceedance_probability(0.3, 0.0, 0.4).is_nan());
        assert!(exceedance_probability(0.3, 0.5, -0.1).is_nan());
    }

    #[test]
    fn curve_is_monotone_in_im() {
        let ims: Vec<f64> = (1..=10).map(|i| i as f64 * 0.1).collect();
        let curve = exceedance_curve(&ims, 0.5, 0.4);
        for w in curve.windows(2) {
            assert!(w[1] > w[0]);
        }
    }
}
