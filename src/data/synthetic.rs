//! Synthetic exceedance counts from a known fragility curve.

use rand::Rng;
use rand_distr::{Binomial, Distribution};

use crate::error::AppError;
use crate::models::exceedance_probability;

/// Rounded `n · p(x)` per level.
pub fn expected_counts(theta: f64, beta: f64, im_levels: &[f64], trials: u32) -> Vec<u32> {
    im_levels
        .iter()
        .map(|&x| {
            let p = exceedance_probability(x, theta, beta);
            if p.is_finite() {
                (p * trials as f64).round() as u32
            } else {
                0
            }
        })
        .collect()
}

/// Binomial draws with `n = trials`, `p = p(x)` per level.
pub fn sample_counts<R: Rng + ?Sized>(
    theta: f64,
    beta: f64,
    im_levels: &[f64],
    trials: u32,
    rng: &mut R,
) -> Result<Vec<u32>, AppError> {
    im_levels
        .iter()
        .map(|&x| {
            let p = exceedance_probability(x, theta, beta);
            let dist = Binomial::new(u64::from(trials), p).map_err(|e| {
                AppError::config(format!("Invalid binomial parameters at IM {x}: {e}"))
            })?;
            Ok(dist.sample(rng) as u32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn expected_counts_follow_the_curve() {
        let counts = expected_counts(0.5, 0.4, &[0.1, 0.5, 2.0], 40);
        assert_eq!(counts[0], 0);
        assert_eq!(counts[1], 20);
        assert_eq!(counts[2], 40);
    }

    #[test]
    fn sampled_counts_are_bounded_and_seeded() {
        let ims: Vec<f64> = (1..=10).map(|i| i as f64 * 0.1).collect();
        let a = sample_counts(0.5, 0.4, &ims, 40, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = sample_counts(0.5, 0.4, &ims, 40, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|&k| k <= 40));
        assert!(a[9] > a[0]);
    }

    #[test]
    fn invalid_curve_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(sample_counts(-1.0, 0.4, &[0.3], 10, &mut rng).is_err());
    }
}
