//! Starting point for the likelihood search.
//!
//! θ₀ is read off the empirical exceedance rates:
//!
//! 1. levels with a rate strictly between 0 and 1, sorted by IM: interpolate
//!    the IM at which the rate crosses 0.5 between two consecutive levels
//! 2. no crossing: geometric mean of those levels' IMs
//! 3. no partial levels at all: geometric mean of the last all-zero level and
//!    the first all-one level, when the zeros come first
//! 4. otherwise: median IM
//!
//! and floored at `max(0.1 · min positive IM, 1e-6)`.

use crate::domain::FragilityData;

/// Lower bound on θ₀ regardless of the data.
pub const MIN_INITIAL_THETA: f64 = 1e-6;

pub fn initial_theta(data: &FragilityData) -> f64 {
    let mut levels: Vec<(f64, f64)> = data
        .im_levels
        .iter()
        .copied()
        .zip(data.empirical_rates())
        .collect();
    levels.sort_by(|a, b| a.0.total_cmp(&b.0));

    let partial: Vec<(f64, f64)> = levels
        .iter()
        .copied()
        .filter(|&(_, r)| r > 0.0 && r < 1.0)
        .collect();

    let guess = if !partial.is_empty() {
        half_crossing(&partial).unwrap_or_else(|| {
            geometric_mean(partial.iter().map(|&(x, _)| x)).unwrap_or_else(|| median_im(&levels))
        })
    } else {
        let last_zero = levels.iter().rev().find(|&&(_, r)| r == 0.0).map(|&(x, _)| x);
        let first_one = levels.iter().find(|&&(_, r)| r == 1.0).map(|&(x, _)| x);
        match (last_zero, first_one) {
            (Some(x0), Some(x1)) if x0 < x1 && x0 > 0.0 => (x0 * x1).sqrt(),
            _ => median_im(&levels),
        }
    };

    let min_positive = levels
        .iter()
        .map(|&(x, _)| x)
        .filter(|&x| x > 0.0)
        .fold(f64::INFINITY, f64::min);
    let mut floor = MIN_INITIAL_THETA;
    if min_positive.is_finite() {
        floor = floor.max(0.1 * min_positive);
    }

    if guess.is_finite() { guess.max(floor) } else { floor }
}

/// IM at which the rate crosses 0.5, linearly interpolated.
fn half_crossing(levels: &[(f64, f64)]) -> Option<f64> {
    levels.windows(2).find_map(|w| {
        let (x0, r0) = w[0];
        let (x1, r1) = w[1];
        if (r0 - 0.5) * (r1 - 0.5) <= 0.0 && r0 != r1 {
            Some(x0 + (0.5 - r0) * (x1 - x0) / (r1 - r0))
        } else {
            None
        }
    })
}

fn geometric_mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for x in values {
        if x <= 0.0 {
            return None;
        }
        sum += x.ln();
        n += 1;
    }
    (n > 0).then(|| (sum / n as f64).exp())
}

/// Median of the (already sorted) IM levels.
fn median_im(levels: &[(f64, f64)]) -> f64 {
    let n = levels.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        levels[n / 2].0
    } else {
        0.5 * (levels[n / 2 - 1].0 + levels[n / 2].0)
    }
}
